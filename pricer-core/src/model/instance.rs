//! Conic knapsack instance data.

use crate::error::{PricingError, PricingResult};

/// A conic knapsack pricing instance.
///
/// Items carry two weights: a linear weight `mu` and a conic weight `b`.
/// A selection S is feasible when
///
/// ```text
/// sum_{i in S} mu_i + dalpha * sqrt(sum_{i in S} b_i) <= capacity
/// ```
///
/// Rewards (dual values) change on every pricing call and are passed
/// separately; the weights are fixed for the lifetime of the instance.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Linear weights, one per item.
    pub mus: Vec<f64>,

    /// Conic weights, one per item.
    pub bs: Vec<f64>,

    /// Coefficient of the square-root term.
    pub dalpha: f64,

    /// Knapsack capacity.
    pub capacity: f64,
}

impl Instance {
    /// Create and validate an instance.
    pub fn new(mus: Vec<f64>, bs: Vec<f64>, dalpha: f64, capacity: f64) -> PricingResult<Self> {
        if mus.len() != bs.len() {
            return Err(PricingError::InvalidInput(format!(
                "{} mu weights but {} b weights",
                mus.len(),
                bs.len()
            )));
        }
        if mus.is_empty() {
            return Err(PricingError::InvalidInput("no items".to_string()));
        }
        for (i, (&mu, &b)) in mus.iter().zip(bs.iter()).enumerate() {
            if !mu.is_finite() || !b.is_finite() || mu < 0.0 || b < 0.0 {
                return Err(PricingError::InvalidInput(format!(
                    "item {} has invalid weights (mu={}, b={})",
                    i, mu, b
                )));
            }
        }
        if !dalpha.is_finite() || dalpha <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "conic coefficient must be positive, got {}",
                dalpha
            )));
        }
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "capacity must be positive, got {}",
                capacity
            )));
        }

        Ok(Self {
            mus,
            bs,
            dalpha,
            capacity,
        })
    }

    /// Number of items.
    pub fn num_items(&self) -> usize {
        self.mus.len()
    }

    /// Exact cone left-hand side for aggregated weights.
    pub fn cone_lhs(&self, sum_mu: f64, sum_b: f64) -> f64 {
        sum_mu + self.dalpha * sum_b.sqrt()
    }

    /// Exact cone left-hand side of an item selection.
    pub fn selection_lhs(&self, items: &[usize]) -> f64 {
        let sum_mu: f64 = items.iter().map(|&i| self.mus[i]).sum();
        let sum_b: f64 = items.iter().map(|&i| self.bs[i]).sum();
        self.cone_lhs(sum_mu, sum_b)
    }

    /// Check cone feasibility of an item selection.
    pub fn is_cone_feasible(&self, items: &[usize], tol: f64) -> bool {
        self.selection_lhs(items) <= self.capacity + tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_validation() {
        assert!(Instance::new(vec![1.0], vec![0.5], 1.0, 2.0).is_ok());

        // Mismatched lengths
        assert!(Instance::new(vec![1.0, 2.0], vec![0.5], 1.0, 2.0).is_err());

        // Negative weight
        assert!(Instance::new(vec![-1.0], vec![0.5], 1.0, 2.0).is_err());

        // Non-positive conic coefficient
        assert!(Instance::new(vec![1.0], vec![0.5], 0.0, 2.0).is_err());

        // Non-positive capacity
        assert!(Instance::new(vec![1.0], vec![0.5], 1.0, 0.0).is_err());
    }

    #[test]
    fn test_cone_lhs() {
        let inst = Instance::new(vec![1.0, 2.0], vec![4.0, 0.0], 0.5, 10.0).unwrap();

        // {0}: 1 + 0.5 * sqrt(4) = 2
        assert!((inst.selection_lhs(&[0]) - 2.0).abs() < 1e-12);

        // {0, 1}: 3 + 0.5 * 2 = 4
        assert!((inst.selection_lhs(&[0, 1]) - 4.0).abs() < 1e-12);

        assert!(inst.is_cone_feasible(&[0, 1], 1e-9));
    }
}
