//! Pricing solution types and running statistics.

use std::time::Duration;

/// Outcome classification of one pricing call.
///
/// Every call starts at `Unknown` and ends in exactly one of the other
/// states. `Aborted` is produced by stall detection inside a single
/// relaxation solve; the refinement loop always reacts to it by
/// re-sampling, so it never escapes as the final status of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolType {
    /// Time exhausted without a conclusive result; pricing is
    /// undetermined, not infeasible.
    #[default]
    Unknown,

    /// Proven: no cone-feasible selection reaches the target bound.
    Infeasible,

    /// The heuristic found a selection beating the target bound.
    FeasibleHeur,

    /// The exact engine found a cone-feasible selection but stopped
    /// before proving optimality.
    FeasibleExact,

    /// The exact engine solved the subproblem to optimality.
    Optimal,

    /// A relaxation solve was cut short by stall detection; the caller
    /// must refine and retry, never treat this as final.
    Aborted,
}

impl SolType {
    /// Returns true if a feasible selection was produced.
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            SolType::FeasibleHeur | SolType::FeasibleExact | SolType::Optimal
        )
    }

    /// Returns true if the value came from an exact solve.
    pub fn is_exact(&self) -> bool {
        matches!(self, SolType::FeasibleExact | SolType::Optimal)
    }
}

/// Ordered collection of cone-feasible packings found during one call.
///
/// Each entry is a sorted list of original item indices.
#[derive(Debug, Clone, Default)]
pub struct SolutionPool {
    packings: Vec<Vec<usize>>,
}

impl SolutionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a packing to the pool.
    pub fn push(&mut self, mut items: Vec<usize>) {
        items.sort_unstable();
        self.packings.push(items);
    }

    /// Number of packings.
    pub fn len(&self) -> usize {
        self.packings.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.packings.is_empty()
    }

    /// Iterate over packings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.packings.iter().map(|p| p.as_slice())
    }

    /// The last packing added, if any.
    pub fn last(&self) -> Option<&[usize]> {
        self.packings.last().map(|p| p.as_slice())
    }
}

/// Result of one pricing call.
#[derive(Debug, Clone)]
pub struct PricingOutcome {
    /// Outcome classification.
    pub sol_type: SolType,

    /// Objective value of the best packing (under the true rewards).
    pub value: f64,

    /// Best known upper bound on the subproblem objective.
    pub bound: f64,

    /// Cone-feasible packings found during the call.
    pub pool: SolutionPool,
}

/// Running counters over all pricing calls of one node context.
///
/// The relative optimality gap is averaged through a shifted log sum:
/// each exact call accumulates `ln(shift + gap)`, and the running
/// average is recovered as `exp(mean) - shift`. This behaves like a
/// geometric mean and is robust to the occasional huge gap.
#[derive(Debug, Clone)]
pub struct PricingStats {
    /// Pricing calls answered by the heuristic.
    pub cols_heur: u64,

    /// Pricing calls answered by the exact engine.
    pub cols_exact: u64,

    /// Wall time spent in the heuristic path.
    pub time_heur: Duration,

    /// Wall time spent in the exact path.
    pub time_exact: Duration,

    /// Wall time spent inside the MILP backend.
    pub time_backend: Duration,

    /// Wall time spent in warm-start queries.
    pub time_knn: Duration,

    /// Shift parameter of the gap accumulator.
    gap_shift: f64,

    /// Accumulated `ln(shift + gap)` over exact calls.
    log_sum_gap: f64,
}

impl PricingStats {
    /// Create zeroed statistics with the given gap shift.
    pub fn new(gap_shift: f64) -> Self {
        Self {
            cols_heur: 0,
            cols_exact: 0,
            time_heur: Duration::ZERO,
            time_exact: Duration::ZERO,
            time_backend: Duration::ZERO,
            time_knn: Duration::ZERO,
            gap_shift,
            log_sum_gap: 0.0,
        }
    }

    /// Relative gap in percent between a value and its bound.
    pub fn relative_gap(value: f64, bound: f64) -> f64 {
        let denom = value.abs().max(bound.abs());
        if denom < 1e-12 {
            return 0.0;
        }
        if bound.is_infinite() {
            return 100.0;
        }
        (value - bound).abs() / denom * 100.0
    }

    /// Record the gap of one exact call.
    pub fn record_gap(&mut self, value: f64, bound: f64) {
        let gap = Self::relative_gap(value, bound);
        self.log_sum_gap += (self.gap_shift + gap).ln();
    }

    /// Running average of the relative gap, in percent.
    pub fn avg_gap(&self) -> f64 {
        if self.cols_exact == 0 {
            return 0.0;
        }
        (self.log_sum_gap / self.cols_exact as f64).exp() - self.gap_shift
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new(self.gap_shift);
    }
}

impl Default for PricingStats {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_type_predicates() {
        assert!(SolType::Optimal.has_solution());
        assert!(SolType::FeasibleHeur.has_solution());
        assert!(!SolType::Infeasible.has_solution());
        assert!(!SolType::Unknown.has_solution());

        assert!(SolType::Optimal.is_exact());
        assert!(SolType::FeasibleExact.is_exact());
        assert!(!SolType::FeasibleHeur.is_exact());
    }

    #[test]
    fn test_pool_sorts_entries() {
        let mut pool = SolutionPool::new();
        pool.push(vec![3, 1, 2]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.last().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_gap_average() {
        let mut stats = PricingStats::new(1.0);

        // Two exact calls with identical 10% gaps: average is 10%.
        stats.record_gap(100.0, 110.0);
        stats.cols_exact += 1;
        stats.record_gap(100.0, 110.0);
        stats.cols_exact += 1;

        let gap = PricingStats::relative_gap(100.0, 110.0);
        assert!((stats.avg_gap() - gap).abs() < 1e-9);
    }

    #[test]
    fn test_gap_robust_to_outlier() {
        let mut stats = PricingStats::new(1.0);
        for _ in 0..9 {
            stats.record_gap(100.0, 100.0); // zero gap
            stats.cols_exact += 1;
        }
        stats.record_gap(0.0, f64::INFINITY); // 100% gap outlier
        stats.cols_exact += 1;

        // The shifted log average stays far below the arithmetic mean (10%).
        assert!(stats.avg_gap() < 1.0);
    }
}
