//! Backend trait and the relaxed model it solves.

use std::time::Duration;

use crate::error::PricingResult;

/// One pricing relaxation over compound items.
///
/// Binary variables x select items. Aggregates `mu_sum = mus . x` and
/// `b_sum = weighted_bs . x` are tied by the piecewise-linear capacity
/// constraint `b_sum <= pwl(mu_sum)`, with secant-slope extrapolation
/// outside the sampled domain. Exclusion pairs forbid x_a + x_b > 1 and
/// the objective floor discards packings at or below the target bound.
#[derive(Debug, Clone)]
pub struct RelaxedModel {
    /// Objective coefficients per compound item.
    pub rewards: Vec<f64>,

    /// Linear weights per compound item.
    pub mus: Vec<f64>,

    /// Conic weights per compound item, scaled by dalpha squared.
    pub weighted_bs: Vec<f64>,

    /// Breakpoint positions, strictly increasing.
    pub breakpoint_xs: Vec<f64>,

    /// Curve values at the breakpoints, strictly decreasing.
    pub breakpoint_fxs: Vec<f64>,

    /// Extrapolation slope left of the first breakpoint.
    pub left_slope: f64,

    /// Extrapolation slope right of the last breakpoint.
    pub right_slope: f64,

    /// Exclusion pairs over compound items.
    pub exclusions: Vec<(usize, usize)>,

    /// Required objective value, `target_lb - tol`.
    pub objective_floor: f64,

    /// Feasibility tolerance.
    pub tol: f64,

    /// Enforce the piecewise-linear capacity bound. When false the cone
    /// is enforced purely through rejection cuts.
    pub use_pwl: bool,
}

impl RelaxedModel {
    /// Number of selection variables.
    pub fn num_items(&self) -> usize {
        self.rewards.len()
    }

    /// Piecewise-linear capacity bound at `mu_sum`.
    pub fn pwl_value(&self, x: f64) -> f64 {
        let xs = &self.breakpoint_xs;
        let fxs = &self.breakpoint_fxs;
        let n = xs.len();
        if x <= xs[0] {
            return fxs[0] + self.left_slope * (x - xs[0]);
        }
        if x >= xs[n - 1] {
            return fxs[n - 1] + self.right_slope * (x - xs[n - 1]);
        }
        let hi = xs.partition_point(|&p| p < x).max(1);
        let t = (x - xs[hi - 1]) / (xs[hi] - xs[hi - 1]);
        fxs[hi - 1] + t * (fxs[hi] - fxs[hi - 1])
    }

    /// Check a selection against all linear constraints of the model.
    pub fn admits(&self, selection: &[bool]) -> bool {
        for &(a, b) in &self.exclusions {
            if selection[a] && selection[b] {
                return false;
            }
        }
        let reward = dot(&self.rewards, selection);
        if reward < self.objective_floor {
            return false;
        }
        if !self.use_pwl {
            return true;
        }
        let mu_sum = dot(&self.mus, selection);
        let b_sum = dot(&self.weighted_bs, selection);
        b_sum <= self.pwl_value(mu_sum) + self.tol
    }
}

/// Sum of coefficients over selected items.
pub fn dot(coeffs: &[f64], selection: &[bool]) -> f64 {
    coeffs
        .iter()
        .zip(selection.iter())
        .filter(|(_, &s)| s)
        .map(|(&c, _)| c)
        .sum()
}

/// Linear cut `coeffs . x <= rhs` injected at a rejected candidate.
#[derive(Debug, Clone)]
pub struct ConeCut {
    pub coeffs: Vec<f64>,
    pub rhs: f64,
}

impl ConeCut {
    /// Whether a selection satisfies the cut.
    pub fn admits(&self, selection: &[bool]) -> bool {
        dot(&self.coeffs, selection) <= self.rhs
    }
}

/// Decision returned by the candidate callback.
#[derive(Debug, Clone)]
pub enum CandidateVerdict {
    /// The candidate satisfies the exact cone constraint.
    Accept,

    /// Cone-infeasible; exclude it with the given cut and continue.
    Reject(ConeCut),

    /// Stop the solve early; the caller will refine and retry.
    Abort,
}

/// Backend solve status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilpStatus {
    /// Proven optimal among accepted candidates.
    Optimal,

    /// Stopped with at least one accepted candidate.
    Feasible,

    /// No admissible candidate exists.
    Infeasible,

    /// Time limit reached before a conclusive answer.
    TimeLimit,

    /// The callback requested an early stop.
    Aborted,
}

/// Result of one backend solve.
#[derive(Debug, Clone)]
pub struct MilpOutcome {
    pub status: MilpStatus,

    /// Best accepted candidate, if any.
    pub solution: Option<Vec<bool>>,

    /// Objective value of the best accepted candidate.
    pub objective: f64,

    /// Range of `mu_sum` observed across candidates.
    pub mu_range: Option<(f64, f64)>,
}

/// External mixed-integer solver behind the relaxation.
///
/// The callback is invoked on every improving integer candidate; a
/// conforming backend honors its verdict before continuing the search.
pub trait MilpBackend {
    fn solve(
        &mut self,
        model: &RelaxedModel,
        time_limit: Duration,
        on_candidate: &mut dyn FnMut(&[bool]) -> CandidateVerdict,
    ) -> PricingResult<MilpOutcome>;
}
