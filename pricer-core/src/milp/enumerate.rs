//! Exhaustive backend for small models.
//!
//! Enumerates all selections in objective-improving incumbent order and
//! honors candidate verdicts the way an external solver with lazy
//! constraints would. Intended for tests and small pricing instances.

use std::time::{Duration, Instant};

use log::debug;

use crate::error::{PricingError, PricingResult};
use crate::milp::backend::{
    dot, CandidateVerdict, ConeCut, MilpBackend, MilpOutcome, MilpStatus, RelaxedModel,
};

/// Largest model the exhaustive scan accepts.
const MAX_ITEMS: usize = 24;

/// Exhaustive mask enumeration behind the [`MilpBackend`] trait.
#[derive(Debug, Default)]
pub struct EnumerationBackend;

impl EnumerationBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MilpBackend for EnumerationBackend {
    fn solve(
        &mut self,
        model: &RelaxedModel,
        time_limit: Duration,
        on_candidate: &mut dyn FnMut(&[bool]) -> CandidateVerdict,
    ) -> PricingResult<MilpOutcome> {
        let n = model.num_items();
        if n > MAX_ITEMS {
            return Err(PricingError::SolverFault(format!(
                "enumeration backend handles at most {} items, got {}",
                MAX_ITEMS, n
            )));
        }
        let deadline = Instant::now() + time_limit;

        let mut cuts: Vec<ConeCut> = Vec::new();
        let mut best: Option<Vec<bool>> = None;
        let mut best_value = f64::NEG_INFINITY;
        let mut mu_range: Option<(f64, f64)> = None;
        let mut timed_out = false;
        let mut aborted = false;

        let mut selection = vec![false; n];
        'scan: for mask in 1u64..(1u64 << n) {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }
            for (i, s) in selection.iter_mut().enumerate() {
                *s = mask & (1 << i) != 0;
            }
            // Improving incumbents only, like a solver's candidate hook.
            let reward = dot(&model.rewards, &selection);
            if reward <= best_value || !model.admits(&selection) {
                continue;
            }
            if cuts.iter().any(|c| !c.admits(&selection)) {
                continue;
            }

            let mu_sum = dot(&model.mus, &selection);
            mu_range = Some(match mu_range {
                None => (mu_sum, mu_sum),
                Some((lo, hi)) => (lo.min(mu_sum), hi.max(mu_sum)),
            });

            match on_candidate(&selection) {
                CandidateVerdict::Accept => {
                    best_value = reward;
                    best = Some(selection.clone());
                }
                CandidateVerdict::Reject(cut) => {
                    debug!(
                        "candidate rejected, cut with {} coefficients added",
                        cut.coeffs.len()
                    );
                    cuts.push(cut);
                }
                CandidateVerdict::Abort => {
                    aborted = true;
                    break 'scan;
                }
            }
        }

        let status = if aborted {
            MilpStatus::Aborted
        } else if timed_out {
            if best.is_some() {
                MilpStatus::Feasible
            } else {
                MilpStatus::TimeLimit
            }
        } else if best.is_some() {
            MilpStatus::Optimal
        } else {
            MilpStatus::Infeasible
        };

        Ok(MilpOutcome {
            status,
            solution: best,
            objective: if best_value.is_finite() { best_value } else { 0.0 },
            mu_range,
        })
    }
}
