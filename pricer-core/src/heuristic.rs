//! Greedy best-fit heuristic over compound items.
//!
//! Runs before the exact engine on every pricing call. The returned
//! packing is always checked against the exact cone constraint, so a
//! heuristic hit can be handed to the master problem directly.

use crate::model::Instance;
use crate::preprocess::{ConflictGraph, MergedItems};

/// A cone-feasible packing found by the heuristic.
#[derive(Debug, Clone)]
pub struct HeurSolution {
    /// Selected compound item indices.
    pub items: Vec<usize>,

    /// Total reward of the packing.
    pub value: f64,
}

/// Best-fit packing beating `target_lb + tol`, or `None`.
///
/// Phase one discards dominated seeds: item i cannot seed the best
/// packing when some j is at least as light on both weight axes and at
/// least as rewarding. Phase two grows a packing from every surviving
/// seed, always adding the unblocked item with the best reward per unit
/// of marginal cone capacity, measured by the exact left-hand side.
pub fn best_fit(
    instance: &Instance,
    merged: &MergedItems,
    rewards: &[f64],
    conflicts: &ConflictGraph,
    target_lb: f64,
    tol: f64,
) -> Option<HeurSolution> {
    let n = merged.num_compound();
    debug_assert_eq!(rewards.len(), n);

    let seed_ok = non_dominated(&merged.mus, &merged.bs, rewards);

    let mut best: Option<HeurSolution> = None;
    for seed in 0..n {
        if !seed_ok[seed] || rewards[seed] <= tol {
            continue;
        }
        let mut sum_mu = merged.mus[seed];
        let mut sum_b = merged.bs[seed];
        let mut lhs = instance.cone_lhs(sum_mu, sum_b);
        if lhs > instance.capacity + tol {
            continue;
        }

        let mut selected = vec![false; n];
        let mut blocked = vec![false; n];
        selected[seed] = true;
        for &j in conflicts.neighbors(seed) {
            blocked[j] = true;
        }
        let mut items = vec![seed];
        let mut value = rewards[seed];

        loop {
            let mut pick = None;
            let mut best_ratio = -1.0;
            for i in 0..n {
                if selected[i] || blocked[i] || rewards[i] <= tol {
                    continue;
                }
                let new_lhs = instance.cone_lhs(sum_mu + merged.mus[i], sum_b + merged.bs[i]);
                if new_lhs > instance.capacity + tol {
                    continue;
                }
                // A zero-weight item uses no capacity at all; take it
                // unconditionally.
                let used = (new_lhs - lhs).max(1e-12);
                let ratio = rewards[i] / used;
                if ratio > best_ratio {
                    best_ratio = ratio;
                    pick = Some((i, new_lhs));
                }
            }
            let Some((i, new_lhs)) = pick else {
                break;
            };
            selected[i] = true;
            for &j in conflicts.neighbors(i) {
                blocked[j] = true;
            }
            sum_mu += merged.mus[i];
            sum_b += merged.bs[i];
            lhs = new_lhs;
            items.push(i);
            value += rewards[i];
        }

        if best.as_ref().map_or(true, |b| value > b.value) {
            best = Some(HeurSolution { items, value });
        }
    }

    best.filter(|b| b.value > target_lb + tol)
}

/// Seed eligibility after the dominance filter.
///
/// Ties between identical items are broken by index so exactly one of
/// them survives as a seed.
fn non_dominated(mus: &[f64], bs: &[f64], rewards: &[f64]) -> Vec<bool> {
    let n = mus.len();
    let mut ok = vec![true; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let covers = mus[j] <= mus[i] && bs[j] <= bs[i] && rewards[j] >= rewards[i];
            let strict = mus[j] < mus[i] || bs[j] < bs[i] || rewards[j] > rewards[i];
            if covers && (strict || j < i) {
                ok[i] = false;
                break;
            }
        }
    }
    ok
}
