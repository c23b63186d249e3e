//! Relaxation-and-refine engine.
//!
//! Builds a piecewise-linear relaxation of the conic knapsack, solves it
//! through a [`MilpBackend`] with a candidate-rejection callback, and
//! refines the breakpoint sample at violated points until the call is
//! settled or the time budget runs out.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::PricingResult;
use crate::estimator::Breakpoints;
use crate::milp::{CandidateVerdict, ConeCut, MilpBackend, MilpStatus, RelaxedModel};
use crate::model::{Instance, SolType, SolutionPool};
use crate::preprocess::{ConflictGraph, MergedItems};
use crate::settings::PricingSettings;

/// Breakpoints inserted on each side of a rejected candidate's mu value.
const REFINE_FANOUT: usize = 2;

/// Result of one engine run, in compound item indices.
#[derive(Debug, Clone)]
pub struct EngineReport {
    pub sol_type: SolType,

    /// Objective value of the best packing under the rewards given.
    pub value: f64,

    /// Upper bound on the subproblem objective.
    pub bound: f64,

    /// Cone-feasible compound packings, best last.
    pub pool: SolutionPool,

    /// Range of `mu_sum` observed across relaxation candidates.
    pub mu_region: Option<(f64, f64)>,
}

/// Price exactly: solve the relaxation, reject cone-infeasible
/// candidates with supporting cuts, refine and retry on a stall.
pub fn solve_refine(
    instance: &Instance,
    merged: &MergedItems,
    rewards: &[f64],
    graph: &ConflictGraph,
    estimator: &mut Breakpoints,
    backend: &mut dyn MilpBackend,
    target_lb: f64,
    time_limit: Duration,
    settings: &PricingSettings,
) -> PricingResult<EngineReport> {
    let deadline = Instant::now() + time_limit;
    let exclusions = graph.edges();

    let mut pool = SolutionPool::new();
    let mut region: Option<(f64, f64)> = None;
    let mut iteration = 0u32;
    // One stall abort per call; the re-sampled run must finish.
    let mut allow_abort = settings.adaptive_abort && !settings.use_exact_cone;

    loop {
        iteration += 1;
        let now = Instant::now();
        if now >= deadline {
            warn!("pricing time budget exhausted after {} iterations", iteration - 1);
            return Ok(EngineReport {
                sol_type: SolType::Unknown,
                value: 0.0,
                bound: f64::INFINITY,
                pool,
                mu_region: region,
            });
        }
        let remaining = deadline - now;

        let model = build_model(
            instance, merged, rewards, &exclusions, estimator, target_lb, settings,
        );

        let mut rejected = 0u32;
        let mut last_mu = f64::NAN;
        let mut mu_lo = f64::INFINITY;
        let mut mu_hi = f64::NEG_INFINITY;
        let mut stalled_at = None;

        let outcome = backend.solve(&model, remaining, &mut |sel| {
            let mut sum_mu = 0.0;
            let mut sum_b = 0.0;
            for (i, &s) in sel.iter().enumerate() {
                if s {
                    sum_mu += merged.mus[i];
                    sum_b += merged.bs[i];
                }
            }
            if instance.cone_lhs(sum_mu, sum_b) <= instance.capacity + settings.tol {
                return CandidateVerdict::Accept;
            }

            rejected += 1;
            mu_lo = mu_lo.min(sum_mu);
            mu_hi = mu_hi.max(sum_mu);
            let threshold = (settings.stall_fraction * (mu_hi - mu_lo)).max(settings.tol);
            let stall = allow_abort && rejected >= 2 && (sum_mu - last_mu).abs() < threshold;
            last_mu = sum_mu;

            if stall {
                debug!("rejected candidates stalled at mu_sum {:.6}, aborting solve", sum_mu);
                stalled_at = Some(sum_mu);
                return CandidateVerdict::Abort;
            }
            estimator.insert_x(sum_mu, REFINE_FANOUT);
            CandidateVerdict::Reject(cone_cut(instance, merged, sel, sum_b, settings.tol))
        })?;

        if rejected > 0 {
            region = widen(region, (mu_lo, mu_hi));
        }
        if let Some(observed) = outcome.mu_range {
            region = widen(region, observed);
        }

        match outcome.status {
            MilpStatus::Optimal | MilpStatus::Feasible => {
                let sel = outcome
                    .solution
                    .as_ref()
                    .map(|s| selected_indices(s))
                    .unwrap_or_default();
                pool.push(sel);
                let exact = outcome.status == MilpStatus::Optimal;
                return Ok(EngineReport {
                    sol_type: if exact { SolType::Optimal } else { SolType::FeasibleExact },
                    value: outcome.objective,
                    bound: if exact { outcome.objective } else { f64::INFINITY },
                    pool,
                    mu_region: region,
                });
            }
            MilpStatus::Infeasible => {
                return Ok(EngineReport {
                    sol_type: SolType::Infeasible,
                    value: 0.0,
                    bound: target_lb,
                    pool,
                    mu_region: region,
                });
            }
            MilpStatus::TimeLimit => {
                return Ok(EngineReport {
                    sol_type: SolType::Unknown,
                    value: 0.0,
                    bound: f64::INFINITY,
                    pool,
                    mu_region: region,
                });
            }
            MilpStatus::Aborted => {
                // An incumbent accepted before the stall stays usable as
                // a partial result.
                if let Some(sel) = &outcome.solution {
                    pool.push(selected_indices(sel));
                }
                allow_abort = false;
                let center = stalled_at.unwrap_or(last_mu);
                info!(
                    "iteration {} aborted, re-sampling {} breakpoints around mu_sum {:.6}",
                    iteration,
                    estimator.len(),
                    center
                );
                *estimator = resample_around(estimator, center);
            }
        }
    }
}

/// Assemble the relaxed model from the current breakpoint sample.
fn build_model(
    instance: &Instance,
    merged: &MergedItems,
    rewards: &[f64],
    exclusions: &[(usize, usize)],
    estimator: &Breakpoints,
    target_lb: f64,
    settings: &PricingSettings,
) -> RelaxedModel {
    let scale = instance.dalpha * instance.dalpha;
    let (breakpoint_xs, breakpoint_fxs) = estimator.sample_arrays();
    RelaxedModel {
        rewards: rewards.to_vec(),
        mus: merged.mus.clone(),
        weighted_bs: merged.bs.iter().map(|b| b * scale).collect(),
        breakpoint_xs,
        breakpoint_fxs,
        left_slope: estimator.left_slope(),
        right_slope: estimator.right_slope(),
        exclusions: exclusions.to_vec(),
        objective_floor: target_lb - settings.tol,
        tol: settings.tol,
        use_pwl: !settings.use_exact_cone,
    }
}

/// Supporting hyperplane of the cone at a rejected candidate.
///
/// Only items covered by the candidate carry the conic term; items
/// outside it keep their plain linear weight, so the cut stays below
/// the true cone lhs on every selection. At the rejection point the
/// cut is tight, so the point itself is excluded for the rest of the
/// solve.
fn cone_cut(
    instance: &Instance,
    merged: &MergedItems,
    covered: &[bool],
    sum_b: f64,
    tol: f64,
) -> ConeCut {
    let coeffs = if sum_b > tol {
        let scale = instance.dalpha / sum_b.sqrt();
        merged
            .mus
            .iter()
            .zip(merged.bs.iter())
            .zip(covered.iter())
            .map(|((&mu, &b), &c)| if c { mu + scale * b } else { mu })
            .collect()
    } else {
        merged.mus.clone()
    };
    ConeCut {
        coeffs,
        rhs: instance.capacity + tol,
    }
}

/// Replace the sample with one denser around the stall point.
///
/// Point counts on each side are proportional to the side widths, and
/// spacing grows quadratically away from the center.
fn resample_around(estimator: &Breakpoints, center: f64) -> Breakpoints {
    let lb = estimator.lb();
    let ub = estimator.ub();
    let center = center.clamp(lb, ub);
    let n = estimator.len().max(10);

    let down_w = center - lb;
    let up_w = ub - center;
    let num_down = ((n as f64 * down_w / (ub - lb)).round() as usize).min(n);
    let num_up = n - num_down;

    let mut xs = Vec::with_capacity(n + 1);
    for k in (1..=num_down).rev() {
        let t = k as f64 / num_down as f64;
        xs.push(center - down_w * t * t);
    }
    xs.push(center);
    for k in 1..=num_up {
        let t = k as f64 / num_up as f64;
        xs.push(center + up_w * t * t);
    }
    Breakpoints::from_sorted_xs(estimator.capacity(), lb, ub, &xs)
}

fn selected_indices(selection: &[bool]) -> Vec<usize> {
    selection
        .iter()
        .enumerate()
        .filter(|(_, &s)| s)
        .map(|(i, _)| i)
        .collect()
}

fn widen(region: Option<(f64, f64)>, seen: (f64, f64)) -> Option<(f64, f64)> {
    Some(match region {
        None => seen,
        Some((lo, hi)) => (lo.min(seen.0), hi.max(seen.1)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{EnumerationBackend, MilpOutcome};

    fn setup(
        mus: Vec<f64>,
        bs: Vec<f64>,
        dalpha: f64,
        capacity: f64,
    ) -> (Instance, MergedItems, ConflictGraph) {
        let inst = Instance::new(mus, bs, dalpha, capacity).unwrap();
        let merged = MergedItems::build(&inst, &[], &[]).unwrap();
        let graph = ConflictGraph::new(merged.num_compound(), &merged.differ);
        (inst, merged, graph)
    }

    fn run(
        inst: &Instance,
        merged: &MergedItems,
        graph: &ConflictGraph,
        rewards: &[f64],
        estimator: &mut Breakpoints,
        target_lb: f64,
        settings: &PricingSettings,
    ) -> EngineReport {
        let mut backend = EnumerationBackend::new();
        solve_refine(
            inst,
            merged,
            rewards,
            graph,
            estimator,
            &mut backend,
            target_lb,
            Duration::from_secs(10),
            settings,
        )
        .unwrap()
    }

    #[test]
    fn test_optimal_packing() {
        let (inst, merged, graph) = setup(vec![1.0, 1.0, 1.0], vec![0.5, 0.5, 0.5], 1.0, 10.0);
        let mut bp = Breakpoints::uniform(10.0, 20);
        let settings = PricingSettings::default();

        let report = run(&inst, &merged, &graph, &[2.0, 3.0, 4.0], &mut bp, 1.0, &settings);
        assert_eq!(report.sol_type, SolType::Optimal);
        assert!((report.value - 9.0).abs() < 1e-9);
        assert!((report.bound - 9.0).abs() < 1e-9);
        assert_eq!(report.pool.last().unwrap(), &[0, 1, 2]);
    }

    #[test]
    fn test_infeasible_above_target() {
        // Capacity admits single items only; none beats the target.
        let (inst, merged, graph) = setup(vec![1.0, 1.0], vec![0.0, 0.0], 1.0, 1.5);
        let mut bp = Breakpoints::uniform(1.5, 20);
        let settings = PricingSettings::default();

        let report = run(&inst, &merged, &graph, &[1.0, 1.0], &mut bp, 5.0, &settings);
        assert_eq!(report.sol_type, SolType::Infeasible);
        assert!(report.pool.is_empty());
        assert!((report.bound - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_exclusions_enforced() {
        let inst = Instance::new(vec![1.0, 1.0, 1.0], vec![0.1; 3], 1.0, 10.0).unwrap();
        let merged = MergedItems::build(&inst, &[], &[(0, 1)]).unwrap();
        let graph = ConflictGraph::new(merged.num_compound(), &merged.differ);
        let mut bp = Breakpoints::uniform(10.0, 20);
        let settings = PricingSettings::default();

        let report = run(&inst, &merged, &graph, &[5.0, 4.0, 3.0], &mut bp, 0.0, &settings);
        assert_eq!(report.sol_type, SolType::Optimal);
        assert_eq!(report.pool.last().unwrap(), &[0, 2]);
        assert!((report.value - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejection_refines_estimator() {
        // The lone selection sits in a secant gap: the relaxation admits
        // it but the exact cone does not.
        let mu = 0.2222;
        let b = 14.32;
        let (inst, merged, graph) = setup(vec![mu], vec![b], 1.0, 4.0);
        assert!(inst.cone_lhs(mu, b) > 4.0 + 1e-6);

        let mut bp = Breakpoints::uniform(4.0, 10);
        assert!(b <= bpwl(&bp, mu) + 1e-6, "candidate must pass the relaxation");

        let n_before = bp.len();
        let settings = PricingSettings::default();
        let report = run(&inst, &merged, &graph, &[1.0], &mut bp, 0.0, &settings);

        assert_eq!(report.sol_type, SolType::Infeasible);
        assert!(bp.len() > n_before);
        let (lo, hi) = report.mu_region.unwrap();
        assert!(lo <= mu && mu <= hi);
    }

    fn bpwl(bp: &Breakpoints, x: f64) -> f64 {
        let pts = bp.points();
        let hi = pts.partition_point(|p| p.x < x).max(1);
        let (p0, p1) = (pts[hi - 1], pts[hi]);
        p0.fx + (x - p0.x) / (p1.x - p0.x) * (p1.fx - p0.fx)
    }

    #[test]
    fn test_resample_denser_near_center() {
        let bp = Breakpoints::uniform(10.0, 20);
        let dense = resample_around(&bp, 3.0);

        assert!(dense.check());
        assert!((dense.lb() - 0.0).abs() < 1e-9);
        assert!((dense.ub() - 10.0).abs() < 1e-9);

        let near = dense
            .points()
            .iter()
            .filter(|p| (p.x - 3.0).abs() <= 1.0)
            .count();
        // A tenth of the domain holds well over a tenth of the points.
        assert!(near >= dense.len() / 3, "{} of {}", near, dense.len());
    }

    #[test]
    fn test_resample_center_at_boundary() {
        let bp = Breakpoints::uniform(10.0, 15);
        let dense = resample_around(&bp, 0.0);
        assert!(dense.check());
        let dense = resample_around(&bp, 10.0);
        assert!(dense.check());
    }

    /// Scripted backend feeding a fixed candidate sequence, used to
    /// exercise the stall abort without a contrived instance.
    struct ScriptedBackend {
        candidates: Vec<Vec<bool>>,
        solves: u32,
    }

    impl MilpBackend for ScriptedBackend {
        fn solve(
            &mut self,
            _model: &RelaxedModel,
            _time_limit: Duration,
            on_candidate: &mut dyn FnMut(&[bool]) -> CandidateVerdict,
        ) -> PricingResult<MilpOutcome> {
            self.solves += 1;
            if self.solves == 1 {
                for cand in &self.candidates {
                    if let CandidateVerdict::Abort = on_candidate(cand) {
                        return Ok(MilpOutcome {
                            status: MilpStatus::Aborted,
                            solution: None,
                            objective: 0.0,
                            mu_range: None,
                        });
                    }
                }
            }
            Ok(MilpOutcome {
                status: MilpStatus::Infeasible,
                solution: None,
                objective: 0.0,
                mu_range: None,
            })
        }
    }

    #[test]
    fn test_stall_aborts_and_resamples() {
        // Both candidates violate the cone at the same mu_sum.
        let (inst, merged, graph) = setup(vec![2.0, 2.0], vec![100.0, 100.0], 1.0, 4.0);
        let mut bp = Breakpoints::uniform(4.0, 10);
        let mut backend = ScriptedBackend {
            candidates: vec![vec![true, false], vec![false, true]],
            solves: 0,
        };
        let settings = PricingSettings::default();

        let report = solve_refine(
            &inst,
            &merged,
            &[1.0, 1.0],
            &graph,
            &mut bp,
            &mut backend,
            0.0,
            Duration::from_secs(10),
            &settings,
        )
        .unwrap();

        // First solve aborts on the stall, second proves infeasibility.
        assert_eq!(backend.solves, 2);
        assert_eq!(report.sol_type, SolType::Infeasible);

        // The re-sampled estimator concentrates around the stalled mu.
        let near = bp.points().iter().filter(|p| (p.x - 2.0).abs() <= 0.5).count();
        assert!(near >= bp.len() / 4);
    }

    #[test]
    fn test_cut_leaves_uncovered_items_alone() {
        // Item 0 never fits; item 1 fills the capacity through its conic
        // weight alone. Rejecting {0} must not block the disjoint {1}:
        // the cut carries the conic term only on covered items.
        let (inst, merged, graph) = setup(vec![10.5, 0.0], vec![1.0, 100.0], 1.0, 10.0);
        assert!(inst.is_cone_feasible(&[1], 1e-9));

        let mut bp = Breakpoints::uniform(10.0, 10);
        let settings = PricingSettings::exact_only().with_exact_cone();

        let report = run(&inst, &merged, &graph, &[2.0, 1.0], &mut bp, 0.0, &settings);
        assert_eq!(report.sol_type, SolType::Optimal);
        assert_eq!(report.pool.last().unwrap(), &[1]);
        assert!((report.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_cone_path() {
        let (inst, merged, graph) = setup(vec![1.0, 1.0], vec![4.0, 4.0], 1.0, 4.0);
        let mut bp = Breakpoints::uniform(4.0, 10);
        let settings = PricingSettings::exact_only().with_exact_cone();

        // {0,1}: 2 + sqrt(8) = 4.83 > 4, rejected by the callback alone.
        let report = run(&inst, &merged, &graph, &[1.0, 1.1], &mut bp, 0.0, &settings);
        assert_eq!(report.sol_type, SolType::Optimal);
        assert_eq!(report.pool.last().unwrap(), &[1]);
        assert!((report.value - 1.1).abs() < 1e-9);
    }
}
