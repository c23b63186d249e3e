//! Pricing orchestrator.
//!
//! Owns the per-node state (merged items, conflict graph, estimator)
//! and dispatches each pricing call: heuristic first, then the
//! relaxation-and-refine engine, with optional dual stabilization and
//! warm-started breakpoint placement.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::engine::solve_refine;
use crate::error::{PricingError, PricingResult};
use crate::estimator::{Breakpoints, History};
use crate::heuristic::best_fit;
use crate::milp::MilpBackend;
use crate::model::{Instance, PricingOutcome, PricingStats, SolType, SolutionPool};
use crate::preprocess::{ConflictGraph, MergedItems};
use crate::settings::PricingSettings;

/// Breakpoints allotted per item of the largest greedy packing.
const POINTS_PER_ITEM: usize = 4;

/// Branching state of one branch-and-bound node.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    pub node_id: u64,

    /// Pairs of original items forced into the same column.
    pub same_pairs: Vec<(usize, usize)>,

    /// Pairs of original items forbidden from sharing a column.
    pub differ_pairs: Vec<(usize, usize)>,

    /// Diving mode forces a rebuild even within one node.
    pub diving: bool,
}

struct NodeState {
    node_id: u64,
    merged: MergedItems,
    graph: ConflictGraph,
    estimator: Breakpoints,
}

/// Conic knapsack pricer over a fixed instance.
pub struct Pricer<B: MilpBackend> {
    instance: Instance,
    settings: PricingSettings,
    backend: B,
    history: History,
    stats: PricingStats,

    /// Smoothed reward center for stabilization, over original items.
    center: Option<Vec<f64>>,

    node: Option<NodeState>,
}

impl<B: MilpBackend> Pricer<B> {
    pub fn new(instance: Instance, settings: PricingSettings, backend: B) -> Self {
        let dim = instance.num_items();
        let gap_shift = settings.gap_shift;
        Self {
            instance,
            settings,
            backend,
            history: History::new(dim),
            stats: PricingStats::new(gap_shift),
            center: None,
            node: None,
        }
    }

    /// Rebuild node state when the branching constraints change.
    ///
    /// A repeated non-diving call for the current node is a no-op, so
    /// the estimator keeps its refinements across pricing calls.
    pub fn enter_node(&mut self, ctx: &NodeContext) -> PricingResult<()> {
        if let Some(node) = &self.node {
            if node.node_id == ctx.node_id && !ctx.diving {
                return Ok(());
            }
        }

        let merged = MergedItems::build(&self.instance, &ctx.same_pairs, &ctx.differ_pairs)?;
        let graph = ConflictGraph::new(merged.num_compound(), &merged.differ);
        let estimator = self.init_estimator(&merged);
        info!(
            "node {}: {} items merged into {} compounds, {} exclusion pairs, {} breakpoints",
            ctx.node_id,
            self.instance.num_items(),
            merged.num_compound(),
            merged.differ.len(),
            estimator.len()
        );
        self.node = Some(NodeState {
            node_id: ctx.node_id,
            merged,
            graph,
            estimator,
        });
        Ok(())
    }

    /// Price one column: find a cone-feasible packing with reward above
    /// `target_lb`, or prove none exists.
    pub fn price(
        &mut self,
        rewards: &[f64],
        target_lb: f64,
        time_limit: Duration,
    ) -> PricingResult<PricingOutcome> {
        if rewards.len() != self.instance.num_items() {
            return Err(PricingError::InvalidInput(format!(
                "{} rewards for {} items",
                rewards.len(),
                self.instance.num_items()
            )));
        }
        if rewards.iter().any(|r| !r.is_finite()) {
            return Err(PricingError::InvalidInput("non-finite reward".to_string()));
        }
        if self.node.is_none() {
            self.enter_node(&NodeContext::default())?;
        }
        self.update_center(rewards);
        let tol = self.settings.tol;

        // Heuristic path.
        if self.settings.use_heuristic {
            let started = Instant::now();
            let hit = self.try_heuristic(rewards, target_lb);
            self.stats.time_heur += started.elapsed();
            if let Some((items, value)) = hit {
                self.stats.cols_heur += 1;
                debug!("heuristic column with value {:.6}", value);
                let mut pool = SolutionPool::new();
                pool.push(items);
                return Ok(PricingOutcome {
                    sol_type: SolType::FeasibleHeur,
                    value,
                    bound: f64::INFINITY,
                    pool,
                });
            }
        }

        // Exact path.
        let started = Instant::now();
        let Some(node) = self.node.as_mut() else {
            return Err(PricingError::Internal("node state missing".to_string()));
        };
        let compound_rewards = node.merged.aggregate_rewards(rewards);

        let knn_started = Instant::now();
        let hinted = if self.settings.knn_enabled() {
            self.history
                .query(rewards, self.settings.neighbors, self.settings.knn_mode)
        } else {
            None
        };
        self.stats.time_knn += knn_started.elapsed();

        // A usable hint gets a call-local concentrated sample; otherwise
        // the node estimator is refined in place.
        let mut call_estimator;
        let estimator = match hinted {
            Some((lo, hi)) if hi - lo >= 1e-1 => {
                debug!("warm start hints mu region [{:.4}, {:.4}]", lo, hi);
                call_estimator = Breakpoints::concentrated(
                    self.instance.capacity,
                    node.estimator.lb(),
                    node.estimator.ub(),
                    node.estimator.len(),
                    lo,
                    hi,
                    self.settings.point_ratio,
                );
                &mut call_estimator
            }
            _ => &mut node.estimator,
        };

        let backend_started = Instant::now();
        let report = solve_refine(
            &self.instance,
            &node.merged,
            &compound_rewards,
            &node.graph,
            estimator,
            &mut self.backend,
            target_lb,
            time_limit,
            &self.settings,
        )?;
        self.stats.time_backend += backend_started.elapsed();

        if report.sol_type.is_exact() {
            self.stats.cols_exact += 1;
            self.stats.record_gap(report.value, report.bound);
            if let Some((lo, hi)) = report.mu_region {
                self.history.record(rewards, lo, hi);
            }
        }
        self.stats.time_exact += started.elapsed();

        let mut pool = SolutionPool::new();
        for packing in report.pool.iter() {
            pool.push(node.merged.expand(packing));
        }
        let value = pool
            .last()
            .map(|p| p.iter().map(|&i| rewards[i]).sum())
            .unwrap_or(0.0);
        // The engine prices compound rewards; re-checking under the
        // original rewards keeps value and pool consistent.
        debug_assert!(
            !report.sol_type.has_solution() || (value - report.value).abs() < 1e-6 + tol
        );

        Ok(PricingOutcome {
            sol_type: report.sol_type,
            value,
            bound: report.bound,
            pool,
        })
    }

    /// Run the best-fit heuristic, falling back to the stabilized
    /// rewards when the true rewards miss.
    ///
    /// A stabilized hit counts only if the packing still beats the
    /// target under the true rewards.
    fn try_heuristic(&self, rewards: &[f64], target_lb: f64) -> Option<(Vec<usize>, f64)> {
        let tol = self.settings.tol;
        let node = self.node.as_ref()?;
        let compound_rewards = node.merged.aggregate_rewards(rewards);

        if let Some(sol) = best_fit(
            &self.instance,
            &node.merged,
            &compound_rewards,
            &node.graph,
            target_lb,
            tol,
        ) {
            return Some((node.merged.expand(&sol.items), sol.value));
        }

        if !self.settings.stabilize {
            return None;
        }
        let center = self.center.as_ref()?;
        let smoothed = node.merged.aggregate_rewards(center);
        let sol = best_fit(
            &self.instance,
            &node.merged,
            &smoothed,
            &node.graph,
            target_lb,
            tol,
        )?;
        let true_value: f64 = sol.items.iter().map(|&i| compound_rewards[i]).sum();
        if true_value > target_lb + tol {
            debug!("stabilized heuristic column re-checked at {:.6}", true_value);
            Some((node.merged.expand(&sol.items), true_value))
        } else {
            None
        }
    }

    /// Exponentially smooth the stabilization center toward the rewards.
    fn update_center(&mut self, rewards: &[f64]) {
        let alpha = self.settings.stabilization_weight;
        match &mut self.center {
            None => self.center = Some(rewards.to_vec()),
            Some(center) => {
                for (c, &r) in center.iter_mut().zip(rewards.iter()) {
                    *c = alpha * r + (1.0 - alpha) * *c;
                }
            }
        }
    }

    /// Initial breakpoint sample for a node.
    fn init_estimator(&self, merged: &MergedItems) -> Breakpoints {
        let ub = if self.settings.tighten_bounds {
            let total_mu: f64 = merged.mus.iter().sum();
            self.instance.capacity.min(total_mu)
        } else {
            self.instance.capacity
        };
        let points = self
            .settings
            .min_points
            .max(POINTS_PER_ITEM * greedy_max_bin(&self.instance, merged));
        Breakpoints::with_bounds(self.instance.capacity, 0.0, ub.max(1e-6), points)
    }

    /// Running statistics.
    pub fn stats(&self) -> &PricingStats {
        &self.stats
    }

    /// Clear running statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Number of recorded warm-start observations.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The instance being priced.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

/// Size of the largest packing reachable by always adding the item with
/// the smallest marginal capacity use. Sizes the breakpoint sample.
fn greedy_max_bin(instance: &Instance, merged: &MergedItems) -> usize {
    let n = merged.num_compound();
    let mut selected = vec![false; n];
    let mut sum_mu = 0.0;
    let mut sum_b = 0.0;
    let mut count = 0;
    loop {
        let lhs = instance.cone_lhs(sum_mu, sum_b);
        let mut pick = None;
        let mut least = f64::INFINITY;
        for i in 0..n {
            if selected[i] {
                continue;
            }
            let new_lhs = instance.cone_lhs(sum_mu + merged.mus[i], sum_b + merged.bs[i]);
            if new_lhs > instance.capacity {
                continue;
            }
            if new_lhs - lhs < least {
                least = new_lhs - lhs;
                pick = Some(i);
            }
        }
        let Some(i) = pick else {
            return count;
        };
        selected[i] = true;
        sum_mu += merged.mus[i];
        sum_b += merged.bs[i];
        count += 1;
    }
}
