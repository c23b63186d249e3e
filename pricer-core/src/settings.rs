//! Configuration settings for the pricing solver.

/// Weighting mode for the k-nearest-neighbor warm start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnnMode {
    /// No warm start: breakpoints are sampled uniformly.
    #[default]
    Off,

    /// Average the regions of the k nearest recorded reward vectors.
    Uniform,

    /// Weight neighbor regions by inverse distance.
    DistanceWeighted,
}

/// Pricing solver settings.
#[derive(Debug, Clone)]
pub struct PricingSettings {
    // === Tolerances ===
    /// Feasibility and comparison tolerance.
    pub tol: f64,

    // === Dispatch ===
    /// Try the best-fit heuristic before any exact solve.
    pub use_heuristic: bool,

    /// Re-check accepted heuristic columns under smoothed rewards.
    ///
    /// The stabilized re-run is an optional acceleration: it is accepted
    /// only if the resulting packing still beats the target bound under
    /// the true rewards.
    pub stabilize: bool,

    /// Exponential smoothing factor for the stabilization center.
    pub stabilization_weight: f64,

    /// Enforce the cone purely via lazy rejection cuts, skipping the
    /// piecewise-linear relaxation (a direct exact outer-approximation
    /// solve).
    pub use_exact_cone: bool,

    // === Estimator ===
    /// Tighten the estimator's upper bound once per node from the
    /// aggregate item weights.
    pub tighten_bounds: bool,

    /// Minimum number of breakpoints in any estimator.
    pub min_points: usize,

    // === Warm start ===
    /// Warm-start weighting mode.
    pub knn_mode: KnnMode,

    /// Number of neighbors consulted per warm-start query.
    pub neighbors: usize,

    /// Fraction of breakpoints concentrated inside the hinted region,
    /// relative to its share of the domain. A ratio of 1 disables
    /// concentration.
    pub point_ratio: f64,

    // === Refinement loop ===
    /// Allow the candidate callback to abort a relaxation solve when
    /// consecutive rejected candidates stop moving.
    pub adaptive_abort: bool,

    /// Fraction of the observed mu range below which two consecutive
    /// rejected candidates count as stalled.
    pub stall_fraction: f64,

    // === Statistics ===
    /// Shift parameter of the log-sum running gap average.
    pub gap_shift: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tol: 1e-6,

            use_heuristic: true,
            stabilize: false,
            stabilization_weight: 0.3,
            use_exact_cone: false,

            tighten_bounds: true,
            min_points: 10,

            knn_mode: KnnMode::default(),
            neighbors: 1,
            point_ratio: 1.0,

            adaptive_abort: true,
            stall_fraction: 0.1,

            gap_shift: 1.0,
        }
    }
}

impl PricingSettings {
    /// Disable the heuristic-first path (every call prices exactly).
    pub fn exact_only() -> Self {
        Self {
            use_heuristic: false,
            ..Default::default()
        }
    }

    /// Enable the warm-start learner.
    pub fn with_knn(mut self, mode: KnnMode, neighbors: usize, point_ratio: f64) -> Self {
        self.knn_mode = mode;
        self.neighbors = neighbors.max(1);
        self.point_ratio = point_ratio;
        self
    }

    /// Enable the stabilized heuristic re-check.
    pub fn with_stabilization(mut self) -> Self {
        self.stabilize = true;
        self
    }

    /// Use the direct exact-cone path instead of the piecewise-linear
    /// relaxation.
    pub fn with_exact_cone(mut self) -> Self {
        self.use_exact_cone = true;
        self
    }

    /// Whether the warm-start learner is active for this configuration.
    pub fn knn_enabled(&self) -> bool {
        self.knn_mode != KnnMode::Off && (self.point_ratio - 1.0).abs() > self.tol
    }
}
