//! Conic knapsack pricing for branch-and-price.
//!
//! Solves the pricing subproblem
//!
//! ```text
//! maximize   reward . x
//! subject to mu . x + dalpha * sqrt(b . x) <= capacity
//!            x_a + x_b <= 1    for every exclusion pair (a, b)
//!            x binary
//! ```
//!
//! and reports a packing only when its reward beats a caller-supplied
//! target bound. The cone is handled by a piecewise-linear relaxation of
//! the capacity curve `(capacity - mu)^2`, solved through a pluggable
//! MILP backend with lazy rejection cuts and iterative breakpoint
//! refinement.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pricer_core::{EnumerationBackend, Instance, Pricer, PricingSettings};
//!
//! let instance = Instance::new(
//!     vec![1.0, 2.0, 1.5],  // linear weights
//!     vec![0.5, 1.0, 0.7],  // conic weights
//!     1.0,                  // dalpha
//!     6.0,                  // capacity
//! )?;
//! let mut pricer = Pricer::new(
//!     instance,
//!     PricingSettings::default(),
//!     EnumerationBackend::new(),
//! );
//!
//! let outcome = pricer.price(&[3.0, 5.0, 4.0], 1.0, Duration::from_secs(5))?;
//! assert!(outcome.sol_type.has_solution());
//! # Ok::<(), pricer_core::PricingError>(())
//! ```

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod estimator;
pub mod heuristic;
pub mod milp;
pub mod model;
pub mod preprocess;
pub mod pricer;
pub mod settings;

pub use engine::{solve_refine, EngineReport};
pub use error::{PricingError, PricingResult};
pub use estimator::{Breakpoint, Breakpoints, History};
pub use heuristic::{best_fit, HeurSolution};
pub use milp::{
    CandidateVerdict, ConeCut, EnumerationBackend, MilpBackend, MilpOutcome, MilpStatus,
    RelaxedModel,
};
pub use model::{Instance, PricingOutcome, PricingStats, SolType, SolutionPool};
pub use preprocess::{ConflictGraph, MergedItems, UnionFind};
pub use pricer::{NodeContext, Pricer};
pub use settings::{KnnMode, PricingSettings};
