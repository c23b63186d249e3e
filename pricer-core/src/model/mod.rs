//! Instance data and solution types.

mod instance;
mod solution;

pub use instance::Instance;
pub use solution::{PricingOutcome, PricingStats, SolType, SolutionPool};
