//! Error types for the pricing solver.

use thiserror::Error;

/// Errors that can occur while solving a pricing subproblem.
///
/// Recoverable conditions (time-limit exhaustion, stalled refinement) are
/// reported through [`crate::model::SolType`] instead of an error; only
/// conditions the caller cannot act on locally surface here.
#[derive(Error, Debug)]
pub enum PricingError {
    /// Instance or request validation failed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external MILP backend reported a modeling error or an
    /// unexpected status
    #[error("Solver fault: {0}")]
    SolverFault(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;
