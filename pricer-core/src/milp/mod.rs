//! Relaxed model description and MILP backend abstraction.
//!
//! The refine engine builds a [`RelaxedModel`] and hands it to a
//! [`MilpBackend`] together with a candidate callback. Production
//! deployments wire in an external solver; the bundled
//! [`EnumerationBackend`] solves small models exactly and backs the test
//! suite.

mod backend;
mod enumerate;

pub use backend::{CandidateVerdict, ConeCut, MilpBackend, MilpOutcome, MilpStatus, RelaxedModel};
pub use enumerate::EnumerationBackend;
