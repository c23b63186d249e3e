//! Piecewise-linear estimator of the conic capacity term and the
//! warm-start history it learns from.

mod breakpoints;
mod knn;

pub use breakpoints::{Breakpoint, Breakpoints};
pub use knn::History;
