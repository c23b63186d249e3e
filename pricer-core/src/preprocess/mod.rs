//! Node-level preprocessing of branching constraints.
//!
//! Same/differ branching decisions arrive as pairs of original item
//! indices. Items tied by "same" pairs are merged into compound items
//! through a union-find; "differ" pairs are lifted to compound indices
//! and become a conflict graph over the merged instance.

mod conflict;
mod merge;

pub use conflict::ConflictGraph;
pub use merge::{MergedItems, UnionFind};
