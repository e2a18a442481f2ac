//! Merge relationship inference
//!
//! - `inference`: derives `{from, to}` edges from the branches around merge commits
//!
//! The result is a heuristic: a branch deleted or moved after it was merged can be
//! attributed to the wrong side, or not at all. It never fails.

pub mod inference;

pub use inference::{MergeEdge, branch_membership, infer_merges};
