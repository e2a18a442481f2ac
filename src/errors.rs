//! Error kinds surfaced by the graph pipeline
//!
//! Most of the crate returns `anyhow::Result` like the rest of the code base; these kinds
//! are attached as the root cause where callers may want to match on them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A raw log record could not be turned into a commit record.
    #[error("Malformed log record: {0}")]
    Parse(String),

    /// The ancestor check could not be answered, so no incremental path exists.
    #[error("Ancestor check failed for {ancestor}..{descendant}")]
    MissingAncestor {
        ancestor: String,
        descendant: String,
    },

    /// The snapshot store is missing or failed.
    #[error("Snapshot storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The lane assignment left a vertex without a branch.
    #[error("Layout invariant violated: vertex at row {row} is not bound to a branch")]
    LayoutInvariantViolation { row: usize },
}
