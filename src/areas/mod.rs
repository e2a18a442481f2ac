//! Collaborators around the pure graph pipeline
//!
//! - `source`: capabilities the host provides (log, branches, ancestry)
//! - `git`: those capabilities on top of the `git` executable
//! - `store`: snapshot persistence
//! - `cache`: the incremental cache manager tying them together

pub mod cache;
pub mod git;
pub mod source;
pub mod store;
