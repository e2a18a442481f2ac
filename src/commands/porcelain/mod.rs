//! User-facing commands
//!
//! - `layout`: lay out a raw log dump and print the lanes
//! - `snapshot`: build or load the cached snapshot of a repository and print it as JSON

pub mod layout;
pub mod snapshot;
