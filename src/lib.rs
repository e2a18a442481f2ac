//! Commit graph layout and snapshot caching
//!
//! `bit-graph` turns a raw `git log` dump into a lane/colour layout that a renderer can
//! draw, and caches the resulting snapshot per HEAD so that refreshing after a new commit
//! only has to look at the commits that were added.
//!
//! - `artifacts`: pure data structures and algorithms (log parsing, graph, layout, merges)
//! - `areas`: collaborators and the incremental cache manager
//! - `commands`: CLI command implementations
//! - `config`: tunables shared by the cache and the CLI
//! - `errors`: error kinds surfaced by the library

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;
