//! Graph data structures and algorithms
//!
//! This module contains the pure part of the pipeline:
//!
//! - `objects`: commit ids and normalized commit records
//! - `log`: raw log parsing
//! - `graph`: vertex arena, branches and lane assignment
//! - `merge`: merge relationship inference
//! - `snapshot`: the serializable result and the pipeline producing it

pub mod graph;
pub mod log;
pub mod merge;
pub mod objects;
pub mod snapshot;
