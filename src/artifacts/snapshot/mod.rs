//! Serializable graph snapshot
//!
//! - `dag`: the persisted `DagSnapshot` handed to renderers
//! - `pipeline`: runs eviction, graph building, merge inference and layout in one go

pub mod dag;
pub mod pipeline;

pub use dag::{Dag, DagLink, DagNode, DagSnapshot};
pub use pipeline::{GraphOptions, compute, evict_oldest, layout_for};
