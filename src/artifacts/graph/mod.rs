//! Commit graph and lane layout
//!
//! - `vertex`: one commit's position, its edges and the tracks claimed on its row
//! - `branch`: coloured tracks and their line segments
//! - `builder`: builds the vertex arena from normalized records
//! - `layout`: assigns tracks, branches and colours
//!
//! Vertices and branches only live for one layout computation. Cross references between
//! them are arena indices.

pub mod branch;
pub mod builder;
pub mod layout;
pub mod vertex;

pub use branch::{Branch, Line};
pub use builder::{CommitGraph, GraphBuilder};
pub use layout::{CommitLayout, GraphLayout, LaneAssigner};
pub use vertex::{Point, Vertex, VertexRef};
