//! Layout vertex
//!
//! One vertex per commit row. Vertices live in the arena owned by
//! [`CommitGraph`](crate::artifacts::graph::builder::CommitGraph) and point at each other
//! by row index, so the parent/child web never needs shared ownership.

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexFlags: u8 {
        const NONE = 0b00;
        const COMMITTED = 0b01;
        const CURRENT = 0b10;
    }
}

impl fmt::Debug for VertexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VertexFlags::COMMITTED) {
            flags.push("COMMITTED");
        }
        if self.contains(VertexFlags::CURRENT) {
            flags.push("CURRENT");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

/// Reference to a vertex in the arena
///
/// Parents outside the loaded window all resolve to the shared `Sentinel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexRef {
    Row(usize),
    Sentinel,
}

impl VertexRef {
    /// Serialized id of the sentinel vertex
    pub const SENTINEL_ID: i64 = -1;

    pub fn id(&self) -> i64 {
        match self {
            VertexRef::Row(row) => *row as i64,
            VertexRef::Sentinel => Self::SENTINEL_ID,
        }
    }

    pub fn row(&self) -> Option<usize> {
        match self {
            VertexRef::Row(row) => Some(*row),
            VertexRef::Sentinel => None,
        }
    }
}

/// A track/row position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

/// An occupied track on a row and what it leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    connects_to: VertexRef,
    branch: usize,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    row: usize,
    x: usize,
    branch: Option<usize>,
    flags: VertexFlags,
    parents: Vec<VertexRef>,
    children: Vec<usize>,
    next_parent: usize,
    /// First free track on this row; tracks below it are listed in `connections`
    next_x: usize,
    connections: Vec<Connection>,
}

impl Vertex {
    pub fn new(row: usize) -> Self {
        Vertex {
            row,
            x: 0,
            branch: None,
            flags: VertexFlags::COMMITTED,
            parents: Vec::new(),
            children: Vec::new(),
            next_parent: 0,
            next_x: 0,
            connections: Vec::new(),
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn flags(&self) -> VertexFlags {
        self.flags
    }

    pub fn is_committed(&self) -> bool {
        self.flags.contains(VertexFlags::COMMITTED)
    }

    pub fn is_current(&self) -> bool {
        self.flags.contains(VertexFlags::CURRENT)
    }

    pub(crate) fn mark_current(&mut self) {
        self.flags |= VertexFlags::CURRENT;
    }

    pub(crate) fn mark_uncommitted(&mut self) {
        self.flags.remove(VertexFlags::COMMITTED);
    }

    pub(crate) fn add_parent(&mut self, parent: VertexRef) {
        self.parents.push(parent);
    }

    pub(crate) fn add_child(&mut self, child: usize) {
        self.children.push(child);
    }

    pub fn parents(&self) -> &[VertexRef] {
        &self.parents
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The first parent whose edge has not been laid out yet
    pub fn next_parent(&self) -> Option<VertexRef> {
        self.parents.get(self.next_parent).copied()
    }

    pub fn has_unprocessed_parent(&self) -> bool {
        self.next_parent < self.parents.len()
    }

    pub(crate) fn register_parent_processed(&mut self) {
        self.next_parent += 1;
    }

    /// Bind the vertex to a branch at track `x`
    ///
    /// Binding is write-once: later calls are ignored.
    pub(crate) fn add_to_branch(&mut self, branch: usize, x: usize) {
        if self.branch.is_none() {
            self.branch = Some(branch);
            self.x = x;
        }
    }

    pub fn branch(&self) -> Option<usize> {
        self.branch
    }

    pub fn is_bound(&self) -> bool {
        self.branch.is_some()
    }

    pub fn point(&self) -> Point {
        Point {
            x: self.x,
            y: self.row,
        }
    }

    pub fn next_point(&self) -> Point {
        Point {
            x: self.next_x,
            y: self.row,
        }
    }

    /// Number of tracks occupied on this row
    pub fn track_count(&self) -> usize {
        self.next_x
    }

    /// Find the track on this row that already leads to `vertex` on `branch`
    pub fn point_connecting_to(&self, vertex: VertexRef, branch: usize) -> Option<Point> {
        self.connections
            .iter()
            .position(|connection| connection.connects_to == vertex && connection.branch == branch)
            .map(|x| Point { x, y: self.row })
    }

    /// Mark track `x` as occupied
    ///
    /// Only the next free track can be claimed; claiming any other track is a no-op
    /// because it is either already taken or would leave a gap.
    pub(crate) fn register_unavailable_point(
        &mut self,
        x: usize,
        connects_to: VertexRef,
        branch: usize,
    ) {
        if x == self.next_x {
            self.next_x = x + 1;
            self.connections.push(Connection {
                connects_to,
                branch,
            });
        }
    }
}
