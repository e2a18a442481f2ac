//! Lane assignment for the commit graph
//!
//! This module assigns every vertex a track (`x`) and a coloured [`Branch`], and draws the
//! line segments that connect consecutive vertices of each branch.
//!
//! ## Algorithm Overview
//!
//! Rows are scanned top-down (newest first). Whenever a vertex is not yet on a branch, or
//! still has a parent edge that has not been drawn, a path is traced from it:
//!
//! ### Normal branch
//!
//! A colour is allocated with [`LaneAssigner::get_available_colour`] and a new branch is
//! started at the vertex. The path walks down row by row, claiming the next free track of
//! every row it crosses, until it reaches the parent. The parent joins the branch and the
//! walk continues with the parent's own first unprocessed parent, so a first-parent chain
//! stays on one branch and one colour. The walk stops when there is no further parent or
//! when it lands on a vertex that already belongs to another branch.
//!
//! ### Merge continuation
//!
//! When a merge vertex and its next parent are both already placed, no new branch is
//! needed: the path is drawn on the parent's branch and stops as soon as it meets a track
//! that already leads to the parent. A parent sorted above the merge is skipped.
//!
//! ### Colour reuse
//!
//! `available_colours[c]` holds the end row of the branch that last used colour `c`. A
//! branch starting at row `s` takes the lowest colour with `s > available_colours[c]`, or
//! a new colour when none qualifies.
//!
//! ## Determinism
//!
//! Only vectors are iterated, so identical input rows always produce identical tracks,
//! colours and lines.
//!
//! ## Debug Logging
//!
//! Build with `--features debug_layout` to trace every traced path and claimed track.

use crate::artifacts::graph::branch::Branch;
use crate::artifacts::graph::builder::CommitGraph;
use crate::artifacts::graph::vertex::{Point, Vertex, VertexRef};
use crate::errors::GraphError;
use serde::Serialize;
use tracing::error;

/// Trace logging that is compiled in only with the `debug_layout` feature flag
///
/// # Usage
/// ```rust,ignore
/// debug_log!("Tracing path from row {}", row);
/// ```
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_layout")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

/// Placement of one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitLayout {
    pub x: usize,
    #[serde(rename = "colorIndex")]
    pub colour: usize,
    #[serde(rename = "branchRef")]
    pub branch: usize,
}

/// Result of a lane assignment run
#[derive(Debug, Clone)]
pub struct GraphLayout {
    graph: CommitGraph,
    branches: Vec<Branch>,
}

impl GraphLayout {
    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn layout_of(&self, row: usize) -> Option<CommitLayout> {
        let vertex = self.graph.vertices().get(row)?;
        let branch = vertex.branch()?;

        Some(CommitLayout {
            x: vertex.x(),
            colour: self.branches[branch].colour(),
            branch,
        })
    }

    /// Placement of every row, top to bottom
    pub fn commit_layouts(&self) -> Vec<CommitLayout> {
        (0..self.graph.len())
            .filter_map(|row| self.layout_of(row))
            .collect()
    }

    /// Number of tracks in use on each row
    pub fn widths_at_rows(&self) -> Vec<usize> {
        self.graph
            .vertices()
            .iter()
            .map(|vertex| vertex.track_count().max(vertex.x() + 1))
            .collect()
    }
}

/// Assigns tracks and branches to the vertices of one graph
///
/// All state lives in the assigner and is dropped with it, so running several layouts
/// side by side needs no synchronization.
#[derive(Debug)]
pub struct LaneAssigner {
    graph: CommitGraph,
    branches: Vec<Branch>,
    available_colours: Vec<usize>,
}

impl LaneAssigner {
    pub fn new(graph: CommitGraph) -> Self {
        LaneAssigner {
            graph,
            branches: Vec::new(),
            available_colours: Vec::new(),
        }
    }

    /// Lay out the whole graph
    ///
    /// # Returns
    ///
    /// The layout, or `LayoutInvariantViolation` if a vertex ended up without a branch
    pub fn run(mut self) -> Result<GraphLayout, GraphError> {
        let mut row = 0;
        while row < self.graph.len() {
            let vertex = self.graph.vertex(row);
            if vertex.has_unprocessed_parent() || !vertex.is_bound() {
                self.determine_path(row);
            } else {
                row += 1;
            }
        }

        self.bind_leftovers();

        if let Some(row) = self.graph.vertices().iter().position(|v| !v.is_bound()) {
            error!("Vertex at row {} left without a branch after layout", row);
            return Err(GraphError::LayoutInvariantViolation { row });
        }

        Ok(GraphLayout {
            graph: self.graph,
            branches: self.branches,
        })
    }

    /// First colour whose previous branch ended strictly before `start_at`
    fn get_available_colour(&mut self, start_at: usize) -> usize {
        if let Some(colour) = self
            .available_colours
            .iter()
            .position(|&end| start_at > end)
        {
            return colour;
        }

        self.available_colours.push(0);
        self.available_colours.len() - 1
    }

    fn vertex(&self, row: usize) -> &Vertex {
        self.graph.vertex(row)
    }

    fn vertex_mut(&mut self, row: usize) -> &mut Vertex {
        self.graph.vertex_mut(row)
    }

    fn determine_path(&mut self, start_at: usize) {
        let vertex = self.vertex(start_at);
        let parent = vertex.next_parent();
        let last_point = if vertex.is_bound() {
            vertex.point()
        } else {
            vertex.next_point()
        };

        if let Some(VertexRef::Row(parent_row)) = parent
            && vertex.is_merge()
            && vertex.is_bound()
            && let Some(parent_branch) = self.vertex(parent_row).branch()
        {
            self.continue_merge(start_at, parent_row, parent_branch, last_point);
        } else {
            self.trace_branch(start_at, parent, last_point);
        }
    }

    /// Draw a merge edge on the branch the parent already belongs to
    fn continue_merge(
        &mut self,
        start_at: usize,
        parent_row: usize,
        parent_branch: usize,
        mut last_point: Point,
    ) {
        debug_log!(
            "Merge continuation from row {} to parent row {} on branch {}",
            start_at,
            parent_row,
            parent_branch
        );

        // A parent sorted above its child (clock skew) is never met below it, so the edge
        // is dropped without drawing on a branch that already ended.
        if parent_row < start_at {
            self.vertex_mut(start_at).register_parent_processed();
            return;
        }

        let target = VertexRef::Row(parent_row);
        let is_committed = self.vertex(start_at).is_committed();

        for row in start_at + 1..self.graph.len() {
            let connecting = self.vertex(row).point_connecting_to(target, parent_branch);
            let found = connecting.is_some();
            let cur_point = connecting.unwrap_or_else(|| self.vertex(row).next_point());
            let locked_first = if found || row == parent_row {
                true
            } else {
                last_point.x < cur_point.x
            };

            self.branches[parent_branch].add_line(last_point, cur_point, is_committed, locked_first);
            self.vertex_mut(row)
                .register_unavailable_point(cur_point.x, target, parent_branch);
            last_point = cur_point;

            if found {
                break;
            }
        }

        self.vertex_mut(start_at).register_parent_processed();
    }

    /// Start a new branch at `start_at` and follow the first-parent chain down
    fn trace_branch(&mut self, start_at: usize, mut parent: Option<VertexRef>, last_point: Point) {
        let colour = self.get_available_colour(start_at);
        let branch = self.branches.len();
        self.branches.push(Branch::new(colour, start_at));

        debug_log!(
            "Branch {} (colour {}) starts at row {} with parent {:?}",
            branch,
            colour,
            start_at,
            parent
        );

        let mut vertex = start_at;
        self.vertex_mut(vertex).add_to_branch(branch, last_point.x);
        self.vertex_mut(vertex)
            .register_unavailable_point(last_point.x, VertexRef::Row(vertex), branch);

        let end = if parent.is_none() {
            start_at + 1
        } else {
            let mut last_point = last_point;
            let mut row = start_at + 1;

            while row < self.graph.len() {
                let Some(target) = parent else {
                    break;
                };
                let reached = target == VertexRef::Row(row);
                let cur_point = if reached && self.vertex(row).is_bound() {
                    self.vertex(row).point()
                } else {
                    self.vertex(row).next_point()
                };
                let is_committed = self.vertex(vertex).is_committed();

                self.branches[branch].add_line(
                    last_point,
                    cur_point,
                    is_committed,
                    last_point.x < cur_point.x,
                );
                self.vertex_mut(row)
                    .register_unavailable_point(cur_point.x, target, branch);
                debug_log!("  row {} claims track {}", row, cur_point.x);
                last_point = cur_point;

                if reached {
                    self.vertex_mut(vertex).register_parent_processed();
                    let was_bound = self.vertex(row).is_bound();
                    self.vertex_mut(row).add_to_branch(branch, cur_point.x);
                    vertex = row;
                    parent = self.vertex(vertex).next_parent();

                    if parent.is_none() || was_bound {
                        break;
                    }
                }

                row += 1;
            }

            if row == self.graph.len() {
                // Ran off the bottom: the parent is outside the window or above its child.
                self.vertex_mut(vertex).register_parent_processed();
            }

            row
        };

        self.branches[branch].set_end(end);
        self.available_colours[colour] = end;
    }

    /// Give every vertex the scan left unbound its own single-point branch
    fn bind_leftovers(&mut self) {
        for row in 0..self.graph.len() {
            if self.vertex(row).is_bound() {
                continue;
            }

            let colour = self.get_available_colour(row);
            let branch = self.branches.len();
            let mut singleton = Branch::new(colour, row);
            singleton.set_end(row + 1);
            self.branches.push(singleton);

            let x = self.vertex(row).next_point().x;
            self.vertex_mut(row).add_to_branch(branch, x);
            self.vertex_mut(row)
                .register_unavailable_point(x, VertexRef::Row(row), branch);
            self.available_colours[colour] = row + 1;
        }
    }
}

/// Lay out a freshly built graph
pub fn layout(graph: CommitGraph) -> Result<GraphLayout, GraphError> {
    LaneAssigner::new(graph).run()
}
