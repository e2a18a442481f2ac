//! Layout branches and their line segments
//!
//! A layout branch is one coloured track through the graph. It is not necessarily a git
//! ref: a first-parent chain that spans several refs is still one branch.

use crate::artifacts::graph::vertex::Point;
use serde::Serialize;

/// Segment between two points of a branch
///
/// `locked_first` tells the renderer which end anchors the bend: `p1` when set, `p2`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
    pub is_committed: bool,
    pub locked_first: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(rename = "colorIndex")]
    colour: usize,
    start: usize,
    end: usize,
    lines: Vec<Line>,
    num_uncommitted: usize,
}

impl Branch {
    pub fn new(colour: usize, start: usize) -> Self {
        Branch {
            colour,
            start,
            end: start,
            lines: Vec::new(),
            num_uncommitted: 0,
        }
    }

    pub fn add_line(&mut self, p1: Point, p2: Point, is_committed: bool, locked_first: bool) {
        self.lines.push(Line {
            p1,
            p2,
            is_committed,
            locked_first,
        });
        if !is_committed {
            self.num_uncommitted += 1;
        }
    }

    pub fn colour(&self) -> usize {
        self.colour
    }

    /// Row the branch was started from
    pub fn start(&self) -> usize {
        self.start
    }

    /// Row the branch stopped at (exclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    pub(crate) fn set_end(&mut self, end: usize) {
        self.end = end;
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn num_uncommitted(&self) -> usize {
        self.num_uncommitted
    }
}
