//! Commit graph construction
//!
//! Turns normalized records into the vertex arena the lane assignment works on:
//!
//! 1. Records are stable-sorted newest first; the sorted position is the vertex row
//! 2. Parent and child edges are wired by row; parents outside the window go to the
//!    sentinel
//! 3. The vertex carrying the checked-out branch is marked current
//! 4. Optionally, an "uncommitted changes" vertex is put on top of the current vertex

use crate::artifacts::graph::vertex::{Vertex, VertexRef};
use crate::artifacts::log::ParsedLog;
use crate::artifacts::objects::commit::CommitRecord;
use crate::artifacts::objects::object_id::ObjectId;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Sort records newest first, keeping parse order between equal timestamps
pub fn sorted_newest_first<'a, I>(records: I) -> Vec<&'a CommitRecord>
where
    I: IntoIterator<Item = &'a CommitRecord>,
{
    let mut sorted = records.into_iter().collect::<Vec<_>>();
    sorted.sort_by_key(|record| Reverse(record.timestamp));
    sorted
}

/// Vertex arena for one layout run
#[derive(Debug, Clone)]
pub struct CommitGraph {
    vertices: Vec<Vertex>,
    /// Commit behind each row; `None` for the uncommitted changes vertex
    commits: Vec<Option<CommitRecord>>,
    rows: HashMap<ObjectId, usize>,
    current_branch: Option<String>,
}

impl CommitGraph {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, row: usize) -> &Vertex {
        &self.vertices[row]
    }

    pub(crate) fn vertex_mut(&mut self, row: usize) -> &mut Vertex {
        &mut self.vertices[row]
    }

    pub fn commit(&self, row: usize) -> Option<&CommitRecord> {
        self.commits.get(row).and_then(Option::as_ref)
    }

    pub fn commits(&self) -> impl Iterator<Item = &CommitRecord> {
        self.commits.iter().flatten()
    }

    pub fn hash_of(&self, row: usize) -> Option<&ObjectId> {
        self.commit(row).map(|commit| &commit.hash)
    }

    pub fn row_of(&self, hash: &ObjectId) -> Option<usize> {
        self.rows.get(hash).copied()
    }

    pub fn current_branch(&self) -> Option<&str> {
        self.current_branch.as_deref()
    }

    pub fn current_row(&self) -> Option<usize> {
        self.vertices.iter().position(Vertex::is_current)
    }
}

#[derive(Debug, Clone)]
pub struct GraphBuilder<'l> {
    log: &'l ParsedLog,
    current_branch: Option<String>,
    uncommitted_changes: bool,
}

impl<'l> GraphBuilder<'l> {
    pub fn new(log: &'l ParsedLog) -> Self {
        GraphBuilder {
            log,
            current_branch: None,
            uncommitted_changes: false,
        }
    }

    pub fn current_branch(mut self, branch: Option<&str>) -> Self {
        self.current_branch = branch.map(str::to_string);
        self
    }

    /// Put an uncommitted changes vertex on top of the current vertex
    pub fn uncommitted_changes(mut self, enabled: bool) -> Self {
        self.uncommitted_changes = enabled;
        self
    }

    pub fn build(self) -> CommitGraph {
        let sorted = sorted_newest_first(self.log.iter());

        let current_index = self.current_branch.as_deref().and_then(|name| {
            sorted
                .iter()
                .position(|record| record.branches.contains(name))
        });
        let offset = usize::from(self.uncommitted_changes && current_index.is_some());

        let mut vertices = (0..sorted.len() + offset)
            .map(Vertex::new)
            .collect::<Vec<_>>();
        let rows = sorted
            .iter()
            .enumerate()
            .map(|(index, record)| (record.hash.clone(), index + offset))
            .collect::<HashMap<_, _>>();

        for (index, record) in sorted.iter().enumerate() {
            let row = index + offset;
            for parent in &record.parents {
                match rows.get(parent) {
                    Some(&parent_row) => {
                        vertices[row].add_parent(VertexRef::Row(parent_row));
                        vertices[parent_row].add_child(row);
                    }
                    None => vertices[row].add_parent(VertexRef::Sentinel),
                }
            }
        }

        if let Some(index) = current_index {
            let current_row = index + offset;
            vertices[current_row].mark_current();

            if offset == 1 {
                vertices[0].mark_uncommitted();
                vertices[0].add_parent(VertexRef::Row(current_row));
                vertices[current_row].add_child(0);
            }
        }

        let mut commits = Vec::with_capacity(vertices.len());
        if offset == 1 {
            commits.push(None);
        }
        commits.extend(sorted.into_iter().cloned().map(Some));

        CommitGraph {
            vertices,
            commits,
            rows,
            current_branch: self.current_branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn oid(name: &str) -> ObjectId {
        let mut hex = name
            .bytes()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();
        hex.truncate(40);
        while hex.len() < 40 {
            hex.push('0');
        }
        ObjectId::try_parse(hex).unwrap()
    }

    fn record(name: &str, parents: &[&str], timestamp: i64) -> CommitRecord {
        CommitRecord::new(oid(name), parents.iter().map(|p| oid(p)).collect(), timestamp)
    }

    #[test]
    fn rows_follow_descending_timestamp() {
        let log = [
            record("c1", &[], 1_000),
            record("c3", &["c2"], 3_000),
            record("c2", &["c1"], 2_000),
        ]
        .into_iter()
        .collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log).build();

        assert_eq!(graph.hash_of(0), Some(&oid("c3")));
        assert_eq!(graph.hash_of(1), Some(&oid("c2")));
        assert_eq!(graph.hash_of(2), Some(&oid("c1")));
        assert_eq!(graph.vertex(0).parents(), &[VertexRef::Row(1)]);
        assert_eq!(graph.vertex(2).children(), &[1]);
    }

    #[test]
    fn equal_timestamps_keep_parse_order() {
        let log = [
            record("b", &[], 5_000),
            record("a", &[], 5_000),
            record("c", &[], 5_000),
        ]
        .into_iter()
        .collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log).build();

        assert_eq!(graph.row_of(&oid("b")), Some(0));
        assert_eq!(graph.row_of(&oid("a")), Some(1));
        assert_eq!(graph.row_of(&oid("c")), Some(2));
    }

    #[test]
    fn missing_parents_link_to_the_sentinel() {
        let log = [record("tip", &["gone", "base"], 2_000), record("base", &[], 1_000)]
            .into_iter()
            .collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log).build();

        assert_eq!(
            graph.vertex(0).parents(),
            &[VertexRef::Sentinel, VertexRef::Row(1)]
        );
        assert_eq!(graph.vertex(1).children(), &[0]);
    }

    #[test]
    fn current_branch_marks_its_tip() {
        let log = [
            record("tip", &["base"], 2_000).with_branches(["feature"]),
            record("base", &[], 1_000).with_branches(["main"]),
        ]
        .into_iter()
        .collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log).current_branch(Some("main")).build();
        assert_eq!(graph.current_row(), Some(1));
        assert!(!graph.vertex(0).is_current());

        let graph = GraphBuilder::new(&log).current_branch(Some("gone")).build();
        assert_eq!(graph.current_row(), None);
    }

    #[test]
    fn uncommitted_changes_sit_on_top_of_the_current_vertex() {
        let log = [record("tip", &[], 2_000).with_branches(["main"])]
            .into_iter()
            .collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log)
            .current_branch(Some("main"))
            .uncommitted_changes(true)
            .build();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.commit(0), None);
        assert!(!graph.vertex(0).is_committed());
        assert_eq!(graph.vertex(0).parents(), &[VertexRef::Row(1)]);
        assert_eq!(graph.row_of(&oid("tip")), Some(1));
        assert_eq!(graph.current_row(), Some(1));
    }

    #[test]
    fn uncommitted_changes_need_a_current_vertex() {
        let log = [record("tip", &[], 2_000)].into_iter().collect::<ParsedLog>();

        let graph = GraphBuilder::new(&log).uncommitted_changes(true).build();

        assert_eq!(graph.len(), 1);
        assert!(graph.vertex(0).is_committed());
    }
}
