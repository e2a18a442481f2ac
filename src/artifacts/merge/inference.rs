use crate::artifacts::graph::builder::CommitGraph;
use crate::artifacts::graph::vertex::VertexRef;
use crate::artifacts::objects::object_id::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A branch merged into another one at `commit`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeEdge {
    pub from: String,
    pub to: String,
    pub commit: ObjectId,
}

/// Branch names each row belongs to
///
/// A branch decorating a commit also covers that commit's first-parent chain. Rows are
/// visited top-down, so children hand their names to first parents below them before
/// those parents are visited.
pub fn branch_membership(graph: &CommitGraph) -> Vec<BTreeSet<String>> {
    let mut membership = (0..graph.len())
        .map(|row| {
            graph
                .commit(row)
                .map(|commit| commit.branches.clone())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    for row in 0..graph.len() {
        if let Some(VertexRef::Row(parent)) = graph.vertex(row).parents().first().copied()
            && parent != row
        {
            let names = membership[row].clone();
            membership[parent].extend(names);
        }
    }

    membership
}

/// Infer merge edges for every merge commit, newest first
///
/// At a merge, names shared with the first parent but missing from the second parent are
/// the branch merged into; names of the second parent are the branches merged from. The
/// checked-out branch wins when several targets qualify. Each `(from, to)` pair is only
/// reported at its most recent merge.
pub fn infer_merges(graph: &CommitGraph) -> Vec<MergeEdge> {
    fn names_of<'m>(
        membership: &'m [BTreeSet<String>],
        empty: &'m BTreeSet<String>,
        parent: Option<&VertexRef>,
    ) -> &'m BTreeSet<String> {
        match parent {
            Some(VertexRef::Row(row)) => &membership[*row],
            _ => empty,
        }
    }

    let membership = branch_membership(graph);
    let empty = BTreeSet::new();

    let mut seen = HashSet::<(String, String)>::new();
    let mut merges = Vec::new();

    for (row, vertex) in graph.vertices().iter().enumerate() {
        if !vertex.is_merge() {
            continue;
        }
        let Some(commit) = graph.commit(row) else {
            continue;
        };

        let first = names_of(&membership, &empty, vertex.parents().first());
        let second = names_of(&membership, &empty, vertex.parents().get(1));

        let to_candidates = membership[row]
            .intersection(first)
            .filter(|name| !second.contains(*name))
            .collect::<Vec<_>>();
        let from_candidates = second
            .iter()
            .filter(|name| !to_candidates.contains(name))
            .collect::<Vec<_>>();

        if to_candidates.is_empty() || from_candidates.is_empty() {
            continue;
        }

        let to = graph
            .current_branch()
            .and_then(|current| {
                to_candidates
                    .iter()
                    .find(|name| name.as_str() == current)
                    .copied()
            })
            .unwrap_or(to_candidates[0]);

        for from in from_candidates {
            if from == to {
                continue;
            }
            if seen.insert((from.clone(), to.clone())) {
                merges.push(MergeEdge {
                    from: from.clone(),
                    to: to.clone(),
                    commit: commit.hash.clone(),
                });
            }
        }
    }

    merges
}
