use crate::artifacts::graph::layout::GraphLayout;
use crate::artifacts::merge::MergeEdge;
use crate::artifacts::objects::commit::CommitRecord;
use crate::artifacts::objects::object_id::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagNode {
    pub hash: ObjectId,
    pub parents: Vec<ObjectId>,
    pub branches: Vec<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub is_merge: bool,
}

impl From<&CommitRecord> for DagNode {
    fn from(record: &CommitRecord) -> Self {
        DagNode {
            hash: record.hash.clone(),
            parents: record.parents.clone(),
            branches: record.branches.iter().cloned().collect(),
            timestamp: record.timestamp,
            is_merge: record.is_merge(),
        }
    }
}

impl From<&DagNode> for CommitRecord {
    fn from(node: &DagNode) -> Self {
        CommitRecord::new(node.hash.clone(), node.parents.clone(), node.timestamp)
            .with_branches(node.branches.iter().cloned())
    }
}

/// Child to parent edge between two loaded commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagLink {
    pub source: ObjectId,
    pub target: ObjectId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    pub nodes: Vec<DagNode>,
    pub links: Vec<DagLink>,
}

/// Layout and topology for one HEAD state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagSnapshot {
    pub branches: Vec<String>,
    pub merges: Vec<MergeEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<Dag>,
}

impl DagSnapshot {
    /// Snapshot with no commits, used whenever a rebuild fails
    pub fn empty(branches: Vec<String>, current_branch: Option<String>) -> Self {
        DagSnapshot {
            branches,
            merges: Vec::new(),
            current_branch,
            dag: Some(Dag::default()),
        }
    }

    pub fn from_layout(layout: &GraphLayout, merges: Vec<MergeEdge>, branches: Vec<String>) -> Self {
        let graph = layout.graph();
        let nodes = graph.commits().map(DagNode::from).collect::<Vec<_>>();
        let links = graph
            .commits()
            .flat_map(|commit| {
                commit
                    .parents
                    .iter()
                    .filter(|parent| graph.row_of(parent).is_some())
                    .map(|parent| DagLink {
                        source: commit.hash.clone(),
                        target: parent.clone(),
                    })
            })
            .collect();

        DagSnapshot {
            branches,
            merges,
            current_branch: graph.current_branch().map(str::to_string),
            dag: Some(Dag { nodes, links }),
        }
    }

    pub fn nodes(&self) -> &[DagNode] {
        self.dag
            .as_ref()
            .map(|dag| dag.nodes.as_slice())
            .unwrap_or_default()
    }

    pub fn links(&self) -> &[DagLink] {
        self.dag
            .as_ref()
            .map(|dag| dag.links.as_slice())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Turn the stored nodes back into commit records, newest first
    pub fn to_records(&self) -> Vec<CommitRecord> {
        self.nodes().iter().map(CommitRecord::from).collect()
    }
}
