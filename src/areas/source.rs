//! Capabilities the host provides to the graph cache
//!
//! The cache only talks to version control through these traits. [`GitCli`] implements
//! them on top of the `git` executable; hosts with their own git plumbing implement them
//! directly.
//!
//! [`GitCli`]: crate::areas::git::GitCli

use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use std::collections::BTreeSet;

/// Which commits a log fetch should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRange {
    /// Every commit reachable from any ref
    All,
    /// Commits reachable from `head` but not from `base`
    Since { base: ObjectId, head: ObjectId },
}

/// A local branch and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct BranchHead {
    pub name: String,
    pub tip: ObjectId,
}

/// Local branches and the checked-out one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSummary {
    /// `None` when HEAD is detached
    pub current: Option<String>,
    pub heads: Vec<BranchHead>,
}

impl BranchSummary {
    pub fn names(&self) -> Vec<String> {
        self.heads.iter().map(|head| head.name.clone()).collect()
    }

    /// Names of the branches whose tip is `hash`
    pub fn branches_at(&self, hash: &ObjectId) -> BTreeSet<String> {
        self.heads
            .iter()
            .filter(|head| &head.tip == hash)
            .map(|head| head.name.clone())
            .collect()
    }
}

#[allow(async_fn_in_trait)]
pub trait CommitSource {
    /// Stable identity of the repository, used in cache keys
    fn repo_id(&self) -> &str;

    /// Raw log records in the `hash\0parents\0refs\0seconds` format, newest first
    async fn fetch_log(&self, range: &LogRange, max_commits: usize) -> anyhow::Result<String>;

    async fn branch_summary(&self) -> anyhow::Result<BranchSummary>;
}

#[allow(async_fn_in_trait)]
pub trait AncestorChecker {
    /// Whether `ancestor` is reachable from `descendant`
    async fn is_ancestor(
        &self,
        ancestor: &ObjectId,
        descendant: &ObjectId,
    ) -> anyhow::Result<bool>;
}
