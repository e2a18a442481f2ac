use anyhow::anyhow;
use bit_graph::areas::source::{
    AncestorChecker, BranchHead, BranchSummary, CommitSource, LogRange,
};
use bit_graph::areas::store::SnapshotStore;
use bit_graph::artifacts::objects::commit::CommitRecord;
use bit_graph::artifacts::objects::object_id::ObjectId;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn oid(n: u32) -> ObjectId {
    ObjectId::try_parse(format!("{:040x}", n)).expect("valid object id")
}

/// In-memory repository that counts how often it is asked for history
#[derive(Debug, Default)]
pub struct FakeRepo {
    id: String,
    commits: Vec<CommitRecord>,
    heads: BTreeMap<String, ObjectId>,
    current: Option<String>,
    fetches: AtomicUsize,
    ranges: Mutex<Vec<LogRange>>,
    pub fail_fetch: AtomicBool,
    pub fail_ancestor: AtomicBool,
}

impl FakeRepo {
    pub fn new(id: &str) -> Self {
        FakeRepo {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Add commit `n` with the given parents, `n` seconds after the epoch
    pub fn commit(&mut self, n: u32, parents: &[u32]) -> ObjectId {
        let record = CommitRecord::new(
            oid(n),
            parents.iter().map(|&parent| oid(parent)).collect(),
            i64::from(n) * 1000,
        );
        self.commits.push(record);
        oid(n)
    }

    pub fn set_branch(&mut self, name: &str, n: u32) {
        self.heads.insert(name.to_string(), oid(n));
    }

    pub fn checkout(&mut self, name: &str) {
        self.current = Some(name.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<LogRange> {
        self.ranges.lock().expect("ranges lock").last().cloned()
    }

    fn reachable(&self, from: &ObjectId) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut pending = vec![from.clone()];

        while let Some(hash) = pending.pop() {
            if !seen.insert(hash.clone()) {
                continue;
            }
            if let Some(record) = self.commits.iter().find(|record| record.hash == hash) {
                pending.extend(record.parents.iter().cloned());
            }
        }

        seen
    }

    fn decorated(&self, record: &CommitRecord) -> CommitRecord {
        let branches = self
            .heads
            .iter()
            .filter(|(_, tip)| **tip == record.hash)
            .map(|(name, _)| name.clone());

        record.clone().with_branches(branches)
    }
}

impl CommitSource for FakeRepo {
    fn repo_id(&self) -> &str {
        &self.id
    }

    async fn fetch_log(&self, range: &LogRange, max_commits: usize) -> anyhow::Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().expect("ranges lock").push(range.clone());

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow!("log fetch failed"));
        }

        let included = match range {
            LogRange::All => None,
            LogRange::Since { base, head } => {
                let excluded = self.reachable(base);
                Some(
                    self.reachable(head)
                        .into_iter()
                        .filter(|hash| !excluded.contains(hash))
                        .collect::<HashSet<_>>(),
                )
            }
        };

        let mut records = self
            .commits
            .iter()
            .filter(|record| included.as_ref().is_none_or(|set| set.contains(&record.hash)))
            .collect::<Vec<_>>();
        records.sort_by_key(|record| std::cmp::Reverse(record.timestamp));

        Ok(records
            .into_iter()
            .take(max_commits)
            .map(|record| self.decorated(record).to_log_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn branch_summary(&self) -> anyhow::Result<BranchSummary> {
        Ok(BranchSummary {
            current: self.current.clone(),
            heads: self
                .heads
                .iter()
                .map(|(name, tip)| BranchHead::new(name.clone(), tip.clone()))
                .collect(),
        })
    }
}

impl AncestorChecker for FakeRepo {
    async fn is_ancestor(
        &self,
        ancestor: &ObjectId,
        descendant: &ObjectId,
    ) -> anyhow::Result<bool> {
        if self.fail_ancestor.load(Ordering::SeqCst) {
            return Err(anyhow!("ancestor check failed"));
        }

        Ok(self.reachable(descendant).contains(ancestor))
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

impl SnapshotStore for FailingStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Err(anyhow!("store is offline"))
    }

    async fn set(&self, _key: &str, _value: String) -> anyhow::Result<()> {
        Err(anyhow!("store is offline"))
    }
}
