//! Incremental graph snapshot cache
//!
//! [`GraphCache::get_or_build`] answers "what does the graph look like at `head`" while
//! touching the repository as little as possible:
//!
//! 1. A hot in-memory layer (LRU with a time to live) keyed by repository and head
//! 2. The snapshot store, keyed by `branchGraph:<repoId>:<head>`
//! 3. An incremental rebuild on top of an older stored head that is an ancestor of `head`
//! 4. A full rebuild from the log of all refs
//!
//! Every rebuild is persisted and recorded in the per-repository index so later heads can
//! build on it. Rebuilds for the same repository never overlap.
//!
//! ## Failures
//!
//! Storage failures only cost the persistence, the result stays in memory. A failed
//! rebuild yields an empty snapshot that is neither persisted nor cached.

use crate::areas::source::{AncestorChecker, BranchSummary, CommitSource, LogRange};
use crate::areas::store::{SnapshotStore, index_key, snapshot_key};
use crate::artifacts::log::{LogParser, ParsedLog};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::{DagSnapshot, GraphOptions, compute};
use crate::config::GraphConfig;
use crate::errors::GraphError;
use anyhow::Context;
use lru::LruCache;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type MemoryKey = (String, ObjectId);

#[derive(Debug, Clone)]
struct MemoryEntry {
    stored_at: Instant,
    snapshot: DagSnapshot,
}

pub struct GraphCache<S: SnapshotStore> {
    config: GraphConfig,
    store: Option<S>,
    memory: Mutex<LruCache<MemoryKey, MemoryEntry>>,
    /// One lock per repository with a call in progress, held for a whole `get_or_build`
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: SnapshotStore> GraphCache<S> {
    pub fn new(store: S, config: GraphConfig) -> Self {
        Self::with_store(Some(store), config)
    }

    /// Cache without persistence; snapshots only live in the hot layer
    pub fn memory_only(config: GraphConfig) -> Self {
        Self::with_store(None, config)
    }

    fn with_store(store: Option<S>, config: GraphConfig) -> Self {
        GraphCache {
            memory: Mutex::new(LruCache::new(config.memory_capacity)),
            config,
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Snapshot of `repo` at `head`, from cache when possible
    pub async fn get_or_build<R>(&self, repo: &R, head: &ObjectId) -> DagSnapshot
    where
        R: CommitSource + AncestorChecker,
    {
        let repo_id = repo.repo_id();
        let lock = self.repo_lock(repo_id).await;
        let snapshot = {
            let _guard = lock.lock().await;
            self.lookup_or_build(repo, head).await
        };
        self.release_repo_lock(repo_id, lock).await;

        snapshot
    }

    async fn lookup_or_build<R>(&self, repo: &R, head: &ObjectId) -> DagSnapshot
    where
        R: CommitSource + AncestorChecker,
    {
        let repo_id = repo.repo_id();

        if let Some(snapshot) = self.memory_get(repo_id, head).await {
            debug!("Memory hit for {}@{}", repo_id, head.to_short_oid());
            return snapshot;
        }

        if let Some(snapshot) = self.load_snapshot(repo_id, head).await {
            debug!("Store hit for {}@{}", repo_id, head.to_short_oid());
            self.memory_put(repo_id, head, snapshot.clone()).await;
            return snapshot;
        }

        let summary = match repo.branch_summary().await {
            Ok(summary) => summary,
            Err(err) => {
                warn!("Failed to read the branches of {}: {:#}", repo_id, err);
                return DagSnapshot::empty(Vec::new(), None);
            }
        };

        match self.rebuild(repo, head, &summary).await {
            Ok(snapshot) => {
                self.persist(repo_id, head, &snapshot).await;
                self.memory_put(repo_id, head, snapshot.clone()).await;
                snapshot
            }
            Err(err) => {
                warn!(
                    "Failed to build the graph of {}@{}: {:#}",
                    repo_id,
                    head.to_short_oid(),
                    err
                );
                DagSnapshot::empty(summary.names(), summary.current)
            }
        }
    }

    /// Drop the hot entries of one repository
    ///
    /// Persisted snapshots are keyed by head hash and never go stale, so they are kept.
    pub async fn invalidate(&self, repo_id: &str) {
        let mut memory = self.memory.lock().await;
        let stale = memory
            .iter()
            .filter(|(key, _)| key.0 == repo_id)
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();

        debug!("Invalidating {} snapshots of {}", stale.len(), repo_id);
        for key in stale {
            memory.pop(&key);
        }
    }

    async fn repo_lock(&self, repo_id: &str) -> Arc<Mutex<()>> {
        self.in_flight
            .lock()
            .await
            .entry(repo_id.to_string())
            .or_default()
            .clone()
    }

    /// Give back a lock from [`Self::repo_lock`], dropping its entry once nobody holds it
    async fn release_repo_lock(&self, repo_id: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        drop(lock);

        if in_flight
            .get(repo_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            in_flight.remove(repo_id);
        }
    }

    async fn rebuild<R>(
        &self,
        repo: &R,
        head: &ObjectId,
        summary: &BranchSummary,
    ) -> anyhow::Result<DagSnapshot>
    where
        R: CommitSource + AncestorChecker,
    {
        let log = match self.incremental_log(repo, head).await {
            Some(log) => log,
            None => {
                info!("Full graph rebuild for {}@{}", repo.repo_id(), head.to_short_oid());
                let raw = repo
                    .fetch_log(&LogRange::All, self.config.max_commits)
                    .await
                    .context("Failed to fetch the commit log")?;
                LogParser::new().parse(&raw)
            }
        };

        let options = GraphOptions {
            current_branch: summary.current.clone(),
            branches: (!summary.heads.is_empty()).then(|| summary.names()),
            max_commits: self.config.max_commits,
            uncommitted_changes: false,
        };
        let (_, snapshot) = compute(refresh_decorations(log, summary), &options)?;

        Ok(snapshot)
    }

    /// Log of `head` assembled from the newest stored ancestor and the commits since
    ///
    /// # Returns
    ///
    /// `None` when no stored head is an ancestor of `head`, or when fetching the missing
    /// commits fails.
    async fn incremental_log<R>(&self, repo: &R, head: &ObjectId) -> Option<ParsedLog>
    where
        R: CommitSource + AncestorChecker,
    {
        let repo_id = repo.repo_id();
        let index = self.load_index(repo_id).await;

        for candidate in index.iter().rev().filter(|candidate| *candidate != head) {
            match repo.is_ancestor(candidate, head).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    let missing = GraphError::MissingAncestor {
                        ancestor: candidate.to_string(),
                        descendant: head.to_string(),
                    };
                    debug!("{}: {:#}", missing, err);
                    return None;
                }
            }

            let Some(base) = self.load_snapshot(repo_id, candidate).await else {
                continue;
            };

            let range = LogRange::Since {
                base: candidate.clone(),
                head: head.clone(),
            };
            return match repo.fetch_log(&range, self.config.max_commits).await {
                Ok(raw) => {
                    let mut log = LogParser::new().parse(&raw);
                    debug!(
                        "Incremental rebuild of {}@{}: {} new commits on top of {}",
                        repo_id,
                        head.to_short_oid(),
                        log.len(),
                        candidate.to_short_oid()
                    );
                    log.extend(base.to_records());
                    Some(log)
                }
                Err(err) => {
                    warn!("Incremental fetch failed, rebuilding from scratch: {:#}", err);
                    None
                }
            };
        }

        None
    }

    async fn memory_get(&self, repo_id: &str, head: &ObjectId) -> Option<DagSnapshot> {
        let key = (repo_id.to_string(), head.clone());
        let mut memory = self.memory.lock().await;

        let expired = match memory.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.config.memory_ttl => {
                return Some(entry.snapshot.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            memory.pop(&key);
        }

        None
    }

    async fn memory_put(&self, repo_id: &str, head: &ObjectId, snapshot: DagSnapshot) {
        let entry = MemoryEntry {
            stored_at: Instant::now(),
            snapshot,
        };

        self.memory
            .lock()
            .await
            .put((repo_id.to_string(), head.clone()), entry);
    }

    async fn load_snapshot(&self, repo_id: &str, head: &ObjectId) -> Option<DagSnapshot> {
        self.read_json(&snapshot_key(repo_id, head.as_ref()))
            .await
            .unwrap_or_else(|err| {
                warn!("{}", GraphError::StorageUnavailable(format!("{err:#}")));
                None
            })
    }

    /// Stored heads of a repository, oldest first
    async fn load_index(&self, repo_id: &str) -> Vec<ObjectId> {
        self.read_json(&index_key(repo_id))
            .await
            .unwrap_or_else(|err| {
                warn!("{}", GraphError::StorageUnavailable(format!("{err:#}")));
                None
            })
            .unwrap_or_default()
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        match store.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)
                    .with_context(|| format!("Corrupt cache entry {key}"))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    async fn persist(&self, repo_id: &str, head: &ObjectId, snapshot: &DagSnapshot) {
        if self.store.is_none() || snapshot.is_empty() {
            return;
        }

        if let Err(err) = self.try_persist(repo_id, head, snapshot).await {
            warn!("{}", GraphError::StorageUnavailable(format!("{err:#}")));
        }
    }

    async fn try_persist(
        &self,
        repo_id: &str,
        head: &ObjectId,
        snapshot: &DagSnapshot,
    ) -> anyhow::Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        store
            .set(
                &snapshot_key(repo_id, head.as_ref()),
                serde_json::to_string(snapshot)?,
            )
            .await?;

        let mut index = self
            .read_json::<Vec<ObjectId>>(&index_key(repo_id))
            .await?
            .unwrap_or_default();
        if !index.contains(head) {
            index.push(head.clone());
            store
                .set(&index_key(repo_id), serde_json::to_string(&index)?)
                .await?;
        }

        Ok(())
    }
}

/// Replace record decorations with the current branch tips
///
/// Stored snapshots carry the decorations of the time they were built; once a branch
/// moves, only the branch summary knows where it points.
fn refresh_decorations(log: ParsedLog, summary: &BranchSummary) -> ParsedLog {
    if summary.heads.is_empty() {
        return log;
    }

    log.into_records()
        .into_iter()
        .map(|mut record| {
            record.branches = summary.branches_at(&record.hash);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::source::BranchHead;
    use crate::areas::store::MemoryStore;
    use crate::artifacts::objects::commit::CommitRecord;
    use std::time::Duration;

    fn oid(n: u8) -> ObjectId {
        ObjectId::try_parse(format!("{:040x}", n)).unwrap()
    }

    #[test]
    fn decorations_follow_the_branch_tips() {
        let log: ParsedLog = [
            CommitRecord::new(oid(2), vec![oid(1)], 2_000),
            CommitRecord::new(oid(1), vec![], 1_000).with_branches(["main"]),
        ]
        .into_iter()
        .collect();
        let summary = BranchSummary {
            current: Some("main".to_string()),
            heads: vec![BranchHead::new("main".to_string(), oid(2))],
        };

        let log = refresh_decorations(log, &summary);

        assert!(log.records()[0].branches.contains("main"));
        assert!(log.records()[1].branches.is_empty());
    }

    #[test]
    fn decorations_are_kept_without_branch_tips() {
        let log: ParsedLog = [CommitRecord::new(oid(1), vec![], 1_000).with_branches(["main"])]
            .into_iter()
            .collect();

        let log = refresh_decorations(log, &BranchSummary::default());

        assert!(log.records()[0].branches.contains("main"));
    }

    #[tokio::test]
    async fn expired_memory_entries_are_dropped() {
        let config = GraphConfig::default().with_memory_ttl(Duration::ZERO);
        let cache = GraphCache::<MemoryStore>::memory_only(config);
        let snapshot = DagSnapshot::empty(vec!["main".to_string()], None);

        cache.memory_put("repo", &oid(1), snapshot).await;

        assert_eq!(cache.memory_get("repo", &oid(1)).await, None);
        assert_eq!(cache.memory.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn invalidate_only_touches_one_repository() {
        let cache = GraphCache::<MemoryStore>::memory_only(GraphConfig::default());
        let snapshot = DagSnapshot::empty(Vec::new(), None);

        cache.memory_put("a", &oid(1), snapshot.clone()).await;
        cache.memory_put("a", &oid(2), snapshot.clone()).await;
        cache.memory_put("b", &oid(1), snapshot.clone()).await;
        cache.invalidate("a").await;

        assert_eq!(cache.memory_get("a", &oid(1)).await, None);
        assert_eq!(cache.memory_get("b", &oid(1)).await, Some(snapshot));
    }

    #[tokio::test]
    async fn repository_locks_are_dropped_once_released() {
        let cache = GraphCache::<MemoryStore>::memory_only(GraphConfig::default());

        let first = cache.repo_lock("a").await;
        let second = cache.repo_lock("a").await;
        assert!(Arc::ptr_eq(&first, &second));

        cache.release_repo_lock("a", first).await;
        assert_eq!(cache.in_flight.lock().await.len(), 1);

        cache.release_repo_lock("a", second).await;
        assert!(cache.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn lock_map_stays_empty_across_repositories() {
        let cache = GraphCache::<MemoryStore>::memory_only(GraphConfig::default());

        for n in 0..50u8 {
            let repo_id = format!("repo-{n}");
            let lock = cache.repo_lock(&repo_id).await;
            drop(lock.lock().await);
            cache.release_repo_lock(&repo_id, lock).await;
        }

        assert!(cache.in_flight.lock().await.is_empty());
    }
}
