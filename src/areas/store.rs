//! Snapshot persistence
//!
//! Snapshots are stored as JSON strings under two kinds of keys:
//!
//! - `branchGraph:<repoId>:<headHash>`: one serialized `DagSnapshot`
//! - `branchGraphIndex:<repoId>`: JSON array of the head hashes stored so far, oldest first
//!
//! `MemoryStore` keeps everything in a map; `FileStore` writes one file per key under a
//! file lock.

use anyhow::Context;
use file_guard::Lock;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub fn snapshot_key(repo_id: &str, head: &str) -> String {
    format!("branchGraph:{repo_id}:{head}")
}

pub fn index_key(repo_id: &str) -> String {
    format!("branchGraphIndex:{repo_id}")
}

#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
}

impl<S: SnapshotStore> SnapshotStore for Arc<S> {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        (**self).set(key, value).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key inside a cache directory
///
/// ## Locking
///
/// Writes hold an exclusive lock on the target file and reads a shared one, so a reader
/// never sees a half written entry. An empty file reads as a missing entry.
///
/// Locks cover single entries only. Two processes updating the same index at once can
/// each read the old list and the later write wins, dropping the other head. That head's
/// snapshot stays stored; later heads just cannot build on it incrementally.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Box<Path>,
}

impl FileStore {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create cache directory {}", path.display()))?;

        Ok(FileStore {
            path: path.to_path_buf().into_boxed_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File holding `key`; characters that are not safe in file names become `_`
    fn key_path(&self, key: &str) -> PathBuf {
        let file_name = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();

        self.path.join(format!("{file_name}.json"))
    }
}

impl SnapshotStore for FileStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key);

        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<String>> {
            let mut file = match std::fs::File::open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            let mut lock = file_guard::lock(&mut file, Lock::Shared, 0, 1)?;

            let mut content = String::new();
            lock.deref_mut().read_to_string(&mut content)?;

            // A writer that created the file but has not locked it yet leaves it empty.
            Ok((!content.is_empty()).then_some(content))
        })
        .await
        .context("Cache reader task panicked")?
        .with_context(|| format!("Failed to read cache entry {key}"))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let path = self.key_path(key);

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            let mut lock = file_guard::lock(&mut file, Lock::Exclusive, 0, 1)?;

            lock.set_len(0)?;
            lock.deref_mut().write_all(value.as_bytes())?;

            Ok(())
        })
        .await
        .context("Cache writer task panicked")?
        .with_context(|| format!("Failed to write cache entry {key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn keys_follow_the_persisted_layout() {
        assert_eq!(snapshot_key("repo", "abc"), "branchGraph:repo:abc");
        assert_eq!(index_key("repo"), "branchGraphIndex:repo");
    }

    #[tokio::test]
    async fn memory_store_round_trips_values() {
        let store = MemoryStore::new();

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v".to_string()).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn file_store_overwrites_entries() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = FileStore::new(dir.path())?;
        let key = snapshot_key("/home/me/repo", "abc");

        assert_eq!(store.get(&key).await?, None);
        store.set(&key, "a much longer first value".to_string()).await?;
        store.set(&key, "short".to_string()).await?;

        assert_eq!(store.get(&key).await?.as_deref(), Some("short"));
        Ok(())
    }

    #[tokio::test]
    async fn file_store_reads_the_last_complete_write() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = FileStore::new(dir.path())?;
        let key = index_key("repo");

        for n in 1..=5 {
            let heads = (0..n).map(|i| format!("\"{i:040x}\"")).collect::<Vec<_>>();
            store.set(&key, format!("[{}]", heads.join(","))).await?;
        }

        let stored = store.get(&key).await?.unwrap_or_default();
        let heads: Vec<String> = serde_json::from_str(&stored)?;
        assert_eq!(heads.len(), 5);
        assert_eq!(heads[4], format!("{:040x}", 4));
        Ok(())
    }

    #[tokio::test]
    async fn file_store_treats_empty_files_as_missing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = FileStore::new(dir.path())?;
        let key = snapshot_key("repo", "abc");

        std::fs::write(store.key_path(&key), "")?;

        assert_eq!(store.get(&key).await?, None);
        Ok(())
    }
}
