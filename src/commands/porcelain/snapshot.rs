use crate::areas::cache::GraphCache;
use crate::areas::git::GitCli;
use crate::areas::store::{FileStore, MemoryStore};
use crate::config::GraphConfig;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub repo: PathBuf,
    /// Revision to snapshot; HEAD when absent
    pub head: Option<String>,
    /// Directory of the persistent snapshot store; memory only when absent
    pub cache_dir: Option<PathBuf>,
    pub config: GraphConfig,
}

/// Build (or load) the snapshot of a repository and print it as JSON
pub async fn snapshot(opts: &SnapshotOptions, writer: &mut dyn Write) -> anyhow::Result<()> {
    let git = GitCli::new(&opts.repo)?;
    let head = match &opts.head {
        Some(revision) => git.resolve(revision).await?,
        None => git.head().await?,
    };

    let snapshot = match &opts.cache_dir {
        Some(dir) => {
            GraphCache::new(FileStore::new(dir)?, opts.config.clone())
                .get_or_build(&git, &head)
                .await
        }
        None => {
            GraphCache::<MemoryStore>::memory_only(opts.config.clone())
                .get_or_build(&git, &head)
                .await
        }
    };

    serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
    writeln!(writer)?;

    Ok(())
}
