//! `git` executable collaborator
//!
//! Implements [`CommitSource`] and [`AncestorChecker`] by spawning `git` through
//! `tokio::process` inside a working tree.

use crate::areas::source::{AncestorChecker, BranchHead, BranchSummary, CommitSource, LogRange};
use crate::artifacts::objects::commit::LOCAL_BRANCH_PREFIX;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::{Context, anyhow};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Record format understood by the log parser: hash, parents, decorations, commit time
const LOG_FORMAT: &str = "--format=%H%x00%P%x00%D%x00%ct";

const REF_FORMAT: &str = "--format=%(refname)%00%(objectname)";

#[derive(Debug, Clone)]
pub struct GitCli {
    path: Box<Path>,
    repo_id: String,
}

impl GitCli {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Repository path {} does not exist", path.display()))?;

        Ok(GitCli {
            repo_id: path.display().to_string(),
            path: path.into_boxed_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the checked-out commit
    pub async fn head(&self) -> anyhow::Result<ObjectId> {
        self.resolve("HEAD").await
    }

    /// Resolve a revision (branch, tag, abbreviated hash) to a commit hash
    pub async fn resolve(&self, revision: &str) -> anyhow::Result<ObjectId> {
        let commit = format!("{revision}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "-q", commit.as_str()]).await?;
        let stdout = Self::stdout_of(output)
            .with_context(|| format!("Unknown revision {revision}"))?;

        ObjectId::try_parse(stdout.trim().to_string())
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        debug!("Running git {}", args.join(" "));

        Command::new("git")
            .arg("-C")
            .arg(self.path.as_os_str())
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run git {}", args.join(" ")))
    }

    fn stdout_of(output: Output) -> anyhow::Result<String> {
        if !output.status.success() {
            return Err(anyhow!(
                "git exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        String::from_utf8(output.stdout).context("git printed invalid UTF-8")
    }

    async fn current_branch(&self) -> anyhow::Result<Option<String>> {
        let output = self.run(&["symbolic-ref", "--short", "-q", "HEAD"]).await?;

        // exit code 1 means a detached HEAD
        match output.status.code() {
            Some(1) => Ok(None),
            _ => {
                let name = Self::stdout_of(output)?.trim().to_string();
                Ok((!name.is_empty()).then_some(name))
            }
        }
    }
}

impl CommitSource for GitCli {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    async fn fetch_log(&self, range: &LogRange, max_commits: usize) -> anyhow::Result<String> {
        let max_commits = max_commits.to_string();
        let revisions = match range {
            LogRange::All => "--all".to_string(),
            LogRange::Since { base, head } => format!("{base}..{head}"),
        };
        let args = [
            "log",
            "--date-order",
            "--decorate=full",
            LOG_FORMAT,
            "-n",
            max_commits.as_str(),
            revisions.as_str(),
        ];

        let output = self.run(&args).await?;
        Self::stdout_of(output)
    }

    async fn branch_summary(&self) -> anyhow::Result<BranchSummary> {
        let output = self
            .run(&["for-each-ref", REF_FORMAT, LOCAL_BRANCH_PREFIX])
            .await?;
        let heads = Self::stdout_of(output)?
            .lines()
            .filter_map(|line| {
                let (refname, tip) = line.split_once('\0')?;
                let name = refname.strip_prefix(LOCAL_BRANCH_PREFIX)?;
                let tip = ObjectId::try_parse(tip.trim().to_string()).ok()?;

                Some(BranchHead::new(name.to_string(), tip))
            })
            .collect();

        Ok(BranchSummary {
            current: self.current_branch().await?,
            heads,
        })
    }
}

impl AncestorChecker for GitCli {
    async fn is_ancestor(
        &self,
        ancestor: &ObjectId,
        descendant: &ObjectId,
    ) -> anyhow::Result<bool> {
        let output = self
            .run(&[
                "merge-base",
                "--is-ancestor",
                ancestor.as_ref(),
                descendant.as_ref(),
            ])
            .await?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(anyhow!(
                "git merge-base failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )),
        }
    }
}
