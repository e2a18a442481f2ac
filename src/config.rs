//! Graph cache configuration
//!
//! Values come from [`GraphConfig::default`], can be overridden from the environment with
//! [`GraphConfig::load_from_env`] and are finally overridden by CLI flags.

use anyhow::Context;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default cap on the number of commits kept in a snapshot
pub const DEFAULT_MAX_COMMITS: usize = 800;

/// Default lifetime of an entry in the in-memory snapshot layer
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(300);

/// Default number of snapshots kept in memory
pub const DEFAULT_MEMORY_CAPACITY: usize = 64;

const MAX_COMMITS_ENV: &str = "BIT_GRAPH_MAX_COMMITS";
const MEMORY_TTL_ENV: &str = "BIT_GRAPH_MEMORY_TTL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Maximum number of commits in a snapshot, older commits are evicted
    pub max_commits: usize,
    /// How long a snapshot stays in the in-memory layer
    pub memory_ttl: Duration,
    /// Number of snapshots the in-memory layer holds before evicting the least recent one
    pub memory_capacity: NonZeroUsize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_commits: DEFAULT_MAX_COMMITS,
            memory_ttl: DEFAULT_MEMORY_TTL,
            memory_capacity: NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl GraphConfig {
    /// Load the configuration from environment variables
    ///
    /// Reads `BIT_GRAPH_MAX_COMMITS` and `BIT_GRAPH_MEMORY_TTL` (seconds). Unset variables
    /// keep their defaults, malformed ones are an error.
    pub fn load_from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(MAX_COMMITS_ENV) {
            config.max_commits = value
                .trim()
                .parse()
                .with_context(|| format!("{MAX_COMMITS_ENV} is not a number: {value}"))?;
        }

        if let Ok(value) = std::env::var(MEMORY_TTL_ENV) {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("{MEMORY_TTL_ENV} is not a number: {value}"))?;
            config.memory_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_max_commits(mut self, max_commits: usize) -> Self {
        self.max_commits = max_commits;
        self
    }

    pub fn with_memory_ttl(mut self, memory_ttl: Duration) -> Self {
        self.memory_ttl = memory_ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_caps_at_eight_hundred_commits() {
        let config = GraphConfig::default();

        assert_eq!(config.max_commits, 800);
        assert_eq!(config.memory_ttl, Duration::from_secs(300));
        assert_eq!(config.memory_capacity.get(), 64);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = GraphConfig::default()
            .with_max_commits(2)
            .with_memory_ttl(Duration::from_secs(1));

        assert_eq!(config.max_commits, 2);
        assert_eq!(config.memory_ttl, Duration::from_secs(1));
    }
}
