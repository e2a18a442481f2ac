use crate::artifacts::graph::builder::{GraphBuilder, sorted_newest_first};
use crate::artifacts::graph::layout::{self, GraphLayout};
use crate::artifacts::log::ParsedLog;
use crate::artifacts::merge::infer_merges;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::dag::DagSnapshot;
use crate::config::GraphConfig;
use crate::errors::GraphError;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    pub current_branch: Option<String>,
    /// Local branch names; derived from the decorations when absent
    pub branches: Option<Vec<String>>,
    pub max_commits: usize,
    pub uncommitted_changes: bool,
}

/// Keep the `max_commits` newest records
///
/// Records are ranked like graph rows (newest first, parse order between equal
/// timestamps); the survivors keep their original order.
pub fn evict_oldest(log: ParsedLog, max_commits: usize) -> ParsedLog {
    if log.len() <= max_commits {
        return log;
    }

    let keep = sorted_newest_first(log.iter())
        .into_iter()
        .take(max_commits)
        .map(|record| record.hash.clone())
        .collect::<HashSet<ObjectId>>();

    debug!(
        "Evicting {} commits over the limit of {}",
        log.len() - max_commits,
        max_commits
    );

    log.into_records()
        .into_iter()
        .filter(|record| keep.contains(&record.hash))
        .collect()
}

/// Run eviction, graph building, merge inference and layout
pub fn compute(
    log: ParsedLog,
    options: &GraphOptions,
) -> Result<(GraphLayout, DagSnapshot), GraphError> {
    let log = evict_oldest(log, options.max_commits);

    let branches = options.branches.clone().unwrap_or_else(|| {
        log.iter()
            .flat_map(|record| record.branches.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    });

    let graph = GraphBuilder::new(&log)
        .current_branch(options.current_branch.as_deref())
        .uncommitted_changes(options.uncommitted_changes)
        .build();
    let merges = infer_merges(&graph);
    let layout = layout::layout(graph)?;
    let snapshot = DagSnapshot::from_layout(&layout, merges, branches);

    Ok((layout, snapshot))
}

/// Lay out a parsed log with the limits of `config`
pub fn layout_for(
    log: ParsedLog,
    current_branch: Option<&str>,
    config: &GraphConfig,
) -> Result<(GraphLayout, DagSnapshot), GraphError> {
    let options = GraphOptions {
        current_branch: current_branch.map(str::to_string),
        max_commits: config.max_commits,
        ..GraphOptions::default()
    };

    compute(log, &options)
}
