use crate::artifacts::graph::layout::GraphLayout;
use crate::artifacts::log::LogParser;
use crate::artifacts::snapshot::layout_for;
use crate::config::GraphConfig;
use colored::{Color, Colorize};
use std::io::Write;

/// Colours cycled through by colour index
const PALETTE: [Color; 6] = [
    Color::Green,
    Color::Red,
    Color::Blue,
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
];

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub current_branch: Option<String>,
    pub max_commits: usize,
    /// Colour commits by their colour index
    pub colour: bool,
}

/// Lay out a raw log dump and print one line per commit
///
/// Each line holds the track, the colour index, the short hash and the local branches
/// pointing at the commit.
pub fn layout(raw: &str, opts: &LayoutOptions, writer: &mut dyn Write) -> anyhow::Result<()> {
    let log = LogParser::new().parse(raw);
    let config = GraphConfig::default().with_max_commits(opts.max_commits);
    let (layout, _) = layout_for(log, opts.current_branch.as_deref(), &config)?;

    for line in render(&layout, opts.colour) {
        writeln!(writer, "{}", line)?;
    }

    Ok(())
}

fn render(layout: &GraphLayout, colour: bool) -> Vec<String> {
    let graph = layout.graph();

    layout
        .commit_layouts()
        .into_iter()
        .enumerate()
        .filter_map(|(row, commit_layout)| {
            let commit = graph.commit(row)?;
            let short_oid = commit.hash.to_short_oid();
            let short_oid = if colour {
                short_oid
                    .as_str()
                    .color(PALETTE[commit_layout.colour % PALETTE.len()])
                    .to_string()
            } else {
                short_oid
            };

            let mut line = format!("{} {} {}", commit_layout.x, commit_layout.colour, short_oid);
            if !commit.branches.is_empty() {
                let branches = commit.branches.iter().cloned().collect::<Vec<_>>().join(", ");
                line.push_str(&format!(" ({})", branches));
            }
            if graph.vertex(row).is_current() {
                line.push_str(" *");
            }

            Some(line)
        })
        .collect()
}
