use anyhow::{Context, Result};
use bit_graph::commands::porcelain::layout::{LayoutOptions, layout};
use bit_graph::commands::porcelain::snapshot::{SnapshotOptions, snapshot};
use bit_graph::config::GraphConfig;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bit-graph",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Commit graph layout with an incremental snapshot cache",
    long_about = "Lays out a commit history as coloured tracks for a graph renderer. \
    Snapshots are cached per HEAD and later heads are built incrementally on top of them.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "layout",
        about = "Lay out raw log records",
        long_about = "This command reads records in the `%H%x00%P%x00%D%x00%ct` log format \
        and prints the track, colour, short hash and branches of every commit."
    )]
    Layout {
        #[arg(short, long, help = "File to read the records from (stdin by default)")]
        input: Option<PathBuf>,
        #[arg(short, long, help = "The checked-out branch")]
        current: Option<String>,
        #[arg(long, help = "Maximum number of commits to lay out")]
        max_commits: Option<usize>,
    },
    #[command(
        name = "snapshot",
        about = "Print the cached graph snapshot of a repository",
        long_about = "This command builds the graph snapshot of a repository at a given head, \
        reusing cached snapshots of earlier heads, and prints it as JSON."
    )]
    Snapshot {
        #[arg(short, long, default_value = ".", help = "Path to the repository")]
        repo: PathBuf,
        #[arg(long, help = "Revision to snapshot (HEAD by default)")]
        head: Option<String>,
        #[arg(long, help = "Directory to persist snapshots in")]
        cache_dir: Option<PathBuf>,
        #[arg(long, help = "Maximum number of commits in the snapshot")]
        max_commits: Option<usize>,
        #[arg(long, help = "Lifetime of in-memory snapshots, in seconds")]
        ttl: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = GraphConfig::load_from_env()?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Layout {
            input,
            current,
            max_commits,
        } => {
            let raw = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut raw = String::new();
                    std::io::stdin()
                        .read_to_string(&mut raw)
                        .context("Failed to read stdin")?;
                    raw
                }
            };

            let opts = LayoutOptions {
                current_branch: current,
                max_commits: max_commits.unwrap_or(config.max_commits),
                colour: stdout.is_terminal(),
            };
            layout(&raw, &opts, &mut stdout)?;
        }
        Commands::Snapshot {
            repo,
            head,
            cache_dir,
            max_commits,
            ttl,
        } => {
            if let Some(max_commits) = max_commits {
                config = config.with_max_commits(max_commits);
            }
            if let Some(ttl) = ttl {
                config = config.with_memory_ttl(Duration::from_secs(ttl));
            }

            let opts = SnapshotOptions {
                repo,
                head,
                cache_dir,
                config,
            };
            snapshot(&opts, &mut stdout).await?;
        }
    }

    Ok(())
}
