use crate::common::redirect_temp_dir;
use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::{FileWriteStr, PathChild};
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository with a merged feature branch
///
/// ```text
/// * merge (master)
/// |\
/// | * feature work (feature)
/// * | master work
/// |/
/// * initial
/// ```
#[fixture]
pub fn merged_repository_dir(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();

    run_git_command(dir, &["init", "-q", "-b", "master"])
        .assert()
        .success();

    git_commit_file(dir, "1.txt", "one", "Initial commit", "2023-01-01 10:00:00 +0000");
    run_git_command(dir, &["branch", "feature"]).assert().success();
    git_commit_file(dir, "2.txt", "two", "Master work", "2023-01-01 11:00:00 +0000");

    run_git_command(dir, &["checkout", "-q", "feature"])
        .assert()
        .success();
    git_commit_file(dir, "3.txt", "three", "Feature work", "2023-01-01 12:00:00 +0000");

    run_git_command(dir, &["checkout", "-q", "master"])
        .assert()
        .success();
    with_commit_env(
        run_git_command(dir, &["merge", "-q", "--no-ff", "-m", "Merge feature", "feature"]),
        "2023-01-01 13:00:00 +0000",
    )
    .assert()
    .success();

    repository_dir
}

pub fn run_bit_graph_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bit-graph").expect("Failed to find bit-graph binary");
    cmd.env_remove("BIT_GRAPH_MAX_COMMITS");
    cmd.env_remove("BIT_GRAPH_MEMORY_TTL");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

fn with_commit_env(mut cmd: Command, date: &str) -> Command {
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", "fake_user"),
        ("GIT_AUTHOR_EMAIL", "fake_email@email.com"),
        ("GIT_COMMITTER_NAME", "fake_user"),
        ("GIT_COMMITTER_EMAIL", "fake_email@email.com"),
        ("GIT_AUTHOR_DATE", date), // %Y-%m-%d %H:%M:%S %z
        ("GIT_COMMITTER_DATE", date),
    ]);
    cmd
}

/// Write a file and commit it with a fixed author and committer date
pub fn git_commit_file(dir: &Path, file: &str, content: &str, message: &str, date: &str) {
    let repository = assert_fs::fixture::ChildPath::new(dir);
    repository
        .child(file)
        .write_str(content)
        .expect("Failed to write file");

    run_git_command(dir, &["add", file]).assert().success();
    with_commit_env(run_git_command(dir, &["commit", "-q", "-m", message]), date)
        .assert()
        .success();
}

pub fn rev_parse(dir: &Path, revision: &str) -> String {
    let output = run_git_command(dir, &["rev-parse", revision])
        .output()
        .expect("Failed to run git rev-parse");

    String::from_utf8(output.stdout)
        .expect("git printed invalid UTF-8")
        .trim()
        .to_string()
}

/// Raw log dump in the format the layout command reads
pub fn log_dump(dir: &Path) -> String {
    let output = run_git_command(
        dir,
        &[
            "log",
            "--all",
            "--date-order",
            "--decorate=full",
            "--format=%H%x00%P%x00%D%x00%ct",
        ],
    )
    .output()
    .expect("Failed to run git log");

    String::from_utf8(output.stdout).expect("git printed invalid UTF-8")
}
