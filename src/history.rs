use crate::shell;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Source of local commit counts.
pub trait CommitHistory {
    /// Number of commits whose author matches `login`.
    fn author_commits(&self, login: &str) -> Result<u64>;

    /// Number of commits in the whole history.
    fn total_commits(&self) -> Result<u64>;
}

/// Counts commits with `git rev-list --count`. When git fails it prints
/// nothing on stdout, which the parser rejects.
pub struct GitHistory {
    repo_dir: PathBuf,
}

impl GitHistory {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    fn count(&self, command: &str) -> Result<u64> {
        let output = shell::run(command, &self.repo_dir);
        parse_count(&output).with_context(|| format!("Failed to count commits with `{command}`"))
    }
}

impl CommitHistory for GitHistory {
    fn author_commits(&self, login: &str) -> Result<u64> {
        let command = format!(
            "git rev-list --count --author={} HEAD",
            shell::quote(login)
        );
        self.count(&command)
    }

    fn total_commits(&self) -> Result<u64> {
        self.count("git rev-list --count HEAD")
    }
}

fn parse_count(output: &str) -> Result<u64> {
    output
        .trim()
        .parse::<u64>()
        .with_context(|| format!("expected a commit count, got {output:?}"))
}
