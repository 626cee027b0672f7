mod config;
mod github;
mod history;
mod readme;
mod shell;
mod stats;

use anyhow::Result;
use clap::Parser;
use config::Config;
use github::GithubClient;
use history::GitHistory;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sync contributor statistics into the README", long_about = None)]
struct Cli {
    /// JSON config file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document to rewrite, overrides the config
    #[arg(long)]
    readme: Option<PathBuf>,

    /// Repository to count commits in, overrides the config
    #[arg(long)]
    repo_dir: Option<PathBuf>,

    /// GitHub token for pull request counts
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Compute and report, but leave the document untouched
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(readme) = cli.readme {
        config.readme = readme;
    }
    if let Some(repo_dir) = cli.repo_dir {
        config.repo_dir = repo_dir;
    }

    info!(
        "Syncing {} contributors of {}/{} into {}",
        config.contributors.len(),
        config.owner,
        config.repo,
        config.readme.display()
    );

    let history = GitHistory::new(&config.repo_dir);
    let client = GithubClient::new(&config.api_base, &config.owner, &config.repo, cli.token)?;

    let stats = stats::aggregate(&config.contributors, &history, &client).await?;
    let report = readme::sync_file(&config.readme, &stats, &config.contributors, cli.dry_run)?;

    println!(
        "{} markers updated, {} unchanged, {} missing ({} commits in total).",
        report.updated(),
        report.unchanged(),
        report.missing(),
        stats.total_commits
    );

    Ok(())
}
