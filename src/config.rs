use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// One entry of the contributor registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contributor {
    /// GitHub login, also used as the `git rev-list --author` filter.
    pub login: String,
    /// Name shown in the README's pie chart.
    pub display_name: String,
}

impl Contributor {
    pub fn new(login: &str, display_name: &str) -> Self {
        Self {
            login: login.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    pub readme: PathBuf,
    pub repo_dir: PathBuf,
    pub api_base: String,
    pub contributors: Vec<Contributor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "contribsync".to_string(),
            repo: "contribsync".to_string(),
            readme: PathBuf::from("README.md"),
            repo_dir: PathBuf::from("."),
            api_base: DEFAULT_API_BASE.to_string(),
            contributors: vec![
                Contributor::new("octocat", "The Octocat"),
                Contributor::new("hubot", "Hubot"),
            ],
        }
    }
}

impl Config {
    /// Load the JSON config at `path`, or the built-in defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_json(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse config JSON")
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.is_empty() || self.repo.is_empty() {
            bail!("owner and repo must both be set");
        }

        let mut logins = HashSet::new();
        let mut names = HashSet::new();
        for c in &self.contributors {
            if c.login.trim().is_empty() {
                bail!("contributor login must not be empty");
            }
            if c.display_name.trim().is_empty() {
                bail!("contributor {} has an empty display name", c.login);
            }
            if !logins.insert(c.login.as_str()) {
                bail!("contributor {} is listed more than once", c.login);
            }
            // Chart entries are keyed by display name.
            if !names.insert(c.display_name.as_str()) {
                bail!("display name {:?} is used more than once", c.display_name);
            }
        }

        Ok(())
    }
}
