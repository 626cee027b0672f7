use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

const USER_AGENT: &str = "contribsync";

/// Source of per-author pull-request counts.
#[async_trait]
pub trait PullRequestSource {
    /// Never fails: anything that goes wrong is logged and counted as zero.
    async fn pull_request_count(&self, login: &str) -> u64;
}

#[derive(Deserialize)]
struct SearchResponse {
    total_count: u64,
}

pub struct GithubClient {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubClient {
    /// Create a REST client for `owner/repo`. A missing `token` is not an
    /// error; every count will simply be zero.
    pub fn new(api_base: &str, owner: &str, repo: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn search_query(&self, login: &str) -> String {
        format!("repo:{}/{} author:{login} type:pr", self.owner, self.repo)
    }

    async fn search(&self, token: &str, login: &str) -> Result<(StatusCode, String)> {
        let resp = self
            .http
            .get(format!("{}/search/issues", self.api_base))
            .query(&[("q", self.search_query(login))])
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .context("Network error sending search request")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("Failed to read search response body")?;

        Ok((status, body))
    }
}

#[async_trait]
impl PullRequestSource for GithubClient {
    async fn pull_request_count(&self, login: &str) -> u64 {
        let Some(token) = self.token.as_deref() else {
            warn!("GITHUB_TOKEN not set; counting 0 pull requests for {login}");
            return 0;
        };

        match self.search(token, login).await {
            Ok((status, body)) => count_from_response(status, &body, login),
            Err(e) => {
                warn!("pull request search for {login} failed: {e:#}");
                0
            }
        }
    }
}

/// Only HTTP 200 with a parsable body yields a count.
fn count_from_response(status: StatusCode, body: &str, login: &str) -> u64 {
    if status != StatusCode::OK {
        warn!(
            "GitHub search for {login} returned HTTP {}; counting 0",
            status.as_u16()
        );
        return 0;
    }

    match serde_json::from_str::<SearchResponse>(body) {
        Ok(parsed) => {
            debug!("{login}: {} pull requests", parsed.total_count);
            parsed.total_count
        }
        Err(e) => {
            warn!("unexpected search response for {login}: {e}");
            0
        }
    }
}
