use crate::config::Contributor;
use crate::github::PullRequestSource;
use crate::history::CommitHistory;
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct ContributorStats {
    pub commits: u64,
    pub pull_requests: u64,
    /// Share of `Stats::total_commits`, 0..=100, two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total_commits: u64,
    /// Registry order.
    pub contributors: Vec<(String, ContributorStats)>,
}

impl Stats {
    pub fn get(&self, login: &str) -> Option<&ContributorStats> {
        self.contributors
            .iter()
            .find(|(l, _)| l == login)
            .map(|(_, s)| s)
    }
}

/// `100 * count / total` rounded to two decimals; zero when `total` is zero.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

pub async fn aggregate(
    contributors: &[Contributor],
    history: &impl CommitHistory,
    prs: &(impl PullRequestSource + Sync),
) -> Result<Stats> {
    let total_commits = history
        .total_commits()
        .context("Failed to count total commits")?;
    info!("{total_commits} commits in total");

    let mut out = Vec::with_capacity(contributors.len());
    for c in contributors {
        let commits = history
            .author_commits(&c.login)
            .with_context(|| format!("Failed to count commits for {}", c.login))?;
        let pull_requests = prs.pull_request_count(&c.login).await;
        let percentage = percentage(commits, total_commits);

        println!(
            "{}: {commits} commits, {pull_requests} PRs, {percentage}%",
            c.login
        );

        out.push((
            c.login.clone(),
            ContributorStats {
                commits,
                pull_requests,
                percentage,
            },
        ));
    }

    Ok(Stats {
        total_commits,
        contributors: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeHistory {
        total: Option<u64>,
        by_author: HashMap<&'static str, u64>,
    }

    impl CommitHistory for FakeHistory {
        fn author_commits(&self, login: &str) -> Result<u64> {
            self.by_author
                .get(login)
                .copied()
                .ok_or_else(|| anyhow!("expected a commit count, got \"\""))
        }

        fn total_commits(&self) -> Result<u64> {
            self.total.ok_or_else(|| anyhow!("expected a commit count, got \"\""))
        }
    }

    #[derive(Default)]
    struct FakePrs {
        counts: HashMap<&'static str, u64>,
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PullRequestSource for FakePrs {
        async fn pull_request_count(&self, login: &str) -> u64 {
            self.asked.lock().unwrap().push(login.to_string());
            self.counts.get(login).copied().unwrap_or(0)
        }
    }

    fn registry() -> Vec<Contributor> {
        vec![
            Contributor::new("alice", "Alice A"),
            Contributor::new("bob", "Bob B"),
        ]
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(5, 20), 25.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(20, 20), 100.0);
        assert_eq!(percentage(0, 20), 0.0);
    }

    #[test]
    fn percentage_of_empty_history_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(7, 0), 0.0);
    }

    #[tokio::test]
    async fn aggregates_in_registry_order() {
        let history = FakeHistory {
            total: Some(20),
            by_author: HashMap::from([("alice", 5), ("bob", 15)]),
        };
        let prs = FakePrs {
            counts: HashMap::from([("alice", 2)]),
            ..Default::default()
        };

        let stats = aggregate(&registry(), &history, &prs).await.unwrap();

        assert_eq!(stats.total_commits, 20);
        assert_eq!(
            stats.contributors,
            vec![
                (
                    "alice".to_string(),
                    ContributorStats {
                        commits: 5,
                        pull_requests: 2,
                        percentage: 25.0
                    }
                ),
                (
                    "bob".to_string(),
                    ContributorStats {
                        commits: 15,
                        pull_requests: 0,
                        percentage: 75.0
                    }
                ),
            ]
        );
        assert_eq!(*prs.asked.lock().unwrap(), vec!["alice", "bob"]);
        assert_eq!(stats.get("bob").map(|s| s.commits), Some(15));
        assert!(stats.get("carol").is_none());
    }

    #[tokio::test]
    async fn total_count_failure_aborts_before_any_lookup() {
        let history = FakeHistory {
            total: None,
            by_author: HashMap::from([("alice", 5), ("bob", 15)]),
        };
        let prs = FakePrs::default();

        let err = aggregate(&registry(), &history, &prs).await.unwrap_err();

        assert!(err.to_string().contains("total commits"));
        assert!(prs.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn author_count_failure_aborts_the_run() {
        let history = FakeHistory {
            total: Some(10),
            by_author: HashMap::from([("alice", 5)]),
        };
        let prs = FakePrs::default();

        let err = aggregate(&registry(), &history, &prs).await.unwrap_err();
        assert!(err.to_string().contains("bob"));
    }
}
