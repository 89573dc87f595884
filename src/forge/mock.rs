//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides a deterministic implementation of the `Forge` trait
//! for use in tests. It stores issue and pull request states in memory and
//! allows configuring failure scenarios.
//!
//! # Example
//!
//! ```
//! use clreq_tools::core::types::CitationKey;
//! use clreq_tools::forge::mock::MockForge;
//! use clreq_tools::forge::{CitationTargets, Forge};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_open_issue("typst/typst", 193, "CJK line breaking", &["cjk"]);
//!
//! let key = CitationKey::new("typst/typst", "193").unwrap();
//! let mut targets = CitationTargets::default();
//! targets.issues.insert(key.clone());
//!
//! let states = forge.fetch_states(&targets).await.unwrap();
//! assert!(!states.issues[&key].closed);
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{
    CitationTargets, Forge, ForgeError, IssueState, LatestIssue, PullState, UpstreamStates,
    WatchTarget,
};
use crate::core::types::CitationKey;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    issues: BTreeMap<CitationKey, MockIssue>,
    pulls: BTreeMap<CitationKey, PullState>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockIssue {
    state: IssueState,
    labels: Vec<String>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail fetch_states with the given error.
    FetchStates(ForgeError),
    /// Fail latest_open_issues with the given error.
    LatestOpenIssues(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FetchStates { issues: usize, pulls: usize },
    LatestOpenIssues { repos: Vec<String> },
}

fn key(repo: &str, number: u64) -> CitationKey {
    CitationKey {
        repo: repo.to_string(),
        number,
    }
}

/// Fixed timestamp for closed entries.
fn closed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        // A panicking test thread must not hide the state from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an issue with an explicit state.
    pub fn with_issue(self, repo: &str, number: u64, state: IssueState) -> Self {
        self.lock().issues.insert(
            key(repo, number),
            MockIssue {
                state,
                labels: Vec::new(),
            },
        );
        self
    }

    /// Add an open issue carrying `labels`.
    pub fn with_open_issue(self, repo: &str, number: u64, title: &str, labels: &[&str]) -> Self {
        self.lock().issues.insert(
            key(repo, number),
            MockIssue {
                state: IssueState {
                    title: title.to_string(),
                    state: "OPEN".to_string(),
                    state_reason: None,
                    closed: false,
                    closed_at: None,
                },
                labels: labels.iter().map(|l| l.to_string()).collect(),
            },
        );
        self
    }

    /// Add a closed issue.
    pub fn with_closed_issue(self, repo: &str, number: u64, title: &str, reason: &str) -> Self {
        self.with_issue(
            repo,
            number,
            IssueState {
                title: title.to_string(),
                state: "CLOSED".to_string(),
                state_reason: Some(reason.to_string()),
                closed: true,
                closed_at: Some(closed_at()),
            },
        )
    }

    /// Add a pull request with the given outcome.
    pub fn with_pull(self, repo: &str, number: u64, title: &str, merged: bool, closed: bool) -> Self {
        let state = if merged {
            "MERGED"
        } else if closed {
            "CLOSED"
        } else {
            "OPEN"
        };
        self.lock().pulls.insert(
            key(repo, number),
            PullState {
                title: title.to_string(),
                state: state.to_string(),
                merged,
                closed: closed || merged,
                closed_at: (closed || merged).then(closed_at),
            },
        );
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use clreq_tools::forge::mock::{MockForge, FailOn};
    /// use clreq_tools::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::FetchStates(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Get all recorded operations.
    ///
    /// Useful for verifying the mock was called correctly.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Option<ForgeError> {
        match &self.lock().fail_on {
            Some(FailOn::FetchStates(e)) if expected == "fetch_states" => Some(e.clone()),
            Some(FailOn::LatestOpenIssues(e)) if expected == "latest_open_issues" => {
                Some(e.clone())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_states(&self, targets: &CitationTargets) -> Result<UpstreamStates, ForgeError> {
        self.record(MockOperation::FetchStates {
            issues: targets.issues.len(),
            pulls: targets.pulls.len(),
        });

        if let Some(err) = self.check_fail("fetch_states") {
            return Err(err);
        }

        let inner = self.lock();
        Ok(UpstreamStates {
            issues: targets
                .issues
                .iter()
                .filter_map(|k| inner.issues.get(k).map(|i| (k.clone(), i.state.clone())))
                .collect(),
            pulls: targets
                .pulls
                .iter()
                .filter_map(|k| inner.pulls.get(k).map(|p| (k.clone(), p.clone())))
                .collect(),
        })
    }

    async fn latest_open_issues(
        &self,
        watches: &[WatchTarget],
    ) -> Result<Vec<LatestIssue>, ForgeError> {
        self.record(MockOperation::LatestOpenIssues {
            repos: watches.iter().map(|w| w.repo.clone()).collect(),
        });

        if let Some(err) = self.check_fail("latest_open_issues") {
            return Err(err);
        }

        let inner = self.lock();
        let mut latest = Vec::new();
        for watch in watches {
            latest.extend(
                inner
                    .issues
                    .iter()
                    .filter(|(k, i)| {
                        k.repo == watch.repo
                            && !i.state.closed
                            && i.labels.iter().any(|l| watch.labels.contains(l))
                    })
                    .map(|(k, i)| LatestIssue {
                        key: k.clone(),
                        title: i.state.title.clone(),
                        state_reason: i.state.state_reason.clone(),
                    })
                    .take(super::github::LATEST_ISSUES_LIMIT),
            );
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn targets(issues: &[(&str, u64)], pulls: &[(&str, u64)]) -> CitationTargets {
        CitationTargets {
            issues: issues.iter().map(|(r, n)| key(r, *n)).collect(),
            pulls: pulls.iter().map(|(r, n)| key(r, *n)).collect(),
        }
    }

    #[tokio::test]
    async fn unknown_targets_are_absent() {
        let forge = MockForge::new().with_open_issue("typst/typst", 1, "one", &[]);
        let states = forge
            .fetch_states(&targets(&[("typst/typst", 1), ("typst/typst", 2)], &[]))
            .await
            .unwrap();
        assert_eq!(
            states.issues.keys().cloned().collect::<BTreeSet<_>>(),
            BTreeSet::from([key("typst/typst", 1)])
        );
    }

    #[tokio::test]
    async fn merged_pull_is_closed() {
        let forge = MockForge::new().with_pull("typst/typst", 9, "p", true, false);
        let states = forge
            .fetch_states(&targets(&[], &[("typst/typst", 9)]))
            .await
            .unwrap();
        let pull = &states.pulls[&key("typst/typst", 9)];
        assert!(pull.merged && pull.closed && !pull.rejected());
    }

    #[tokio::test]
    async fn latest_filters_by_label_and_state() {
        let forge = MockForge::new()
            .with_open_issue("typst/typst", 1, "cjk", &["cjk"])
            .with_open_issue("typst/typst", 2, "other", &["bug"])
            .with_closed_issue("typst/typst", 3, "done", "COMPLETED");
        let watches = [WatchTarget::new("typst/typst", ["cjk".to_string()])];

        let latest = forge.latest_open_issues(&watches).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].key, key("typst/typst", 1));
    }

    #[tokio::test]
    async fn fail_on_and_operations() {
        let forge = MockForge::new().fail_on(FailOn::FetchStates(ForgeError::RateLimited));
        let result = forge.fetch_states(&targets(&[("a/b", 1)], &[])).await;
        assert!(matches!(result, Err(ForgeError::RateLimited)));

        forge.clear_fail_on();
        forge.fetch_states(&targets(&[], &[])).await.unwrap();
        assert_eq!(
            forge.operations(),
            [
                MockOperation::FetchStates { issues: 1, pulls: 0 },
                MockOperation::FetchStates { issues: 0, pulls: 0 },
            ]
        );
    }
}
