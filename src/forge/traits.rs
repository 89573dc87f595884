//! forge::traits
//!
//! Forge trait definition for reading upstream issue and pull request state.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! It is read-only: the document is never written back to the forge.
//!
//! Results are keyed by [`CitationKey`], so callers match upstream state
//! to citations by identity rather than by response order. A citation
//! absent from [`UpstreamStates`] means the forge did not return it.
//!
//! # Example
//!
//! ```ignore
//! use clreq_tools::forge::{CitationTargets, Forge};
//!
//! async fn closed_issues(forge: &dyn Forge, targets: &CitationTargets) -> Result<usize, ForgeError> {
//!     let states = forge.fetch_states(targets).await?;
//!     Ok(states.issues.values().filter(|s| s.closed).count())
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::core::types::CitationKey;

/// Errors from forge operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required: set GITHUB_TOKEN or GH_TOKEN, or use the gh backend")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The `gh` command could not be run or failed.
    #[error("gh failed: {0}")]
    Cli(String),

    /// The response did not have the requested shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// A repository watched for new issues, filtered by labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// `owner/name`
    pub repo: String,
    /// An issue matches when it carries any of these labels.
    pub labels: Vec<String>,
}

impl WatchTarget {
    pub fn new(repo: &str, labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            repo: repo.to_string(),
            labels: labels.into_iter().collect(),
        }
    }
}

/// GitHub's own rendering, e.g. `2024-01-01T00:00:00Z`.
fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "unknown time".to_string())
}

/// Live state of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueState {
    pub title: String,
    /// `OPEN` or `CLOSED`
    pub state: String,
    /// e.g. `COMPLETED`, `NOT_PLANNED`, `REOPENED`
    pub state_reason: Option<String>,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueState {
    /// `closed at <time> for <reason>`, or `open` with the reason if any.
    pub fn human(&self) -> String {
        if self.closed {
            format!(
                "closed at {} for {}",
                timestamp(self.closed_at),
                self.state_reason.as_deref().unwrap_or("unknown reason")
            )
        } else {
            match &self.state_reason {
                Some(reason) => format!("open for {}", reason),
                None => "open".to_string(),
            }
        }
    }
}

/// Live state of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullState {
    pub title: String,
    /// `OPEN`, `CLOSED` or `MERGED`
    pub state: String,
    pub merged: bool,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PullState {
    /// Closed without being merged.
    pub fn rejected(&self) -> bool {
        self.closed && !self.merged
    }

    pub fn human(&self) -> String {
        if self.merged {
            format!(
                "merged at {}",
                timestamp(self.closed_at)
            )
        } else if self.closed {
            format!(
                "closed at {} without merging",
                timestamp(self.closed_at)
            )
        } else {
            "open".to_string()
        }
    }
}

/// An open issue recently updated in a watched repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestIssue {
    pub key: CitationKey,
    pub title: String,
    pub state_reason: Option<String>,
}

/// Issues and pull requests whose state should be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationTargets {
    pub issues: BTreeSet<CitationKey>,
    pub pulls: BTreeSet<CitationKey>,
}

impl CitationTargets {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.pulls.is_empty()
    }

    /// Repositories mentioned by any target, each once, in order.
    pub fn repos(&self) -> BTreeSet<&str> {
        self.issues
            .iter()
            .chain(&self.pulls)
            .map(|key| key.repo.as_str())
            .collect()
    }
}

/// Upstream state of the requested targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamStates {
    pub issues: BTreeMap<CitationKey, IssueState>,
    pub pulls: BTreeMap<CitationKey, PullState>,
}

/// A remote hosting service holding the cited issues and pull requests.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Fetch the state of every target in one round trip.
    ///
    /// Targets the forge does not know are left out of the result rather
    /// than failing the whole request.
    async fn fetch_states(&self, targets: &CitationTargets) -> Result<UpstreamStates, ForgeError>;

    /// Open issues of each watched repository carrying one of its labels,
    /// most recently updated first.
    async fn latest_open_issues(
        &self,
        watches: &[WatchTarget],
    ) -> Result<Vec<LatestIssue>, ForgeError>;
}
