//! forge::github
//!
//! GitHub forge implementation over the GraphQL API.
//!
//! # Design
//!
//! Every operation is a single GraphQL query assembled from aliased
//! fields. Repositories become top-level aliases (`typst/hayagriva` →
//! `typst_hayagriva`) and each citation becomes `issue_<n>` or `pull_<n>`
//! inside its repository, so the response is decoded by looking names up
//! rather than by position.
//!
//! The query is sent through a [`GraphqlTransport`]:
//! - [`GhCli`] runs `gh api graphql`, reusing the user's `gh` login
//! - [`HttpTransport`] posts to the API with a bearer token
//!
//! # Partial results
//!
//! GitHub answers a query mentioning an unknown issue with `null` for that
//! field plus an entry in `errors`. Such responses are accepted: the
//! missing entry is simply absent from the result. Only a response without
//! `data` is an error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::traits::{
    CitationTargets, Forge, ForgeError, IssueState, LatestIssue, PullState, UpstreamStates,
    WatchTarget,
};
use crate::core::types::CitationKey;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "clreq-tools";

/// How many recently updated issues are fetched per watched repository.
pub const LATEST_ISSUES_LIMIT: usize = 30;

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse {
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error format.
#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

impl GraphQLResponse {
    /// The `data` member, tolerating field-level errors.
    pub fn into_data(self) -> Result<Value, ForgeError> {
        let errors = self.errors.unwrap_or_default();
        match self.data {
            Some(data) if !data.is_null() => {
                for error in &errors {
                    log::debug!("GraphQL field error: {}", error.message);
                }
                Ok(data)
            }
            _ => Err(ForgeError::ApiError {
                status: 200,
                message: errors
                    .into_iter()
                    .map(|e| e.message)
                    .next()
                    .unwrap_or_else(|| "response has no data".to_string()),
            }),
        }
    }
}

/// Sends a GraphQL query and returns the decoded response.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, query: &str) -> Result<GraphQLResponse, ForgeError>;
}

/// Transport through the GitHub CLI.
#[derive(Debug, Clone)]
pub struct GhCli {
    bin: String,
}

impl GhCli {
    pub fn new() -> Self {
        Self {
            bin: "gh".to_string(),
        }
    }

    /// Use a different `gh` executable.
    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphqlTransport for GhCli {
    async fn execute(&self, query: &str) -> Result<GraphQLResponse, ForgeError> {
        let output = tokio::process::Command::new(&self.bin)
            .args(["api", "graphql", "--raw-field"])
            .arg(format!("query={}", query))
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ForgeError::Cli(format!(
                        "'{}' not found; install it from https://cli.github.com",
                        self.bin
                    ))
                } else {
                    ForgeError::Cli(e.to_string())
                }
            })?;

        // gh exits non-zero on GraphQL errors but still prints the body.
        match serde_json::from_slice::<GraphQLResponse>(&output.stdout) {
            Ok(response) if output.status.success() || response.data.is_some() => Ok(response),
            Ok(response) => Err(response
                .into_data()
                .err()
                .unwrap_or_else(|| ForgeError::Cli("empty response".to_string()))),
            Err(_) if !output.status.success() => Err(ForgeError::Cli(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Err(e) => Err(ForgeError::InvalidResponse(e.to_string())),
        }
    }
}

/// Transport over HTTPS with a personal access token.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    token: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(response: Response) -> Result<T, ForgeError> {
        let status = response.status();
        let exhausted = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        #[derive(Deserialize)]
        struct GitHubErrorResponse {
            message: String,
        }
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn execute(&self, query: &str) -> Result<GraphQLResponse, ForgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse GraphQL response: {}", e),
            })
        } else {
            Self::handle_error_response(response).await
        }
    }
}

/// GitHub forge implementation.
pub struct GitHubForge {
    transport: Box<dyn GraphqlTransport>,
}

impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge").finish_non_exhaustive()
    }
}

impl GitHubForge {
    pub fn new(transport: impl GraphqlTransport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    async fn query(&self, query: &str) -> Result<Value, ForgeError> {
        log::debug!("GraphQL query:\n{}", query);
        self.transport.execute(query).await?.into_data()
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_states(&self, targets: &CitationTargets) -> Result<UpstreamStates, ForgeError> {
        if targets.is_empty() {
            return Ok(UpstreamStates::default());
        }
        let (query, aliases) = states_query(targets);
        let data = self.query(&query).await?;
        parse_states(&data, &aliases)
    }

    async fn latest_open_issues(
        &self,
        watches: &[WatchTarget],
    ) -> Result<Vec<LatestIssue>, ForgeError> {
        if watches.is_empty() {
            return Ok(Vec::new());
        }
        let (query, aliases) = latest_issues_query(watches);
        let data = self.query(&query).await?;
        parse_latest_issues(&data, &aliases)
    }
}

/// GraphQL alias for a repository: characters other than ASCII
/// alphanumerics and `_` become `_`.
///
/// ```
/// use clreq_tools::forge::github::repo_alias;
///
/// assert_eq!(repo_alias("typst/typst"), "typst_typst");
/// assert_eq!(repo_alias("typst/typst-assets"), "typst_typst_assets");
/// ```
pub fn repo_alias(repo: &str) -> String {
    let alias: String = repo
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if alias.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", alias)
    } else {
        alias
    }
}

/// Assigns distinct aliases, suffixing `_<n>` when two names sanitize alike.
#[derive(Debug)]
pub struct AliasTable<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for AliasTable<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> AliasTable<T> {
    fn insert(&mut self, base: String, value: T) -> String {
        let mut alias = base.clone();
        let mut n = 1;
        while self.entries.contains_key(&alias) {
            n += 1;
            alias = format!("{}_{}", base, n);
        }
        self.entries.insert(alias.clone(), value);
        alias
    }

    pub fn get(&self, alias: &str) -> Option<&T> {
        self.entries.get(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }
}

fn owner_and_name(repo: &str) -> (&str, &str) {
    repo.split_once('/').unwrap_or((repo, ""))
}

/// Build the state query. Returns the query and the repository of each
/// top-level alias.
pub fn states_query(targets: &CitationTargets) -> (String, AliasTable<String>) {
    let mut aliases = AliasTable::default();
    let mut lines = vec!["query {".to_string()];

    for repo in targets.repos() {
        let alias = aliases.insert(repo_alias(repo), repo.to_string());
        let (owner, name) = owner_and_name(repo);
        lines.push(format!(
            "  {}: repository(owner: {}, name: {}) {{",
            alias,
            Value::from(owner),
            Value::from(name)
        ));
        for key in targets.issues.iter().filter(|k| k.repo == repo) {
            lines.push(format!(
                "    issue_{n}: issue(number: {n}) {{ title state stateReason closed closedAt }}",
                n = key.number
            ));
        }
        for key in targets.pulls.iter().filter(|k| k.repo == repo) {
            lines.push(format!(
                "    pull_{n}: pullRequest(number: {n}) {{ title state merged closed closedAt }}",
                n = key.number
            ));
        }
        lines.push("  }".to_string());
    }

    lines.push("}".to_string());
    (lines.join("\n"), aliases)
}

/// Decode a state query response into keyed maps.
pub fn parse_states(data: &Value, aliases: &AliasTable<String>) -> Result<UpstreamStates, ForgeError> {
    let mut states = UpstreamStates::default();

    for (alias, repo) in aliases.iter() {
        let Some(fields) = data.get(alias).and_then(Value::as_object) else {
            log::debug!("repository {} missing from response", repo);
            continue;
        };
        for (field, value) in fields {
            if value.is_null() {
                continue;
            }
            let invalid = |e: serde_json::Error| {
                ForgeError::InvalidResponse(format!("{}.{}: {}", alias, field, e))
            };
            if let Some(number) = field.strip_prefix("issue_").and_then(|n| n.parse().ok()) {
                let state: IssueState = serde_json::from_value(value.clone()).map_err(invalid)?;
                states.issues.insert(key(repo, number), state);
            } else if let Some(number) = field.strip_prefix("pull_").and_then(|n| n.parse().ok()) {
                let state: PullState = serde_json::from_value(value.clone()).map_err(invalid)?;
                states.pulls.insert(key(repo, number), state);
            }
        }
    }

    Ok(states)
}

fn key(repo: &str, number: u64) -> CitationKey {
    CitationKey {
        repo: repo.to_string(),
        number,
    }
}

/// Build the latest-issues query. Returns the query and the watch target
/// behind each alias.
pub fn latest_issues_query(watches: &[WatchTarget]) -> (String, AliasTable<WatchTarget>) {
    let mut aliases = AliasTable::default();
    let mut lines = vec!["query {".to_string()];

    for watch in watches {
        let alias = aliases.insert(repo_alias(&watch.repo), watch.clone());
        let (owner, name) = owner_and_name(&watch.repo);
        lines.push(format!(
            "  {}: repository(owner: {}, name: {}) {{",
            alias,
            Value::from(owner),
            Value::from(name)
        ));
        lines.push(format!(
            "    issues(labels: {}, first: {}, states: [OPEN], orderBy: {{ direction: DESC, field: UPDATED_AT }}) {{",
            Value::from(watch.labels.clone()),
            LATEST_ISSUES_LIMIT
        ));
        lines.push("      nodes { number title stateReason }".to_string());
        lines.push("    }".to_string());
        lines.push("  }".to_string());
    }

    lines.push("}".to_string());
    (lines.join("\n"), aliases)
}

#[derive(Deserialize)]
struct IssueConnection {
    nodes: Vec<IssueNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    number: u64,
    title: String,
    state_reason: Option<String>,
}

/// Decode a latest-issues response.
pub fn parse_latest_issues(
    data: &Value,
    aliases: &AliasTable<WatchTarget>,
) -> Result<Vec<LatestIssue>, ForgeError> {
    let mut latest = Vec::new();

    for (alias, watch) in aliases.iter() {
        let Some(issues) = data.get(alias).and_then(|repo| repo.get("issues")) else {
            return Err(ForgeError::NotFound(format!("repository {}", watch.repo)));
        };
        let connection: IssueConnection = serde_json::from_value(issues.clone())
            .map_err(|e| ForgeError::InvalidResponse(format!("{}.issues: {}", alias, e)))?;
        latest.extend(connection.nodes.into_iter().map(|node| LatestIssue {
            key: key(&watch.repo, node.number),
            title: node.title,
            state_reason: node.state_reason,
        }));
    }

    Ok(latest)
}
