//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! This module provides a central location for forge selection logic.
//! Commands use `create_forge()` instead of directly constructing
//! transports, so the choice between the `gh` CLI and direct HTTPS stays
//! a configuration detail.
//!
//! # Backends
//!
//! - `gh` (default): shells out to `gh api graphql`, using whatever
//!   account `gh auth login` set up
//! - `http`: posts to the GraphQL endpoint with a token from
//!   `GITHUB_TOKEN` or `GH_TOKEN`
//!
//! # Example
//!
//! ```ignore
//! use clreq_tools::forge::{create_forge, GithubBackend};
//!
//! let forge = create_forge(GithubBackend::Http, "https://api.github.com/graphql")?;
//! let states = forge.fetch_states(&targets).await?;
//! ```

use std::fmt;
use std::str::FromStr;

use super::github::{GhCli, GitHubForge, HttpTransport};
use super::traits::{Forge, ForgeError};

/// Environment variables consulted for a token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// How GitHub is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GithubBackend {
    /// The GitHub CLI
    #[default]
    Gh,
    /// HTTPS with a token
    Http,
}

impl GithubBackend {
    /// Get all backends.
    pub fn all() -> &'static [GithubBackend] {
        &[GithubBackend::Gh, GithubBackend::Http]
    }

    /// Get the backend name as a string.
    ///
    /// This matches the name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            GithubBackend::Gh => "gh",
            GithubBackend::Http => "http",
        }
    }
}

impl FromStr for GithubBackend {
    type Err = String;

    /// Parse a backend name.
    ///
    /// ```
    /// use clreq_tools::forge::GithubBackend;
    ///
    /// assert_eq!("HTTP".parse::<GithubBackend>(), Ok(GithubBackend::Http));
    /// assert!("gitlab".parse::<GithubBackend>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GithubBackend::all()
            .iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                format!(
                    "unknown GitHub backend '{}'. Available backends: {}",
                    s,
                    valid_backend_names().join(", ")
                )
            })
    }
}

impl fmt::Display for GithubBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Get list of valid backend names for configuration validation.
pub fn valid_backend_names() -> Vec<&'static str> {
    GithubBackend::all().iter().map(|b| b.name()).collect()
}

/// First non-empty token among [`TOKEN_ENV_VARS`].
pub fn token_from_env(get: impl Fn(&str) -> Option<String>) -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| get(var))
        .find(|token| !token.trim().is_empty())
}

/// Create a forge for `backend`, reading tokens from the process
/// environment.
///
/// # Errors
///
/// - `ForgeError::AuthRequired` if the `http` backend finds no token
pub fn create_forge(backend: GithubBackend, api_url: &str) -> Result<Box<dyn Forge>, ForgeError> {
    create_forge_with_env(backend, api_url, |var| std::env::var(var).ok())
}

/// [`create_forge`] with an explicit environment lookup.
pub fn create_forge_with_env(
    backend: GithubBackend,
    api_url: &str,
    get: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn Forge>, ForgeError> {
    log::debug!("using GitHub backend '{}'", backend);
    match backend {
        GithubBackend::Gh => Ok(Box::new(GitHubForge::new(GhCli::new()))),
        GithubBackend::Http => {
            let token = token_from_env(get).ok_or(ForgeError::AuthRequired)?;
            Ok(Box::new(GitHubForge::new(HttpTransport::new(api_url, token))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    mod github_backend {
        use super::*;

        #[test]
        fn default_is_gh() {
            assert_eq!(GithubBackend::default(), GithubBackend::Gh);
        }

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!("gh".parse::<GithubBackend>(), Ok(GithubBackend::Gh));
            assert_eq!("Http".parse::<GithubBackend>(), Ok(GithubBackend::Http));
        }

        #[test]
        fn parse_unknown_lists_names() {
            let err = "rest".parse::<GithubBackend>().unwrap_err();
            assert!(err.contains("gh, http"));
        }

        #[test]
        fn display() {
            assert_eq!(GithubBackend::Http.to_string(), "http");
        }
    }

    mod token_from_env {
        use super::*;

        #[test]
        fn prefers_github_token() {
            let get = env(&[("GITHUB_TOKEN", "a"), ("GH_TOKEN", "b")]);
            assert_eq!(token_from_env(get).as_deref(), Some("a"));
        }

        #[test]
        fn skips_blank_values() {
            let get = env(&[("GITHUB_TOKEN", " "), ("GH_TOKEN", "b")]);
            assert_eq!(token_from_env(get).as_deref(), Some("b"));
        }

        #[test]
        fn none_without_vars() {
            assert_eq!(token_from_env(env(&[])), None);
        }
    }

    mod create_forge {
        use super::*;

        #[test]
        fn gh_needs_no_token() {
            let forge = create_forge_with_env(GithubBackend::Gh, "unused", env(&[])).unwrap();
            assert_eq!(forge.name(), "github");
        }

        #[test]
        fn http_requires_token() {
            let result = create_forge_with_env(GithubBackend::Http, "http://x", env(&[]));
            assert!(matches!(result, Err(ForgeError::AuthRequired)));
        }

        #[test]
        fn http_with_token() {
            let get = env(&[("GH_TOKEN", "t")]);
            let forge = create_forge_with_env(GithubBackend::Http, "http://x", get).unwrap();
            assert_eq!(forge.name(), "github");
        }
    }
}
