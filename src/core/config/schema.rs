//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$CLREQ_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/clreq/config.toml`
//! 3. `~/.clreq/config.toml`
//!
//! # Project Config
//!
//! Located at `clreq.toml` in the project root.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., watch targets must name `owner/repo`).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::forge::GithubBackend;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [github]
/// backend = "http"
/// api_url = "https://api.github.com/graphql"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// GitHub access settings
    pub github: Option<GithubConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(github) = &self.github {
            github.validate()?;
        }
        Ok(())
    }
}

/// GitHub access settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    /// "gh" (the GitHub CLI) or "http" (direct, token from the environment)
    pub backend: Option<String>,

    /// GraphQL endpoint for the http backend
    pub api_url: Option<String>,
}

impl GithubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(backend) = &self.backend {
            backend
                .parse::<GithubBackend>()
                .map_err(ConfigError::InvalidValue)?;
        }

        if let Some(url) = &self.api_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid api_url '{}', must be an http(s) URL",
                    url
                )));
            }
        }

        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// typst = "/opt/typst/bin/typst"
/// assets_port = 5173
/// preview_port = 4173
/// url_base = "/clreq/"
///
/// [[watch]]
/// repo = "typst/typst"
/// labels = ["cjk"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Compiler executable
    pub typst: Option<String>,

    /// Port of the dev asset server
    pub assets_port: Option<u16>,

    /// Port of the preview server
    pub preview_port: Option<u16>,

    /// URL base of the deployed site
    pub url_base: Option<String>,

    /// Upstream issues the document should cover
    pub watch: Option<Vec<WatchConfig>>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(typst) = &self.typst {
            if typst.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "typst cannot be empty".to_string(),
                ));
            }
        }

        for (name, port) in [
            ("assets_port", self.assets_port),
            ("preview_port", self.preview_port),
        ] {
            if port == Some(0) {
                return Err(ConfigError::InvalidValue(format!("{} cannot be 0", name)));
            }
        }

        if let Some(base) = &self.url_base {
            if !base.ends_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid url_base '{}', must end with '/'",
                    base
                )));
            }
        }

        for watch in self.watch.iter().flatten() {
            watch.validate()?;
        }

        Ok(())
    }
}

/// A `(repo, labels)` filter for the coverage check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// `owner/name`
    pub repo: String,

    /// Issues must carry all of these labels
    pub labels: Vec<String>,
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid watch repo '{}', expected owner/name",
                    self.repo
                )))
            }
        }

        if self.labels.is_empty() || self.labels.iter().any(|l| l.is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "watch target '{}' needs at least one non-empty label",
                self.repo
            )));
        }

        Ok(())
    }
}
