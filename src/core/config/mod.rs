//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! clreq has two configuration scopes:
//! - **Global**: User-level settings (GitHub access)
//! - **Project**: `clreq.toml` next to the document
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. Environment (`NETLIFY`, `DEPLOY_URL`, `GITHUB_PAGES_BASE`)
//! 5. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$CLREQ_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/clreq/config.toml`
//! 3. `~/.clreq/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use clreq_tools::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/clreq"))).unwrap();
//! let config = result.config;
//!
//! println!("Compiler: {}", config.typst());
//! println!("Assets: http://localhost:{}/", config.assets_port());
//! println!("URL base: {}", config.build_url_base());
//! ```

pub mod schema;

pub use schema::{GithubConfig, GlobalConfig, ProjectConfig, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::paths::PROJECT_CONFIG_FILE;
use crate::forge::{GithubBackend, WatchTarget};

/// Default GraphQL endpoint for the http backend.
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

pub const DEFAULT_ASSETS_PORT: u16 = 5173;
pub const DEFAULT_PREVIEW_PORT: u16 = 4173;

/// Where the site is served from unless the environment says otherwise.
pub const DEFAULT_URL_BASE: &str = "/clreq/";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules automatically.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if a `clreq.toml` exists)
    pub project: Option<ProjectConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `root` is provided, also loads `<root>/clreq.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(root: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global(&mut warnings)?;

        let (project, project_path) = match root {
            Some(root) => {
                let path = root.join(PROJECT_CONFIG_FILE);
                if path.is_file() {
                    (Some(Self::read_config::<ProjectConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path,
                project_path,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global(
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $CLREQ_CONFIG
        if let Ok(path) = std::env::var("CLREQ_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: "CLREQ_CONFIG points to a missing file, ignoring it".to_string(),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/clreq/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("clreq/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.clreq/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".clreq/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Compiler executable. Defaults to `typst` on `PATH`.
    pub fn typst(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.typst.as_deref())
            .unwrap_or("typst")
    }

    pub fn assets_port(&self) -> u16 {
        self.project
            .as_ref()
            .and_then(|p| p.assets_port)
            .unwrap_or(DEFAULT_ASSETS_PORT)
    }

    pub fn preview_port(&self) -> u16 {
        self.project
            .as_ref()
            .and_then(|p| p.preview_port)
            .unwrap_or(DEFAULT_PREVIEW_PORT)
    }

    /// Path the site is served under, ignoring deploy environments.
    pub fn url_base(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.url_base.as_deref())
            .unwrap_or(DEFAULT_URL_BASE)
    }

    /// URL base of the built site, read from the process environment.
    pub fn build_url_base(&self) -> String {
        self.build_url_base_from(|key| std::env::var(key).ok())
    }

    /// URL base of the built site.
    ///
    /// On Netlify this is the deploy URL, so that assets referenced from
    /// diff views resolve against the deploy rather than the diff service.
    pub fn build_url_base_from(&self, env: impl Fn(&str) -> Option<String>) -> String {
        if env("NETLIFY").as_deref() == Some("true") {
            return format!("{}/", env("DEPLOY_URL").unwrap_or_default());
        }
        if let Some(base) = env("GITHUB_PAGES_BASE") {
            return base;
        }
        self.project
            .as_ref()
            .and_then(|p| p.url_base.clone())
            .unwrap_or_else(|| DEFAULT_URL_BASE.to_string())
    }

    /// Upstream filters for the coverage check.
    ///
    /// Defaults to `typst/typst` labelled `cjk` and `typst/hayagriva`
    /// labelled `i18n`.
    pub fn watch_targets(&self) -> Vec<WatchTarget> {
        match self.project.as_ref().and_then(|p| p.watch.as_ref()) {
            Some(watch) => watch
                .iter()
                .map(|w| WatchTarget::new(&w.repo, w.labels.iter().cloned()))
                .collect(),
            None => vec![
                WatchTarget::new("typst/typst", ["cjk".to_string()]),
                WatchTarget::new("typst/hayagriva", ["i18n".to_string()]),
            ],
        }
    }

    /// How GitHub is reached. Defaults to the `gh` CLI.
    pub fn github_backend(&self) -> GithubBackend {
        self.global
            .github
            .as_ref()
            .and_then(|g| g.backend.as_deref())
            .and_then(|b| b.parse().ok())
            .unwrap_or_default()
    }

    pub fn api_url(&self) -> &str {
        self.global
            .github
            .as_ref()
            .and_then(|g| g.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
