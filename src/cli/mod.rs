//! cli
//!
//! Command-line interface layer for clreq.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Locate the project and load its configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers in [`commands`], which call into the library modules and format
//! their results. Errors surface as `anyhow::Error` with context.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell, StructureFormat};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::paths::ProjectPaths;
use crate::ui::output::{self, Verbosity};

/// Global settings for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

/// A located project with its configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub paths: ProjectPaths,
    pub config: Config,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Directory the command runs from.
    pub fn working_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().context("Failed to read the current directory"),
        }
    }

    /// Find the project root and load configuration, printing config
    /// warnings.
    pub fn project(&self) -> Result<Project> {
        let start = self.working_dir()?;
        let paths = ProjectPaths::discover(&start).with_context(|| {
            format!(
                "No clreq project found in '{}' or its parents (looked for clreq.toml or index.typ)",
                start.display()
            )
        })?;
        log::debug!("project root: {}", paths.root().display());

        let loaded = Config::load(Some(paths.root())).context("Failed to load configuration")?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                self.verbosity(),
            );
        }

        Ok(Project {
            paths,
            config: loaded.config,
        })
    }
}

/// Run the CLI application with already parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };
    commands::dispatch(cli.command, &ctx)
}
