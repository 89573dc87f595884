//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Locates the project and reads its configuration
//! 2. Calls into the library modules
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that run typst or talk to GitHub are async. Each handler
//! builds a `tokio::runtime::Runtime` and blocks on its async body, so
//! dispatch itself stays synchronous.

mod build;
mod check_issues;
mod completion;
mod dev;
mod index;
mod patch_htmldiff;
mod precompile;
mod preview;
mod structure;

use std::sync::Arc;

use super::args::Command;
use super::{Context, Project};
use crate::typst::{Color, Typst};
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Build => build::build(ctx),
        Command::Precompile { watch } => precompile::precompile(ctx, watch),
        Command::Dev { typst_args } => dev::dev(ctx, typst_args),
        Command::Preview { open } => preview::preview(ctx, open),
        Command::Index => index::index(ctx),
        Command::Structure {
            max_toc_level,
            format,
        } => structure::structure(ctx, max_toc_level, format),
        Command::CheckIssues { assert_all_covered } => {
            check_issues::check_issues(ctx, assert_all_covered)
        }
        Command::PatchHtmldiff => patch_htmldiff::patch_htmldiff(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// The typst compiler configured for `project`.
fn typst(project: &Project) -> Arc<Typst> {
    Arc::new(Typst::new(project.config.typst(), project.paths.root()).with_color(Color::Auto))
}
