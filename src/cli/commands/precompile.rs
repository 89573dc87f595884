//! cli::commands::precompile
//!
//! Render examples and the prioritization table, once or on every change.

use super::typst;
use crate::cli::Context;
use crate::dev::watch;
use crate::typst::{Color, Precompiler, Typst};
use crate::ui::output;
use anyhow::{Context as _, Result};
use std::sync::Arc;

/// Run precompilation.
pub fn precompile(ctx: &Context, watch_mode: bool) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();
    let rt = tokio::runtime::Runtime::new()?;

    if watch_mode {
        // Colour survives being forwarded through the watcher's output.
        let compiler = Typst::new(project.config.typst(), project.paths.root())
            .with_color(Color::Always);
        let precompiler = Precompiler::new(Arc::new(compiler), project.paths.clone());
        return rt
            .block_on(watch::precompile_watch(
                &precompiler,
                project.paths.root(),
                verbosity,
            ))
            .context("Precompilation watcher stopped");
    }

    let precompiler = Precompiler::new(typst(&project), project.paths.clone());
    let report = rt
        .block_on(precompiler.run())
        .context("Precompilation failed")?;
    output::print(report.examples, verbosity);
    if !report.table_cached {
        output::debug("rendered the prioritization table", verbosity);
    }
    Ok(())
}
