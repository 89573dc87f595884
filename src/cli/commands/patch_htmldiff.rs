//! cli::commands::patch_htmldiff
//!
//! Inject the htmldiff navigation script into the built page.

use crate::cli::Context;
use crate::htmldiff::{patch_htmldiff as patch, PatchOutcome};
use crate::ui::output;
use anyhow::{Context as _, Result};

pub fn patch_htmldiff(ctx: &Context) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();

    let outcome = patch(&project.paths, &project.config.build_url_base())
        .context("Failed to patch dist/index.html for htmldiff")?;
    match outcome {
        PatchOutcome::Patched => output::success(
            format!("Patched {}", project.paths.index_html().display()),
            verbosity,
        ),
        PatchOutcome::AlreadyPatched => output::print(
            format!("{} is already patched", project.paths.index_html().display()),
            verbosity,
        ),
    }
    Ok(())
}
