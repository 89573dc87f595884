//! cli::commands::preview
//!
//! Serve the built site the way it is deployed.

use crate::cli::Context;
use crate::dev;
use anyhow::{bail, Context as _, Result};

/// Serve `dist/` under the deployment base.
pub fn preview(ctx: &Context, open: bool) -> Result<()> {
    let project = ctx.project()?;
    if !project.paths.index_html().is_file() {
        bail!(
            "'{}' does not exist. Run `clreq build` first.",
            project.paths.index_html().display()
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dev::run_preview(
        &project.paths,
        project.config.preview_port(),
        project.config.url_base(),
        open,
        ctx.verbosity(),
    ))
    .context("Preview server stopped")
}
