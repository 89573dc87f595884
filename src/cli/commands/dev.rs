//! cli::commands::dev
//!
//! Run the development session: precompile-watch, the asset server and
//! `typst watch`, side by side.

use crate::cli::Context;
use crate::dev::{self, DevOptions};
use anyhow::{Context as _, Result};

/// Start developing.
pub fn dev(ctx: &Context, typst_args: Vec<String>) -> Result<()> {
    let project = ctx.project()?;
    let options = DevOptions {
        typst: project.config.typst().to_string(),
        assets_port: project.config.assets_port(),
        typst_args,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dev::run_dev(&project.paths, &options, ctx.verbosity()))
        .context("Development session ended")
}
