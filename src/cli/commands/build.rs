//! cli::commands::build
//!
//! Precompile, then compile the deployable page.
//!
//! # Example
//!
//! ```bash
//! # Local build
//! clreq build
//!
//! # Netlify deploy preview
//! NETLIFY=true DEPLOY_URL=https://deploy-preview-1--clreq.netlify.app clreq build
//! ```

use super::typst;
use crate::cli::Context;
use crate::git::BuildInfo;
use crate::typst::{Compiler, Mode, Precompiler};
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Build the site into `dist/`.
pub fn build(ctx: &Context) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();
    let compiler = typst(&project);
    let rt = tokio::runtime::Runtime::new()?;

    let precompiler = Precompiler::new(compiler.clone(), project.paths.clone());
    let report = rt
        .block_on(precompiler.run())
        .context("Precompilation failed")?;
    output::print(report.examples, verbosity);

    let url_base = project.config.build_url_base();
    output::debug(format!("url base: {}", url_base), verbosity);

    let mut args = vec![
        "compile".to_string(),
        "index.typ".to_string(),
        "dist/index.html".to_string(),
    ];
    args.extend(Mode::Build { url_base }.args(&project.paths));
    match BuildInfo::detect(project.paths.root()) {
        Some(info) => {
            output::debug(format!("build info: {}", info.name), verbosity);
            args.extend(info.input_args());
        }
        None => output::debug("no build info available", verbosity),
    }

    std::fs::create_dir_all(project.paths.dist_dir()).context("Failed to create dist/")?;
    rt.block_on(compiler.run(&args, None))
        .context("Failed to compile index.typ")?;

    output::success(
        format!("Built {}", project.paths.index_html().display()),
        verbosity,
    );
    Ok(())
}
