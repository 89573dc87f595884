//! cli::commands::check_issues
//!
//! Reconcile cited issues and pull requests with GitHub.
//!
//! # Example
//!
//! ```bash
//! clreq check-issues
//! clreq check-issues --assert-all-covered
//! ```

use super::typst;
use crate::cli::Context;
use crate::forge::create_forge;
use crate::reconcile::{reconcile, Citations};
use crate::typst::query_citations;
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

pub fn check_issues(ctx: &Context, assert_all_covered: bool) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();
    let compiler = typst(&project);
    let forge = create_forge(project.config.github_backend(), project.config.api_url())?;
    output::debug(format!("forge: {}", forge.name()), verbosity);

    let watches = project.config.watch_targets();
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let (issues, pulls) = query_citations(compiler.as_ref(), &project.paths)
            .await
            .context("Failed to query citations in main.typ")?;
        output::debug(
            format!("{} issues, {} pull requests cited", issues.len(), pulls.len()),
            verbosity,
        );

        let citations = Citations { issues, pulls };
        let watches = assert_all_covered.then_some(watches.as_slice());
        reconcile(forge.as_ref(), &citations, watches)
            .await
            .context("Failed to fetch upstream states")
    })?;

    output::print(&report, verbosity);
    if !report.succeeded() {
        bail!(
            "{} problem(s) found in cited issues and pull requests",
            report.findings().count()
        );
    }
    Ok(())
}
