//! cli::commands::index
//!
//! Print the JSON index of the document.

use super::typst;
use crate::cli::Context;
use crate::index::JsonIndex;
use crate::structure::Structure;
use crate::typst::query_document;
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

/// Print the index to stdout; unlabelled sections go to stderr.
pub fn index(ctx: &Context) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();
    let compiler = typst(&project);

    let rt = tokio::runtime::Runtime::new()?;
    let elements = rt
        .block_on(query_document(compiler.as_ref(), &project.paths))
        .context("Failed to query index.typ")?;
    output::debug(format!("{} elements", elements.len()), verbosity);

    let structure = Structure::analyze(elements)?;
    let findings = structure.findings();
    if !findings.is_empty() {
        bail!(
            "The document structure is inconsistent:\n{}",
            output::format_list(&findings, "  - ")
        );
    }

    let index = JsonIndex::from_tree(&structure.tree);
    output::result(index.to_json()?);
    if let Some(warning) = index.unlabelled_warning() {
        output::warn(warning, verbosity);
    }
    Ok(())
}
