//! cli::commands::structure
//!
//! Print the table of contents and the priority summary.
//!
//! # Example
//!
//! ```bash
//! # HTML fragment with chapters and sections only
//! clreq structure --max-toc-level 2
//!
//! # Machine-readable
//! clreq structure --format json
//! ```

use serde::Serialize;

use super::typst;
use crate::cli::{Context, StructureFormat};
use crate::structure::{Structure, SummaryRow, TocItem};
use crate::typst::query_document;
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

#[derive(Serialize)]
struct StructureJson {
    toc: Vec<TocItem>,
    summary: Vec<SummaryRow>,
}

pub fn structure(
    ctx: &Context,
    max_toc_level: Option<usize>,
    format: StructureFormat,
) -> Result<()> {
    let project = ctx.project()?;
    let verbosity = ctx.verbosity();
    let compiler = typst(&project);

    let rt = tokio::runtime::Runtime::new()?;
    let elements = rt
        .block_on(query_document(compiler.as_ref(), &project.paths))
        .context("Failed to query index.typ")?;
    let structure = Structure::analyze(elements)?;

    let findings = structure.findings();
    if !findings.is_empty() {
        bail!(
            "The document structure is inconsistent:\n{}",
            output::format_list(&findings, "  - ")
        );
    }

    let rendered = match format {
        StructureFormat::Html => structure.to_html(max_toc_level),
        StructureFormat::Json => serde_json::to_string_pretty(&StructureJson {
            toc: structure.toc(max_toc_level),
            summary: structure.summary(),
        })?,
    };
    output::result(rendered);
    Ok(())
}
