//! typst
//!
//! Orchestration of the external typst compiler.
//!
//! # Modules
//!
//! - [`runner`] - Subprocess runner and the [`Compiler`] seam
//! - [`mode`] - `--input` arguments per compilation mode
//! - [`cache`] - Artifact cache under `target/cache`
//! - [`precompile`] - Example and prioritization-table rendering
//!
//! # Design
//!
//! The compiler is an opaque collaborator: every interaction is a
//! `typst <subcommand>` invocation whose stdout is the result. Everything
//! here goes through [`Compiler`] so it can be exercised without a typst
//! installation.

pub mod cache;
pub mod mode;
pub mod precompile;
pub mod runner;

pub use cache::{ArtifactCache, CacheError};
pub use mode::Mode;
pub use precompile::{PrecompileError, PrecompileReport, Precompiler};
pub use runner::{Color, Compiler, Typst, TypstError};

use serde::de::DeserializeOwned;

use crate::core::paths::ProjectPaths;
use crate::document::{parse_elements, Element, IssueMeta, PullMeta, QueryError};
use crate::index::INDEX_SELECTOR;

/// Errors from querying the document structure.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Typst(#[from] TypstError),

    #[error("unexpected query result: {0}")]
    Query(#[from] QueryError),
}

/// Query `index.typ` for headings and metadata between the outline and the
/// addendum.
pub async fn query_document(
    compiler: &dyn Compiler,
    paths: &ProjectPaths,
) -> Result<Vec<Element>, DocumentError> {
    let mut args = vec![
        "query".to_string(),
        "index.typ".to_string(),
        INDEX_SELECTOR.to_string(),
        "--target=html".to_string(),
    ];
    args.extend(Mode::Pre.args(paths));

    let json = compiler.run(&args, None).await?;
    Ok(parse_elements(&json)?)
}

/// Query the `value` of every element labelled `label` in `main.typ`.
pub async fn query_labelled<T: DeserializeOwned>(
    compiler: &dyn Compiler,
    paths: &ProjectPaths,
    label: &str,
) -> Result<Vec<T>, DocumentError> {
    let mut args = vec![
        "query".to_string(),
        "main.typ".to_string(),
        format!("<{}>", label),
        "--field=value".to_string(),
    ];
    args.extend(Mode::Pre.args(paths));

    let json = compiler.run(&args, None).await?;
    serde_json::from_str(&json).map_err(|e| DocumentError::Query(QueryError::Json(e)))
}

/// Issues and pull requests cited anywhere in the document.
pub async fn query_citations(
    compiler: &dyn Compiler,
    paths: &ProjectPaths,
) -> Result<(Vec<IssueMeta>, Vec<PullMeta>), DocumentError> {
    let (issues, pulls) = tokio::join!(
        query_labelled::<IssueMeta>(compiler, paths, "issue"),
        query_labelled::<PullMeta>(compiler, paths, "pull"),
    );
    Ok((issues?, pulls?))
}
