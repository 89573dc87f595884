//! typst::precompile
//!
//! Renders the artifacts the document embeds but cannot compile itself.
//!
//! # Units
//!
//! - **Examples**: every `<external-example>` in `main.typ` is compiled
//!   from its source to `target/cache/<id>.svg`, all in parallel.
//! - **Prioritization table**: `level-table` from `typ/prioritization.typ`
//!   rendered to SVG, with black recoloured to `currentColor` so the table
//!   follows the page theme.
//!
//! Both units run concurrently. A failing compilation does not cancel the
//! others; every error is collected and reported together.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinSet;

use super::cache::{is_fresh, ArtifactCache, CacheError};
use super::mode::{env_args, Mode};
use super::runner::{Compiler, TypstError};
use crate::core::paths::ProjectPaths;

/// File name of the rendered prioritization table in the cache.
pub const TABLE_ARTIFACT: &str = "prioritization.level-table.svg";

/// Typst source of the prioritization table.
pub const TABLE_SOURCE: &str = "#set page(height: auto, width: auto, margin: 0.5em, fill: none)\n\
                                #import \"/typ/prioritization.typ\": level-table\n\
                                #level-table";

/// Errors from precompilation.
#[derive(Debug, Error)]
pub enum PrecompileError {
    #[error(transparent)]
    Typst(#[from] TypstError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to parse the example list: {0}")]
    Examples(#[source] serde_json::Error),

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("compilation task panicked: {0}")]
    Join(String),

    #[error("{} precompilation units failed:\n{}", .0.len(), list_errors(.0))]
    Several(Vec<PrecompileError>),
}

fn list_errors(errors: &[PrecompileError]) -> String {
    errors
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PrecompileError {
    /// Fold a non-empty list of errors into one.
    fn from_many(mut errors: Vec<PrecompileError>) -> PrecompileError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            PrecompileError::Several(errors)
        }
    }
}

/// One `<external-example>` of the document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Example {
    pub id: String,
    pub content: String,
}

/// Cache statistics of the example unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExampleReport {
    pub total: usize,
    pub cached: usize,
    pub pruned: usize,
}

impl ExampleReport {
    pub fn rendered(&self) -> usize {
        self.total - self.cached
    }
}

impl fmt::Display for ExampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rendered {} examples successfully. ({} cached, {} new)",
            self.total,
            self.cached,
            self.rendered()
        )
    }
}

/// Outcome of a full precompilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecompileReport {
    pub examples: ExampleReport,
    /// Whether the prioritization table was up to date.
    pub table_cached: bool,
}

/// Runs precompilation for one project.
pub struct Precompiler {
    compiler: Arc<dyn Compiler>,
    paths: ProjectPaths,
}

impl Precompiler {
    pub fn new(compiler: Arc<dyn Compiler>, paths: ProjectPaths) -> Self {
        Self { compiler, paths }
    }

    /// Render examples and the prioritization table.
    ///
    /// # Errors
    ///
    /// Returns every failure of either unit; successful artifacts are
    /// kept and cached regardless.
    pub async fn run(&self) -> Result<PrecompileReport, PrecompileError> {
        let cache = ArtifactCache::open(self.paths.cache_dir())?;

        let (examples, table) = tokio::join!(self.render_examples(cache), self.render_table());

        match (examples, table) {
            (Ok(examples), Ok(table_cached)) => Ok(PrecompileReport {
                examples,
                table_cached,
            }),
            (examples, table) => {
                let errors = [examples.err(), table.err()].into_iter().flatten().collect();
                Err(PrecompileError::from_many(errors))
            }
        }
    }

    /// Query the examples the document embeds.
    pub async fn query_examples(&self) -> Result<Vec<Example>, PrecompileError> {
        let mut args = vec![
            "query".to_string(),
            "main.typ".to_string(),
            "<external-example>".to_string(),
            "--field=value".to_string(),
            "--diagnostic-format=short".to_string(),
        ];
        args.extend(Mode::Pre.args(&self.paths));

        let json = self.compiler.run(&args, None).await?;
        serde_json::from_str(&json).map_err(PrecompileError::Examples)
    }

    async fn render_examples(
        &self,
        mut cache: ArtifactCache,
    ) -> Result<ExampleReport, PrecompileError> {
        let examples = self.query_examples().await?;

        let mut report = ExampleReport {
            total: examples.len(),
            ..Default::default()
        };
        let keep: BTreeSet<String> = examples.iter().map(|e| e.id.clone()).collect();

        let mut errors = Vec::new();
        let mut tasks = JoinSet::new();
        for example in examples {
            if cache.is_cached(&example.id, &example.content) {
                report.cached += 1;
                continue;
            }
            let output = match cache.path_for(&example.id) {
                Ok(output) => output,
                Err(e) => {
                    errors.push(PrecompileError::Cache(e));
                    continue;
                }
            };
            let mut args = vec![
                "compile".to_string(),
                "-".to_string(),
                output.display().to_string(),
            ];
            args.extend(env_args(&self.paths));

            let compiler = Arc::clone(&self.compiler);
            tasks.spawn(async move {
                let result = compiler.run(&args, Some(&example.content)).await;
                (example, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((example, Ok(_))) => cache.record(&example.id, &example.content),
                Ok((example, Err(e))) => {
                    log::debug!("example '{}' failed", example.id);
                    errors.push(PrecompileError::Typst(e));
                }
                Err(e) => errors.push(PrecompileError::Join(e.to_string())),
            }
        }

        report.pruned = cache.prune(&keep)?.len();
        cache.save()?;

        if errors.is_empty() {
            Ok(report)
        } else {
            Err(PrecompileError::from_many(errors))
        }
    }

    /// Returns whether the cached table was reused.
    async fn render_table(&self) -> Result<bool, PrecompileError> {
        let output = self.paths.cache_dir().join(TABLE_ARTIFACT);
        if is_fresh(&output, &self.paths.prioritization_typ()) {
            return Ok(true);
        }

        let mut args = vec![
            "compile".to_string(),
            "-".to_string(),
            "-".to_string(),
            "--format=svg".to_string(),
            format!("--root={}", self.paths.root().display()),
        ];
        args.extend(Mode::Pre.args(&self.paths));

        let svg = self.compiler.run(&args, Some(TABLE_SOURCE)).await?;
        write_artifact(&output, &follow_theme(&svg)).await?;
        Ok(false)
    }
}

/// Recolour black fills and strokes to `currentColor`.
pub fn follow_theme(svg: &str) -> String {
    svg.replace(" fill=\"#000000\"", " fill=\"currentColor\"")
        .replace(" stroke=\"#000000\"", " stroke=\"currentColor\"")
}

async fn write_artifact(path: &Path, contents: &str) -> Result<(), PrecompileError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| PrecompileError::Write {
            path: path.display().to_string(),
            source,
        })
}
