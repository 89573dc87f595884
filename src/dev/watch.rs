//! dev::watch
//!
//! Re-run precompilation whenever a document source changes.
//!
//! # Design
//!
//! A `notify` watcher on the project root forwards raw events into a tokio
//! channel. Events are filtered by [`WatchFilter`], then drained for a
//! short settle period so that an editor writing several files triggers a
//! single run. Runs never overlap: a change arriving mid-run is picked up
//! by the next iteration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::typst::Precompiler;
use crate::ui::output::{self, Verbosity};

/// Files whose changes trigger precompilation, relative to the root.
pub const WATCH_GLOBS: [&str; 3] = ["index.typ", "main.typ", "typ/**/*"];

const SETTLE: Duration = Duration::from_millis(100);

/// Errors from setting up the watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch '{path}': {source}")]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Decides which changed paths matter.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl WatchFilter {
    pub fn new(root: impl Into<PathBuf>, globs: &[&str]) -> Result<Self, WatchError> {
        let patterns = globs
            .iter()
            .map(|g| {
                Pattern::new(g).map_err(|source| WatchError::Pattern {
                    pattern: g.to_string(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            root: root.into(),
            patterns,
        })
    }

    /// The document sources of a project.
    pub fn sources(root: impl Into<PathBuf>) -> Result<Self, WatchError> {
        Self::new(root, &WATCH_GLOBS)
    }

    /// `path` relative to the root, if it matches any pattern.
    pub fn relevant<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        self.patterns
            .iter()
            .any(|p| p.matches_path_with(relative, options))
            .then_some(relative)
    }
}

/// Start watching `root` recursively.
///
/// The returned watcher must be kept alive for events to flow.
pub fn watch_root(
    root: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>), WatchError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let notify_error = |source: notify::Error| WatchError::Notify {
        path: root.to_path_buf(),
        source,
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if !event.kind.is_access() => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("watch error: {}", e),
        }
    })
    .map_err(notify_error)?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(notify_error)?;

    Ok((watcher, rx))
}

/// Wait for the next relevant change, then swallow the burst that follows.
///
/// Returns `None` once the watcher is gone.
pub async fn next_change(
    rx: &mut mpsc::UnboundedReceiver<PathBuf>,
    filter: &WatchFilter,
) -> Option<PathBuf> {
    let changed = loop {
        let path = rx.recv().await?;
        if let Some(relative) = filter.relevant(&path) {
            break relative.to_path_buf();
        }
    };
    while let Ok(Some(_)) = tokio::time::timeout(SETTLE, rx.recv()).await {}
    Some(changed)
}

/// Run `precompiler` once, reporting the outcome.
pub async fn precompile_once(precompiler: &Precompiler, verbosity: Verbosity) -> bool {
    match precompiler.run().await {
        Ok(report) => {
            output::print(report.examples, verbosity);
            true
        }
        Err(e) => {
            output::error(format!("💥 Precompilation failed:\n{}", e));
            false
        }
    }
}

/// Precompile now and again after every relevant change. Failures are
/// reported and the loop goes on.
pub async fn precompile_watch(
    precompiler: &Precompiler,
    root: &Path,
    verbosity: Verbosity,
) -> Result<(), WatchError> {
    // Events carry canonical paths on some platforms.
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let filter = WatchFilter::sources(&root)?;
    let (_watcher, mut rx) = watch_root(&root)?;

    precompile_once(precompiler, verbosity).await;
    while let Some(changed) = next_change(&mut rx, &filter).await {
        output::print(
            format!("Refresh precompilation because of {}", changed.display()),
            verbosity,
        );
        precompile_once(precompiler, verbosity).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> WatchFilter {
        WatchFilter::sources("/project").unwrap()
    }

    #[test]
    fn entry_points_are_relevant() {
        let f = filter();
        assert_eq!(
            f.relevant(Path::new("/project/index.typ")),
            Some(Path::new("index.typ"))
        );
        assert!(f.relevant(Path::new("/project/main.typ")).is_some());
    }

    #[test]
    fn nested_typ_files_are_relevant() {
        let f = filter();
        assert!(f.relevant(Path::new("/project/typ/prioritization.typ")).is_some());
        assert!(f.relevant(Path::new("/project/typ/examples/ruby.typ")).is_some());
    }

    #[test]
    fn outputs_and_other_roots_are_ignored() {
        let f = filter();
        assert!(f.relevant(Path::new("/project/dist/index.html")).is_none());
        assert!(f.relevant(Path::new("/project/target/cache/a.svg")).is_none());
        assert!(f.relevant(Path::new("/project/sub/index.typ")).is_none());
        assert!(f.relevant(Path::new("/elsewhere/index.typ")).is_none());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(
            WatchFilter::new("/p", &["a/***"]),
            Err(WatchError::Pattern { .. })
        ));
    }

    #[tokio::test]
    async fn bursts_collapse_into_one_change() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for p in ["/project/dist/x", "/project/typ/a.typ", "/project/typ/b.typ"] {
            tx.send(PathBuf::from(p)).unwrap();
        }

        let f = filter();
        let first = next_change(&mut rx, &f).await;
        assert_eq!(first, Some(PathBuf::from("typ/a.typ")));

        drop(tx);
        assert_eq!(next_change(&mut rx, &f).await, None);
    }
}
