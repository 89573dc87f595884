//! core::paths
//!
//! Centralized path routing for the document project.
//!
//! # Layout
//!
//! Everything is resolved against the project root, the directory holding
//! `clreq.toml` or `index.typ`:
//! - `index.typ`, `main.typ` - Document entry points
//! - `typ/` - Document sources
//! - `fonts/` - Fonts passed to the compiler
//! - `public/` - Assets served in dev mode
//! - `dist/` - Build output
//! - `target/cache/` - Precompiled artifacts
//!
//! # Example
//!
//! ```
//! use clreq_tools::core::paths::ProjectPaths;
//! use std::path::PathBuf;
//!
//! let paths = ProjectPaths::new(PathBuf::from("/doc"));
//!
//! assert_eq!(paths.cache_dir(), PathBuf::from("/doc/target/cache"));
//! assert_eq!(paths.index_html(), PathBuf::from("/doc/dist/index.html"));
//! ```

use std::path::{Path, PathBuf};

/// File marking the project root.
pub const PROJECT_CONFIG_FILE: &str = "clreq.toml";

/// Document entry point, also accepted as a root marker.
pub const INDEX_TYP: &str = "index.typ";

/// Centralized path routing for the project.
///
/// No code outside this module should join well-known project paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Walk up from `start` to the first directory containing
    /// `clreq.toml` or `index.typ`.
    pub fn discover(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(PROJECT_CONFIG_FILE).is_file() || dir.join(INDEX_TYP).is_file())
            .map(|dir| Self::new(dir.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_config(&self) -> PathBuf {
        self.root.join(PROJECT_CONFIG_FILE)
    }

    pub fn index_typ(&self) -> PathBuf {
        self.root.join(INDEX_TYP)
    }

    pub fn main_typ(&self) -> PathBuf {
        self.root.join("main.typ")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join("fonts")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    pub fn index_html(&self) -> PathBuf {
        self.dist_dir().join("index.html")
    }

    /// Manifest written by the asset bundler.
    pub fn vite_manifest(&self) -> PathBuf {
        self.dist_dir().join(".vite/manifest.json")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("target/cache")
    }

    /// Source the prioritization table depends on.
    pub fn prioritization_typ(&self) -> PathBuf {
        self.root.join("typ/prioritization.typ")
    }

    pub fn htmldiff_template(&self) -> PathBuf {
        self.root.join("scripts/patch-htmldiff.template.js")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discover_walks_up_to_marker() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.typ"), "").unwrap();
        let nested = temp.path().join("typ/sub");
        fs::create_dir_all(&nested).unwrap();

        let paths = ProjectPaths::discover(&nested).unwrap();
        assert_eq!(paths.root(), temp.path());
    }

    #[test]
    fn discover_prefers_nearest_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.typ"), "").unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("clreq.toml"), "").unwrap();

        let paths = ProjectPaths::discover(&inner).unwrap();
        assert_eq!(paths.root(), inner.as_path());
    }

    #[test]
    fn discover_without_marker() {
        let temp = TempDir::new().unwrap();
        // A marker above the temp dir would be found; only assert on the
        // nearest match not being inside the temp dir.
        if let Some(paths) = ProjectPaths::discover(temp.path()) {
            assert!(!paths.root().starts_with(temp.path()));
        }
    }
}
