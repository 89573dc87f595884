//! typst::cache
//!
//! Artifact cache under `target/cache`.
//!
//! # Invalidation
//!
//! Two rules, one per kind of artifact:
//! - **Keyed artifacts** (rendered examples): `<key>.svg` is valid while
//!   the SHA-256 of its source matches the digest recorded in
//!   `manifest.json`. Sources that are no longer requested are pruned.
//! - **Derived artifacts** (the prioritization table): valid while the
//!   file is newer than the source it depends on.
//!
//! The cache is advisory: there is no locking, and concurrent runs of the
//! tool may race.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const MANIFEST_FILE: &str = "manifest.json";

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid cache key '{0}'")]
    InvalidKey(String),

    #[error("corrupt cache manifest '{path}': {message}")]
    Manifest { path: PathBuf, message: String },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Digest of an artifact's source.
pub fn content_digest(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// The artifact cache directory.
#[derive(Debug)]
pub struct ArtifactCache {
    dir: PathBuf,
    manifest: Manifest,
}

impl ArtifactCache {
    /// Open (creating if needed) the cache at `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the manifest is corrupt.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match fs::read_to_string(&manifest_path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| CacheError::Manifest {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => return Err(io_error(&manifest_path)(e)),
        };

        Ok(Self { dir, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact stored under `key`.
    ///
    /// # Errors
    ///
    /// Keys must be plain file stems: no separators, no `..`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && !key.contains(['/', '\\'])
            && key != "."
            && key != ".."
            && !key.starts_with('.');
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.svg", key)))
    }

    /// Whether `key` holds an artifact built from exactly `source`.
    pub fn is_cached(&self, key: &str, source: &str) -> bool {
        let Ok(path) = self.path_for(key) else {
            return false;
        };
        path.is_file()
            && self.manifest.entries.get(key).map(String::as_str) == Some(&content_digest(source))
    }

    /// Record that `key` now holds an artifact built from `source`.
    pub fn record(&mut self, key: &str, source: &str) {
        self.manifest
            .entries
            .insert(key.to_string(), content_digest(source));
    }

    /// Remove artifacts and manifest entries whose key is not in `keep`.
    ///
    /// Only `.svg` files with a manifest entry are touched; derived
    /// artifacts are left alone. Returns the removed paths.
    pub fn prune(&mut self, keep: &BTreeSet<String>) -> Result<Vec<PathBuf>, CacheError> {
        let stale: Vec<String> = self
            .manifest
            .entries
            .keys()
            .filter(|k| !keep.contains(*k))
            .cloned()
            .collect();

        let mut removed = Vec::new();
        for key in stale {
            self.manifest.entries.remove(&key);
            let path = self.path_for(&key)?;
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path)(e)),
            }
        }
        Ok(removed)
    }

    /// Persist the manifest.
    pub fn save(&self) -> Result<(), CacheError> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&self.manifest).map_err(|e| {
            CacheError::Manifest {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        fs::write(&path, json).map_err(io_error(&path))
    }
}

/// Whether `artifact` exists and is newer than `dependency`.
///
/// A missing dependency makes the artifact stale.
pub fn is_fresh(artifact: &Path, dependency: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(artifact), modified(dependency)) {
        (Some(out), Some(dep)) => out > dep,
        _ => false,
    }
}
