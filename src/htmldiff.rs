//! htmldiff
//!
//! Patch the built page for the W3C htmldiff service.
//!
//! When the page is viewed through `services.w3.org/htmldiff`, an inline
//! script swaps the service's keyboard navigation for the site's own
//! `htmldiff-nav` bundle. The bundle's hashed file name comes from the
//! bundler manifest in `dist/.vite/manifest.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::paths::ProjectPaths;

/// Manifest key of the navigation bundle.
pub const NAV_ENTRY: &str = "src/htmldiff-nav.ts";

/// Placeholder in the script template.
pub const NAV_SRC_PLACEHOLDER: &str = "{{ HTMLDIFF-NAV-SRC }}";

/// Errors from patching.
#[derive(Debug, Error)]
pub enum HtmldiffError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid bundler manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("bundler manifest has no entry for '{0}'")]
    MissingEntry(String),

    #[error("page has no </head>")]
    NoHead,
}

/// Whether the page was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    AlreadyPatched,
}

#[derive(Deserialize)]
struct ManifestChunk {
    file: String,
}

/// Output file of `entry` in a bundler manifest.
pub fn manifest_file(manifest_json: &str, entry: &str) -> Result<String, HtmldiffError> {
    let manifest: BTreeMap<String, ManifestChunk> = serde_json::from_str(manifest_json)?;
    manifest
        .get(entry)
        .map(|chunk| chunk.file.clone())
        .ok_or_else(|| HtmldiffError::MissingEntry(entry.to_string()))
}

/// Fill the template with the bundle URL.
pub fn render_script(template: &str, nav_src: &str) -> String {
    template.replacen(NAV_SRC_PLACEHOLDER, nav_src, 1)
}

/// Insert `<script>` before the first `</head>`.
///
/// ```
/// use clreq_tools::htmldiff::inject_script;
///
/// let html = inject_script("<head></head>", "run()").unwrap();
/// assert_eq!(html.as_deref(), Some("<head><script>run()</script></head>"));
/// ```
///
/// Returns `None` when the page already carries the script.
pub fn inject_script(html: &str, script: &str) -> Result<Option<String>, HtmldiffError> {
    let tag = format!("<script>{}</script>", script);
    if html.contains(&tag) {
        return Ok(None);
    }
    if !html.contains("</head>") {
        return Err(HtmldiffError::NoHead);
    }
    Ok(Some(html.replacen("</head>", &format!("{}</head>", tag), 1)))
}

fn read(path: &Path) -> Result<String, HtmldiffError> {
    fs::read_to_string(path).map_err(|source| HtmldiffError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Patch `dist/index.html` in place.
pub fn patch_htmldiff(paths: &ProjectPaths, url_base: &str) -> Result<PatchOutcome, HtmldiffError> {
    let nav_file = manifest_file(&read(&paths.vite_manifest())?, NAV_ENTRY)?;
    let script = render_script(
        &read(&paths.htmldiff_template())?,
        &format!("{}{}", url_base, nav_file),
    );

    let index = paths.index_html();
    match inject_script(&read(&index)?, &script)? {
        Some(html) => {
            fs::write(&index, html).map_err(|source| HtmldiffError::Write {
                path: index.clone(),
                source,
            })?;
            log::debug!("patched {}", index.display());
            Ok(PatchOutcome::Patched)
        }
        None => Ok(PatchOutcome::AlreadyPatched),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_lookup() {
        let json = r#"{"src/htmldiff-nav.ts": {"file": "assets/htmldiff-nav-abc.js", "isEntry": true}}"#;
        assert_eq!(
            manifest_file(json, NAV_ENTRY).unwrap(),
            "assets/htmldiff-nav-abc.js"
        );
        assert!(matches!(
            manifest_file("{}", NAV_ENTRY),
            Err(HtmldiffError::MissingEntry(_))
        ));
    }

    #[test]
    fn page_without_head_is_an_error() {
        assert!(matches!(inject_script("<p>", "x"), Err(HtmldiffError::NoHead)));
    }

    #[test]
    fn patch_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new(temp.path().to_path_buf());
        fs::create_dir_all(temp.path().join("dist/.vite")).unwrap();
        fs::create_dir_all(temp.path().join("scripts")).unwrap();
        fs::write(
            paths.vite_manifest(),
            r#"{"src/htmldiff-nav.ts": {"file": "assets/nav.js"}}"#,
        )
        .unwrap();
        fs::write(
            paths.htmldiff_template(),
            r#"s.src = "{{ HTMLDIFF-NAV-SRC }}";"#,
        )
        .unwrap();
        fs::write(paths.index_html(), "<html><head></head><body></body></html>").unwrap();

        assert_eq!(patch_htmldiff(&paths, "/clreq/").unwrap(), PatchOutcome::Patched);
        assert_eq!(
            fs::read_to_string(paths.index_html()).unwrap(),
            r#"<html><head><script>s.src = "/clreq/assets/nav.js";</script></head><body></body></html>"#
        );
        assert_eq!(
            patch_htmldiff(&paths, "/clreq/").unwrap(),
            PatchOutcome::AlreadyPatched
        );
    }
}
