//! git
//!
//! Build provenance: which commit a build comes from.
//!
//! # Sources
//!
//! Checked in order:
//! 1. GitHub Actions (`GITHUB_ACTIONS=true`)
//! 2. Netlify (`NETLIFY=true`)
//! 3. The local checkout, via `git2`, when its `origin` is on GitHub
//!
//! The result is passed to the compiler as `--input git=<json>` and shows
//! up in the document's status section.
//!
//! # Example
//!
//! ```
//! use clreq_tools::git::BuildInfo;
//!
//! let env = |key: &str| match key {
//!     "GITHUB_ACTIONS" => Some("true".to_string()),
//!     "GITHUB_SERVER_URL" => Some("https://github.com".to_string()),
//!     "GITHUB_REPOSITORY" => Some("w3c/clreq".to_string()),
//!     "GITHUB_SHA" => Some("0123456789abcdef".to_string()),
//!     "GITHUB_REF" => Some("refs/heads/gh-pages".to_string()),
//!     "GITHUB_RUN_ID" => Some("42".to_string()),
//!     _ => None,
//! };
//!
//! let info = BuildInfo::from_env(env).unwrap();
//! assert_eq!(info.name, "01234567 (refs/heads/gh-pages)");
//! assert_eq!(info.log_url, "https://github.com/w3c/clreq/actions/runs/42");
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors from reading the local repository.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    #[error("git error: {message}")]
    Internal { message: String },
}

impl From<git2::Error> for GitError {
    fn from(e: git2::Error) -> Self {
        GitError::Internal {
            message: e.message().to_string(),
        }
    }
}

/// Where a build comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: String,
    pub commit_url: String,
    pub log_url: String,
}

impl BuildInfo {
    /// Read CI variables. `None` outside GitHub Actions and Netlify.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |key: &str| env(key).unwrap_or_default();

        if env("GITHUB_ACTIONS").as_deref() == Some("true") {
            let base = format!("{}/{}", var("GITHUB_SERVER_URL"), var("GITHUB_REPOSITORY"));
            let sha = var("GITHUB_SHA");
            return Some(Self {
                name: format!("{} ({})", short(&sha), var("GITHUB_REF")),
                commit_url: format!("{}/commit/{}", base, sha),
                log_url: format!("{}/actions/runs/{}", base, var("GITHUB_RUN_ID")),
            });
        }

        if env("NETLIFY").as_deref() == Some("true") {
            let sha = var("COMMIT_REF");
            return Some(Self {
                name: format!("{} ({})", short(&sha), var("HEAD")),
                commit_url: format!("{}/commit/{}", var("REPOSITORY_URL"), sha),
                log_url: format!(
                    "https://app.netlify.com/sites/{}/deploys/{}",
                    var("SITE_NAME"),
                    var("DEPLOY_ID")
                ),
            });
        }

        None
    }

    /// Describe HEAD of the repository containing `path`.
    ///
    /// Returns `Ok(None)` when HEAD is unborn or `origin` is not a GitHub
    /// remote, since there is nothing to link to.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn from_repo(path: &Path) -> Result<Option<Self>, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let sha = head.peel_to_commit()?.id().to_string();
        let branch = if head.is_branch() {
            head.shorthand().unwrap_or("HEAD").to_string()
        } else {
            "HEAD".to_string()
        };

        let remote = match repo.find_remote("origin") {
            Ok(remote) => remote.url().map(String::from),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let Some((owner, name)) = remote.as_deref().and_then(parse_github_remote) else {
            return Ok(None);
        };

        let base = format!("https://github.com/{}/{}", owner, name);
        Ok(Some(Self {
            name: format!("{} ({})", short(&sha), branch),
            commit_url: format!("{}/commit/{}", base, sha),
            log_url: format!("{}/commits/{}", base, branch),
        }))
    }

    /// Environment first, then the checkout at `root`. Local failures are
    /// logged and yield `None`.
    pub fn detect(root: &Path) -> Option<Self> {
        if let Some(info) = Self::from_env(|key| std::env::var(key).ok()) {
            return Some(info);
        }
        match Self::from_repo(root) {
            Ok(info) => info,
            Err(e) => {
                log::debug!("no build info from local checkout: {}", e);
                None
            }
        }
    }

    /// Compiler arguments carrying this info.
    pub fn input_args(&self) -> Vec<String> {
        // Serializing three strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        vec!["--input".to_string(), format!("git={}", json)]
    }
}

fn short(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

/// Parse a remote URL into owner/repo for GitHub.
///
/// Handles both HTTPS and SSH URLs; returns `None` for other hosts.
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("git@github.com:"))
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))?;

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, name) = rest.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn netlify_env() {
        let env = |key: &str| {
            match key {
                "NETLIFY" => Some("true"),
                "COMMIT_REF" => Some("fedcba9876543210"),
                "HEAD" => Some("patch-1"),
                "REPOSITORY_URL" => Some("https://github.com/w3c/clreq"),
                "SITE_NAME" => Some("clreq"),
                "DEPLOY_ID" => Some("abc"),
                _ => None,
            }
            .map(String::from)
        };

        let info = BuildInfo::from_env(env).unwrap();
        assert_eq!(info.name, "fedcba98 (patch-1)");
        assert_eq!(
            info.commit_url,
            "https://github.com/w3c/clreq/commit/fedcba9876543210"
        );
        assert_eq!(info.log_url, "https://app.netlify.com/sites/clreq/deploys/abc");
    }

    #[test]
    fn no_ci_env() {
        assert!(BuildInfo::from_env(|_| None).is_none());
    }

    #[test]
    fn input_args_are_json() {
        let info = BuildInfo {
            name: "n".into(),
            commit_url: "c".into(),
            log_url: "l".into(),
        };
        assert_eq!(
            info.input_args(),
            ["--input", r#"git={"name":"n","commit_url":"c","log_url":"l"}"#]
        );
    }

    #[test]
    fn parses_github_remotes() {
        let expected = Some(("w3c".to_string(), "clreq".to_string()));
        assert_eq!(parse_github_remote("https://github.com/w3c/clreq.git"), expected);
        assert_eq!(parse_github_remote("git@github.com:w3c/clreq.git"), expected);
        assert_eq!(parse_github_remote("https://github.com/w3c/clreq"), expected);
        assert_eq!(parse_github_remote("https://gitlab.com/w3c/clreq.git"), None);
    }

    #[test]
    fn local_repo_with_github_origin() {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        repo.remote("origin", "git@github.com:w3c/clreq.git").unwrap();

        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();

        let info = BuildInfo::from_repo(temp.path()).unwrap().unwrap();
        assert!(info.name.starts_with(&oid.to_string()[..8]));
        assert_eq!(
            info.commit_url,
            format!("https://github.com/w3c/clreq/commit/{}", oid)
        );
    }

    #[test]
    fn local_repo_without_commits() {
        let temp = TempDir::new().unwrap();
        git2::Repository::init(temp.path()).unwrap();
        assert!(BuildInfo::from_repo(temp.path()).unwrap().is_none());
    }
}
