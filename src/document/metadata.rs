//! document::metadata
//!
//! Metadata records the document attaches to sections.
//!
//! Each record comes from a typst `metadata` element carrying one of the
//! labels `<priority>`, `<issue>`, `<pull>` or `<workaround>`.

use serde::{Deserialize, Serialize};

use crate::core::types::{CitationKey, Priority, TypeError};

/// Note value of an issue cited without an explicit note.
pub const DEFAULT_NOTE: &str = "auto";

/// An issue cited by the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMeta {
    /// `owner/name`
    pub repo: String,
    /// Issue number, as written in the document.
    #[serde(deserialize_with = "number_text")]
    pub num: String,
    /// `auto` unless the author clarified why the issue is cited.
    #[serde(default = "default_note")]
    pub note: String,
    /// Whether the document records the issue as closed.
    #[serde(default)]
    pub closed: bool,
}

fn default_note() -> String {
    DEFAULT_NOTE.to_string()
}

/// Numbers may be recorded as `"189"` or `189`.
fn number_text<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Num {
        Text(String),
        Int(u64),
    }
    Ok(match Num::deserialize(deserializer)? {
        Num::Text(s) => s,
        Num::Int(n) => n.to_string(),
    })
}

impl IssueMeta {
    pub fn key(&self) -> Result<CitationKey, TypeError> {
        CitationKey::new(&self.repo, &self.num)
    }

    /// Citations with the default note are expected to be unique.
    pub fn has_default_note(&self) -> bool {
        self.note == DEFAULT_NOTE
    }
}

/// A pull request cited by the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullMeta {
    /// `owner/name`
    pub repo: String,
    /// PR number, as written in the document.
    #[serde(deserialize_with = "number_text")]
    pub num: String,
    /// Whether the document records the PR as merged.
    #[serde(default)]
    pub merged: bool,
    /// Whether the document records the PR as closed without merging.
    #[serde(default)]
    pub rejected: bool,
}

impl PullMeta {
    pub fn key(&self) -> Result<CitationKey, TypeError> {
        CitationKey::new(&self.repo, &self.num)
    }
}

/// A workaround link (package, snippet, external page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkaroundMeta {
    pub dest: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// A citation attached to a section, as written to the JSON index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Link {
    Issue(IssueMeta),
    Pull(PullMeta),
    Workaround(WorkaroundMeta),
}

/// A labelled metadata element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    Priority(Priority),
    Issue(IssueMeta),
    Pull(PullMeta),
    Workaround(WorkaroundMeta),
}

impl Metadata {
    /// The link this metadata contributes to a section, if any.
    pub fn to_link(&self) -> Option<Link> {
        match self {
            Metadata::Priority(_) => None,
            Metadata::Issue(m) => Some(Link::Issue(m.clone())),
            Metadata::Pull(m) => Some(Link::Pull(m.clone())),
            Metadata::Workaround(m) => Some(Link::Workaround(m.clone())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metadata::Priority(_) => "<priority>",
            Metadata::Issue(_) => "<issue>",
            Metadata::Pull(_) => "<pull>",
            Metadata::Workaround(_) => "<workaround>",
        }
    }
}
