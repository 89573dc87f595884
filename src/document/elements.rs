//! document::elements
//!
//! The element stream a document is made of, and its parser.
//!
//! # Query Format
//!
//! `typst query ... --target=html` prints a JSON array of elements. Each
//! element carries a `func` field; the ones relevant here are:
//!
//! - `heading`: `{level, body, label?}` with `body` a content tree
//! - `metadata`: `{value, label}` with `label` one of `<priority>`,
//!   `<issue>`, `<pull>`, `<workaround>`
//! - `sequence`: `{children}`, nested markup
//! - `elem` with a `prompt` class: a prompt paragraph under a heading
//!
//! Heading bodies are walked to recover the bilingual title: `elem` nodes
//! with a `lang` attribute switch the language the following text goes to.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::metadata::{IssueMeta, Metadata, PullMeta, WorkaroundMeta};
use crate::core::types::{Babel, Priority};
use crate::structure::Rollup;

/// Lowest and highest HTML heading ranks that form sections.
pub const MIN_LEVEL: u8 = 2;
pub const MAX_LEVEL: u8 = 6;

/// Errors from parsing query output.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to parse query output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reached unexpected element: {0}")]
    UnexpectedElement(String),

    #[error("invalid language: {lang} in {element}")]
    InvalidLanguage { lang: String, element: String },

    #[error("heading level {0} is out of range")]
    HeadingLevel(u8),

    #[error("invalid {label} metadata: {message}")]
    InvalidMetadata { label: String, message: String },
}

/// A heading in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// HTML heading rank, in `[MIN_LEVEL, MAX_LEVEL]`.
    pub level: u8,
    pub title: Babel,
    /// Typst label, e.g. `<line-breaking>`.
    pub label: Option<String>,
    /// Anchor id in the rendered page.
    pub id: Option<String>,
}

impl Heading {
    pub fn new(level: u8, title: Babel) -> Self {
        Self {
            level,
            title,
            label: None,
            id: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.id = Some(label_to_id(&label).to_string());
        self.label = Some(label);
        self
    }

    /// Heading level as typst counts it (the page title is rank 1).
    pub fn typst_level(&self) -> u8 {
        self.level - 1
    }

    /// The label without its angle brackets.
    pub fn label_id(&self) -> Option<&str> {
        self.label.as_deref().map(label_to_id)
    }
}

/// Strip the angle brackets typst prints around labels.
pub fn label_to_id(label: &str) -> &str {
    label
        .strip_prefix('<')
        .and_then(|l| l.strip_suffix('>'))
        .filter(|l| !l.is_empty())
        .unwrap_or(label)
}

/// One element of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Heading(Heading),
    Metadata(Metadata),
    /// A prompt paragraph; rollups are placed after these.
    Prompt(String),
    /// Nested markup that is not a section boundary.
    Group(Vec<Element>),
    /// A rendered priority rollup.
    Rollup(Rollup),
}

impl Element {
    pub fn as_heading(&self) -> Option<&Heading> {
        match self {
            Element::Heading(h) => Some(h),
            _ => None,
        }
    }

    /// All priority annotations in this element, nested ones included.
    pub fn priorities(&self) -> Vec<Priority> {
        let mut out = Vec::new();
        self.collect_priorities(&mut out);
        out
    }

    fn collect_priorities(&self, out: &mut Vec<Priority>) {
        match self {
            Element::Metadata(Metadata::Priority(p)) => out.push(*p),
            Element::Group(children) => {
                for child in children {
                    child.collect_priorities(out);
                }
            }
            _ => {}
        }
    }

    /// Every id present on headings, nested ones included.
    pub fn ids(&self) -> Vec<String> {
        match self {
            Element::Heading(h) => h.id.iter().cloned().collect(),
            Element::Group(children) => children.iter().flat_map(Element::ids).collect(),
            _ => Vec::new(),
        }
    }
}

/// Parse the JSON array printed by `typst query`.
pub fn parse_elements(json: &str) -> Result<Vec<Element>, QueryError> {
    let values: Vec<Value> = serde_json::from_str(json)?;
    let mut elements = Vec::with_capacity(values.len());
    for value in &values {
        if let Some(el) = parse_element(value)? {
            elements.push(el);
        }
    }
    Ok(elements)
}

/// Parse one element; returns `None` for markup without structural meaning.
fn parse_element(value: &Value) -> Result<Option<Element>, QueryError> {
    match value.get("func").and_then(Value::as_str) {
        Some("heading") => {
            let raw: HeadingElem = serde_json::from_value(value.clone())?;
            parse_heading(raw).map(|h| Some(Element::Heading(h)))
        }
        Some("metadata") => {
            let raw: MetadataElem = serde_json::from_value(value.clone())?;
            parse_metadata(raw).map(|m| Some(Element::Metadata(m)))
        }
        Some("sequence") => {
            let children = value
                .get("children")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let mut parsed = Vec::new();
            for child in children {
                if let Some(el) = parse_element(child)? {
                    parsed.push(el);
                }
            }
            Ok((!parsed.is_empty()).then_some(Element::Group(parsed)))
        }
        Some("elem") if is_prompt(value) => {
            let text = value
                .get("body")
                .map(plain_text)
                .unwrap_or_default()
                .trim()
                .to_string();
            Ok(Some(Element::Prompt(text)))
        }
        Some("space") | Some("text") | Some("elem") | Some("styled") => Ok(None),
        _ => Err(QueryError::UnexpectedElement(value.to_string())),
    }
}

fn is_prompt(value: &Value) -> bool {
    value
        .pointer("/attrs/class")
        .and_then(Value::as_str)
        .is_some_and(|class| class.split_whitespace().any(|c| c == "prompt"))
}

/// Concatenate every `text` field below a value.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let own = map.get("text").and_then(Value::as_str).unwrap_or("");
            let nested: String = ["body", "child", "children"]
                .iter()
                .filter_map(|k| map.get(*k))
                .map(plain_text)
                .collect();
            format!("{}{}", own, nested)
        }
        Value::Array(items) => items.iter().map(plain_text).collect(),
        _ => String::new(),
    }
}

#[derive(Deserialize)]
struct HeadingElem {
    level: u8,
    body: ContentElem,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Deserialize)]
struct MetadataElem {
    value: Value,
    label: String,
}

/// The subset of typst content found in heading bodies.
#[derive(Debug, Deserialize)]
#[serde(tag = "func", rename_all = "lowercase")]
enum ContentElem {
    Sequence {
        children: Vec<ContentElem>,
    },
    Styled {
        child: Box<ContentElem>,
    },
    Text {
        text: String,
    },
    Space,
    Raw {
        text: String,
    },
    Elem {
        #[serde(default)]
        attrs: BTreeMap<String, Value>,
        body: Box<ContentElem>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    En,
    ZhHans,
}

fn parse_heading(raw: HeadingElem) -> Result<Heading, QueryError> {
    let level = raw
        .level
        .checked_add(1)
        .filter(|l| (MIN_LEVEL..=MAX_LEVEL).contains(l))
        .ok_or(QueryError::HeadingLevel(raw.level))?;

    let mut title = Babel::default();
    let mut lang = Lang::En;
    walk_content(&raw.body, &mut title, &mut lang)?;

    if title.zh_hans.is_empty() {
        title.zh_hans = title.en.clone();
    }
    if title.en.is_empty() {
        title.en = title.zh_hans.clone();
    }

    let mut heading = Heading::new(level, title);
    if let Some(label) = raw.label {
        heading = heading.with_label(label);
    }
    Ok(heading)
}

fn walk_content(elem: &ContentElem, title: &mut Babel, lang: &mut Lang) -> Result<(), QueryError> {
    match elem {
        ContentElem::Sequence { children } => {
            for child in children {
                walk_content(child, title, lang)?;
            }
        }
        ContentElem::Styled { child } => walk_content(child, title, lang)?,
        ContentElem::Text { text } => push_text(title, *lang, text),
        ContentElem::Space => push_text(title, *lang, " "),
        ContentElem::Raw { text } => push_text(title, *lang, &format!("“{}”", text)),
        ContentElem::Elem { attrs, body } => {
            if let Some(next) = attrs.get("lang") {
                let next = match next.as_str() {
                    Some("en") => Lang::En,
                    Some("zh-Hans") => Lang::ZhHans,
                    _ => {
                        return Err(QueryError::InvalidLanguage {
                            lang: next.to_string(),
                            element: format!("{:?}", attrs),
                        })
                    }
                };
                // Drop the space inserted between languages.
                let current = text_mut(title, *lang);
                *current = current.trim().to_string();
                *lang = next;
            }
            walk_content(body, title, lang)?;
        }
    }
    Ok(())
}

fn text_mut(title: &mut Babel, lang: Lang) -> &mut String {
    match lang {
        Lang::En => &mut title.en,
        Lang::ZhHans => &mut title.zh_hans,
    }
}

fn push_text(title: &mut Babel, lang: Lang, text: &str) {
    text_mut(title, lang).push_str(text);
}

fn parse_metadata(raw: MetadataElem) -> Result<Metadata, QueryError> {
    let invalid = |e: serde_json::Error| QueryError::InvalidMetadata {
        label: raw.label.clone(),
        message: e.to_string(),
    };

    match raw.label.as_str() {
        "<priority>" => {
            let level = raw.value.as_str().unwrap_or_default();
            level
                .parse::<Priority>()
                .map(Metadata::Priority)
                .map_err(|e| QueryError::InvalidMetadata {
                    label: raw.label.clone(),
                    message: e.to_string(),
                })
        }
        "<issue>" => serde_json::from_value::<IssueMeta>(raw.value.clone())
            .map(Metadata::Issue)
            .map_err(invalid),
        "<pull>" => serde_json::from_value::<PullMeta>(raw.value.clone())
            .map(Metadata::Pull)
            .map_err(invalid),
        "<workaround>" => serde_json::from_value::<WorkaroundMeta>(raw.value.clone())
            .map(Metadata::Workaround)
            .map_err(invalid),
        other => Err(QueryError::UnexpectedElement(format!(
            "metadata labelled {}",
            other
        ))),
    }
}
