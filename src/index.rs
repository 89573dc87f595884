//! index
//!
//! The JSON index of document sections, a public artifact for external
//! consumers.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": "2025-11-24",
//!   "sections": [
//!     { "id": "fonts", "title": { "en": "Fonts", "zh-Hans": "字体" },
//!       "level": 2, "priority": "basic", "links": [] }
//!   ]
//! }
//! ```
//!
//! Sections are listed in document order. `level` is the typst heading
//! level, not the HTML rank.

use serde::Serialize;

use crate::core::types::{Babel, GeneralPriority, Priority};
use crate::document::Link;
use crate::structure::SectionTree;

/// Version of the index format.
pub const INDEX_VERSION: &str = "2025-11-24";

/// Selects the elements the index is built from. Query `index.typ`, not
/// `main.typ`, or the outline's title shows up as an extra heading.
pub const INDEX_SELECTOR: &str = "selector.or(heading, <priority>, <issue>, <pull>, <workaround>)\
                                  .after(outline)\
                                  .before(<addendum>, inclusive: false)";

/// One section of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: Babel,
    pub level: u8,
    pub priority: GeneralPriority,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonIndex {
    pub version: &'static str,
    pub sections: Vec<IndexSection>,
}

impl JsonIndex {
    pub fn from_tree(tree: &SectionTree) -> Self {
        let sections = tree
            .flatten()
            .into_iter()
            .map(|s| IndexSection {
                id: s.id.clone(),
                title: s.title.clone(),
                level: s.level.saturating_sub(1),
                priority: s.priority,
                links: s.links.clone(),
            })
            .collect();
        Self {
            version: INDEX_VERSION,
            sections,
        }
    }

    /// Pretty JSON, as printed to stdout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Sections that external consumers cannot reference: no id, and a
    /// priority that matters.
    pub fn unlabelled(&self) -> Vec<&IndexSection> {
        self.sections
            .iter()
            .filter(|s| s.id.is_none())
            .filter(|s| !matches!(s.priority.level(), Some(Priority::Tbd | Priority::Na)))
            .collect()
    }

    /// Warning listing [`Self::unlabelled`] sections, indented by level.
    pub fn unlabelled_warning(&self) -> Option<String> {
        let unlabelled = self.unlabelled();
        if unlabelled.is_empty() {
            return None;
        }

        let mut lines = vec![format!("Found {} unlabelled sections:", unlabelled.len())];
        for s in unlabelled {
            let priority = match s.priority.level() {
                Some(p) => format!("[{}] ", p),
                None => String::new(),
            };
            lines.push(format!(
                "{}- {}{} | {}",
                "  ".repeat(usize::from(s.level)),
                priority,
                s.title.en,
                s.title.zh_hans
            ));
        }
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, Heading, IssueMeta, Metadata};
    use crate::structure::build_section_tree;

    fn sample() -> JsonIndex {
        let mut elements = vec![
            Element::Heading(Heading::new(2, Babel::new("Fonts", "字体")).with_label("<fonts>")),
            Element::Metadata(Metadata::Priority(Priority::Basic)),
            Element::Metadata(Metadata::Issue(IssueMeta {
                repo: "typst/typst".into(),
                num: "42".into(),
                note: "auto".into(),
                closed: false,
            })),
            Element::Heading(Heading::new(3, Babel::plain("Fallback"))),
            Element::Metadata(Metadata::Priority(Priority::Broken)),
            Element::Heading(Heading::new(3, Babel::plain("Later"))),
            Element::Metadata(Metadata::Priority(Priority::Tbd)),
        ];
        JsonIndex::from_tree(&build_section_tree(&mut elements))
    }

    #[test]
    fn lists_sections_in_document_order() {
        let index = sample();
        let levels: Vec<_> = index.sections.iter().map(|s| s.level).collect();
        assert_eq!(levels, [1, 2, 2]);
        assert_eq!(index.sections[0].id.as_deref(), Some("fonts"));
        assert_eq!(index.sections[1].id, None);
    }

    #[test]
    fn serializes_links_with_type() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["version"], "2025-11-24");
        assert_eq!(json["sections"][0]["priority"], "basic");
        assert_eq!(json["sections"][0]["title"]["zh-Hans"], "字体");
        assert_eq!(json["sections"][0]["links"][0]["type"], "issue");
        assert_eq!(json["sections"][0]["links"][0]["num"], "42");
        assert!(json["sections"][1].get("id").is_none());
    }

    #[test]
    fn warns_about_unlabelled_sections_that_matter() {
        let warning = sample().unlabelled_warning().unwrap();
        assert_eq!(
            warning,
            "Found 1 unlabelled sections:\n    - [broken] Fallback | Fallback"
        );
    }
}
