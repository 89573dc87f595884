//! structure
//!
//! Document structure engine: section tree, priority rollups, table of
//! contents.
//!
//! # Pipeline
//!
//! 1. [`tree::build_section_tree`] nests headings and assigns anchors
//! 2. [`priority::aggregate`] computes rollups over the tree (pure)
//! 3. [`render::insert_rollups`] projects rollups into the element stream
//! 4. [`toc`] renders the table of contents and the chapter summary
//!
//! [`Structure::analyze`] runs steps 1-3 in one go.

pub mod priority;
pub mod render;
pub mod toc;
pub mod tree;

use serde::Serialize;
use thiserror::Error;

pub use priority::{aggregate, Aggregation, Rollup, SectionRollup, TopSectionLevels};
pub use toc::{scan_sections, summary_rows, SummaryRow, TocItem};
pub use tree::{build_section_tree, Section, SectionTree};

use crate::core::types::{Babel, Priority};
use crate::document::Element;

/// Errors that indicate a bug rather than bad document data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("section '{anchor}' is not where the section tree expects it")]
    SectionNotFound { anchor: String },
}

/// Inconsistencies in the document's structure annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StructureFinding {
    /// Metadata appears before any heading.
    OrphanMetadata { label: String },
    /// More than one priority level marks the same section.
    MultiplePriorities {
        anchor: String,
        title: Babel,
        levels: Vec<Priority>,
    },
}

impl std::fmt::Display for StructureFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureFinding::OrphanMetadata { label } => write!(
                f,
                "{} metadata describes the heading before it, but there is no heading before it",
                label
            ),
            StructureFinding::MultiplePriorities {
                anchor,
                title,
                levels,
            } => {
                let levels: Vec<_> = levels.iter().map(Priority::as_str).collect();
                write!(
                    f,
                    "multiple priority levels [{}] mark the same section: {} (#{})",
                    levels.join(", "),
                    title,
                    anchor
                )
            }
        }
    }
}

/// A document with its structure analysed and rollups rendered in.
#[derive(Debug, Clone)]
pub struct Structure {
    /// Presentation elements, rollups included.
    pub elements: Vec<Element>,
    pub tree: SectionTree,
    pub aggregation: Aggregation,
}

impl Structure {
    /// Build the tree, aggregate priorities and insert rollups.
    ///
    /// # Errors
    ///
    /// Returns `StructureError` if the tree and the elements disagree.
    pub fn analyze(mut elements: Vec<Element>) -> Result<Self, StructureError> {
        let tree = build_section_tree(&mut elements);
        let aggregation = aggregate(&tree.roots, &elements)?;
        render::insert_rollups(&mut elements, &aggregation)?;

        // Positions moved with the inserted rollups.
        let tree = build_section_tree(&mut elements);
        Ok(Self {
            elements,
            tree,
            aggregation,
        })
    }

    /// Tree and aggregation findings, without duplicates.
    pub fn findings(&self) -> Vec<StructureFinding> {
        let mut all: Vec<StructureFinding> = Vec::new();
        for finding in self.tree.findings.iter().chain(&self.aggregation.findings) {
            if !all.contains(finding) {
                all.push(finding.clone());
            }
        }
        all
    }

    pub fn toc(&self, max_level: Option<usize>) -> Vec<TocItem> {
        scan_sections(&self.tree.roots, max_level)
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        summary_rows(&self.aggregation)
    }

    /// The page fragment: ToC, summary, then the body.
    pub fn to_html(&self, max_level: Option<usize>) -> String {
        let mut out = String::new();
        if let Some(toc) = toc::toc_html(&self.toc(max_level)) {
            out.push_str(&toc);
        }
        out.push_str(&toc::summary_html(&self.summary()));
        out.push_str(&render::to_html(&self.elements));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Heading, Metadata};

    #[test]
    fn analyze_deduplicates_findings() {
        let elements = vec![
            Element::Heading(Heading::new(2, Babel::plain("A"))),
            Element::Metadata(Metadata::Priority(Priority::Ok)),
            Element::Metadata(Metadata::Priority(Priority::Basic)),
        ];
        let structure = Structure::analyze(elements).unwrap();
        assert_eq!(structure.findings().len(), 1);
        assert!(structure.findings()[0]
            .to_string()
            .starts_with("multiple priority levels [ok, basic] mark the same section"));
    }

    #[test]
    fn analyze_is_stable_under_reanalysis() {
        let elements = vec![
            Element::Heading(Heading::new(2, Babel::plain("A"))),
            Element::Heading(Heading::new(3, Babel::plain("A.1"))),
            Element::Metadata(Metadata::Priority(Priority::Basic)),
        ];
        let first = Structure::analyze(elements).unwrap();
        let second = Structure::analyze(first.elements.clone()).unwrap();
        assert_eq!(first.elements, second.elements);
        assert_eq!(first.aggregation.rollups.len(), 1);
        assert_eq!(second.tree.roots[0].subsections[0].position, 2);
    }
}
