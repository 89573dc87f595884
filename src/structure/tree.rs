//! structure::tree
//!
//! Reconstructs the nested section tree from the flat element stream.
//!
//! # Algorithm
//!
//! A single left-to-right pass keeps, for every heading level, the last
//! section seen at that level. A heading attaches to the section recorded
//! one level up; without one (a skipped level, or the top level) it starts
//! a new root. After placing a heading, entries of deeper levels are
//! evicted since they can no longer be ancestors.
//!
//! Metadata between a heading and the next one describes that heading's
//! section: a priority sets its level, citations append to its links.
//!
//! Headings without an id get one from [`IdRegistry`]; this is the only
//! mutation of the input.

use std::collections::BTreeMap;

use serde::Serialize;

use super::StructureFinding;
use crate::core::naming::IdRegistry;
use crate::core::types::{Babel, GeneralPriority, Priority};
use crate::document::elements::MIN_LEVEL;
use crate::document::{Element, Link, Metadata};

/// A section of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: Babel,
    /// HTML heading rank.
    pub level: u8,
    /// Stable id derived from the heading's label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Anchor of the heading in the rendered page.
    pub anchor: String,
    pub priority: GeneralPriority,
    pub links: Vec<Link>,
    /// Index of the heading in the element stream.
    #[serde(skip)]
    pub position: usize,
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn is_leaf(&self) -> bool {
        self.subsections.is_empty()
    }

    /// This section and all descendants, in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.subsections.iter().rev());
            Some(next)
        })
    }
}

/// Result of building the tree.
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    pub roots: Vec<Section>,
    pub findings: Vec<StructureFinding>,
}

impl SectionTree {
    /// All sections in document order.
    pub fn flatten(&self) -> Vec<&Section> {
        self.roots.iter().flat_map(Section::iter).collect()
    }
}

/// Build the section tree from top-level headings of `elements`.
///
/// Assigns an id to every top-level heading that lacks one.
pub fn build_section_tree(elements: &mut [Element]) -> SectionTree {
    let mut ids = IdRegistry::with_existing(elements.iter().flat_map(Element::ids));

    let mut arena: Vec<Section> = Vec::new();
    let mut children: Vec<Vec<usize>> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut direct: Vec<Vec<Priority>> = Vec::new();
    let mut last_at_level: BTreeMap<u8, usize> = BTreeMap::new();
    let mut findings = Vec::new();

    for (position, element) in elements.iter_mut().enumerate() {
        match element {
            Element::Heading(heading) => {
                let anchor = ids.add_id(
                    heading.id.as_deref(),
                    None,
                    &heading.title.text_content(),
                    false,
                );
                heading.id = Some(anchor.clone());

                let level = heading.level;
                let index = arena.len();
                arena.push(Section {
                    title: heading.title.clone(),
                    level,
                    id: heading.label_id().map(str::to_string),
                    anchor,
                    priority: GeneralPriority::Inherited,
                    links: Vec::new(),
                    position,
                    subsections: Vec::new(),
                });
                children.push(Vec::new());
                direct.push(Vec::new());

                let parent = (level > MIN_LEVEL)
                    .then(|| last_at_level.get(&(level - 1)))
                    .flatten();
                match parent {
                    Some(&parent) => children[parent].push(index),
                    None => roots.push(index),
                }

                last_at_level.insert(level, index);
                last_at_level.retain(|&l, _| l <= level);
            }
            other => {
                let metadata = collect_metadata(other);
                if metadata.is_empty() {
                    continue;
                }
                let Some(current) = arena.len().checked_sub(1) else {
                    findings.extend(metadata.iter().map(|m| StructureFinding::OrphanMetadata {
                        label: m.label().to_string(),
                    }));
                    continue;
                };
                for m in metadata {
                    match m {
                        Metadata::Priority(p) => direct[current].push(*p),
                        _ => arena[current].links.extend(m.to_link()),
                    }
                }
            }
        }
    }

    for (section, levels) in arena.iter_mut().zip(&direct) {
        if let Some(first) = levels.first() {
            section.priority = GeneralPriority::Level(*first);
        }
        if levels.len() > 1 {
            findings.push(StructureFinding::MultiplePriorities {
                anchor: section.anchor.clone(),
                title: section.title.clone(),
                levels: levels.clone(),
            });
        }
    }

    let mut slots: Vec<Option<Section>> = arena.into_iter().map(Some).collect();
    let roots = roots
        .into_iter()
        .filter_map(|i| assemble(i, &mut slots, &children))
        .collect();

    SectionTree { roots, findings }
}

fn collect_metadata(element: &Element) -> Vec<&Metadata> {
    match element {
        Element::Metadata(m) => vec![m],
        Element::Group(items) => items.iter().flat_map(collect_metadata).collect(),
        _ => Vec::new(),
    }
}

fn assemble(index: usize, slots: &mut [Option<Section>], children: &[Vec<usize>]) -> Option<Section> {
    let mut section = slots[index].take()?;
    section.subsections = children[index]
        .iter()
        .filter_map(|&child| assemble(child, slots, children))
        .collect();
    Some(section)
}
