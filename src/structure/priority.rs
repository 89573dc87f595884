//! structure::priority
//!
//! Rolls up priority annotations from leaves to their ancestors.
//!
//! # Scopes
//!
//! Among a list of sibling sections, a section's scope is the half-open
//! range of elements from its heading to the next sibling's heading (or the
//! end of the enclosing scope). Every priority annotation in that range,
//! nested markup included, belongs to the section or one of its
//! descendants.
//!
//! # Rules
//!
//! - Leaf sections may hold at most one annotation; more is reported.
//! - Non-leaf sections with annotations get a [`Rollup`]: the worst level
//!   and a count breakdown. Their subsections are then aggregated within
//!   the same scope.
//! - Non-leaf sections without annotations get nothing and are not
//!   descended into.
//!
//! Aggregation is pure; [`super::render::insert_rollups`] projects the
//! result into a presentation element stream.

use serde::Serialize;

use super::tree::Section;
use super::{StructureError, StructureFinding};
use crate::core::types::{Babel, Priority};
use crate::document::Element;

/// Summary of the priority levels below a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rollup {
    /// Most severe level present.
    pub worst: Priority,
    /// Non-zero counts, most severe first.
    pub counts: Vec<(Priority, usize)>,
}

impl Rollup {
    /// Summarise `levels`; `None` when there is nothing to summarise.
    pub fn from_levels(levels: &[Priority]) -> Option<Self> {
        let worst = *levels.iter().max()?;
        let counts = Priority::ALL
            .iter()
            .rev()
            .map(|p| (*p, levels.iter().filter(|l| *l == p).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        Some(Self { worst, counts })
    }

    /// Human-readable breakdown, e.g. `2 Broken, 1 OK`.
    pub fn report(&self) -> String {
        self.counts
            .iter()
            .map(|(p, n)| format!("{} {}", n, p.human()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

/// A rollup computed for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRollup {
    pub anchor: String,
    /// Index of the section heading in the element stream.
    #[serde(skip)]
    pub position: usize,
    pub rollup: Rollup,
}

/// Levels found below a top-level section that received a rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSectionLevels {
    pub anchor: String,
    pub title: Babel,
    pub levels: Vec<Priority>,
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub rollups: Vec<SectionRollup>,
    pub top_levels: Vec<TopSectionLevels>,
    pub findings: Vec<StructureFinding>,
}

impl Aggregation {
    pub fn rollup_for(&self, anchor: &str) -> Option<&Rollup> {
        self.rollups
            .iter()
            .find(|r| r.anchor == anchor)
            .map(|r| &r.rollup)
    }
}

/// Aggregate priorities over the section tree.
///
/// `elements` must be the stream `roots` was built from.
///
/// # Errors
///
/// Returns `StructureError::SectionNotFound` when a section's heading is
/// not where the tree says it is, i.e. tree and elements disagree.
pub fn aggregate(roots: &[Section], elements: &[Element]) -> Result<Aggregation, StructureError> {
    let mut out = Aggregation::default();
    aggregate_siblings(roots, elements, 0, true, &mut out)?;
    Ok(out)
}

fn aggregate_siblings(
    sections: &[Section],
    siblings: &[Element],
    offset: usize,
    is_top: bool,
    out: &mut Aggregation,
) -> Result<(), StructureError> {
    let starts = sections
        .iter()
        .map(|s| locate(s, siblings, offset))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, section) in sections.iter().enumerate() {
        let start = starts[i];
        let end = starts.get(i + 1).copied().unwrap_or(siblings.len());
        let scope = &siblings[start..end];

        let levels: Vec<Priority> = scope.iter().flat_map(Element::priorities).collect();

        if section.is_leaf() {
            if levels.len() > 1 {
                out.findings.push(StructureFinding::MultiplePriorities {
                    anchor: section.anchor.clone(),
                    title: section.title.clone(),
                    levels,
                });
            }
            continue;
        }

        let Some(rollup) = Rollup::from_levels(&levels) else {
            continue;
        };

        if is_top {
            out.top_levels.push(TopSectionLevels {
                anchor: section.anchor.clone(),
                title: section.title.clone(),
                levels,
            });
        }
        out.rollups.push(SectionRollup {
            anchor: section.anchor.clone(),
            position: section.position,
            rollup,
        });

        aggregate_siblings(&section.subsections, scope, offset + start, false, out)?;
    }

    Ok(())
}

/// Find a section's heading in `siblings`, which starts at `offset` in the
/// full element stream.
fn locate(section: &Section, siblings: &[Element], offset: usize) -> Result<usize, StructureError> {
    let not_found = || StructureError::SectionNotFound {
        anchor: section.anchor.clone(),
    };

    let local = section.position.checked_sub(offset).ok_or_else(not_found)?;
    match siblings.get(local).and_then(Element::as_heading) {
        Some(h) if h.id.as_deref() == Some(section.anchor.as_str()) => Ok(local),
        _ => Err(not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Heading, Metadata};
    use crate::structure::tree::build_section_tree;

    fn heading(level: u8, title: &str) -> Element {
        Element::Heading(Heading::new(level, Babel::plain(title)))
    }

    fn level(p: Priority) -> Element {
        Element::Metadata(Metadata::Priority(p))
    }

    #[test]
    fn rollup_worst_and_report() {
        let rollup =
            Rollup::from_levels(&[Priority::Ok, Priority::Broken, Priority::Ok, Priority::Tbd])
                .unwrap();
        assert_eq!(rollup.worst, Priority::Broken);
        assert_eq!(rollup.report(), "1 Broken, 2 OK, 1 To be done");
        assert_eq!(rollup.total(), 4);
        assert!(Rollup::from_levels(&[]).is_none());
    }

    #[test]
    fn rolls_up_to_every_ancestor() {
        let mut elements = vec![
            heading(2, "A"),
            heading(3, "A.1"),
            level(Priority::Ok),
            heading(3, "A.2"),
            heading(4, "A.2.a"),
            level(Priority::Basic),
            heading(4, "A.2.b"),
            level(Priority::Advanced),
            heading(2, "B"),
            level(Priority::Na),
        ];
        let tree = build_section_tree(&mut elements);
        let agg = aggregate(&tree.roots, &elements).unwrap();

        assert_eq!(agg.rollup_for("a").unwrap().worst, Priority::Basic);
        assert_eq!(agg.rollup_for("a").unwrap().report(), "1 Basic, 1 Advanced, 1 OK");
        assert_eq!(agg.rollup_for("a-2").unwrap().worst, Priority::Basic);
        assert!(agg.rollup_for("a-1").is_none());
        assert!(agg.rollup_for("b").is_none());

        assert_eq!(agg.top_levels.len(), 1);
        assert_eq!(agg.top_levels[0].anchor, "a");
        assert_eq!(
            agg.top_levels[0].levels,
            vec![Priority::Ok, Priority::Basic, Priority::Advanced]
        );
        assert!(agg.findings.is_empty());
    }

    #[test]
    fn does_not_descend_without_annotations() {
        let mut elements = vec![heading(2, "A"), heading(3, "A.1"), heading(4, "A.1.a")];
        let tree = build_section_tree(&mut elements);
        let agg = aggregate(&tree.roots, &elements).unwrap();
        assert!(agg.rollups.is_empty());
        assert!(agg.top_levels.is_empty());
    }

    #[test]
    fn counts_nested_markup() {
        let mut elements = vec![
            heading(2, "A"),
            heading(3, "A.1"),
            Element::Group(vec![Element::Prompt("p".into()), level(Priority::Broken)]),
        ];
        let tree = build_section_tree(&mut elements);
        let agg = aggregate(&tree.roots, &elements).unwrap();
        assert_eq!(agg.rollup_for("a").unwrap().worst, Priority::Broken);
    }

    #[test]
    fn reports_leaf_with_several_levels() {
        let mut elements = vec![
            heading(2, "A"),
            heading(3, "A.1"),
            Element::Group(vec![level(Priority::Ok), level(Priority::Basic)]),
        ];
        let tree = build_section_tree(&mut elements);
        let agg = aggregate(&tree.roots, &elements).unwrap();

        assert_eq!(
            agg.findings,
            vec![StructureFinding::MultiplePriorities {
                anchor: "a-1".into(),
                title: Babel::plain("A.1"),
                levels: vec![Priority::Ok, Priority::Basic],
            }]
        );
        // The parent still gets its rollup.
        assert_eq!(agg.rollup_for("a").unwrap().total(), 2);
    }

    #[test]
    fn detects_desynchronised_tree() {
        let mut elements = vec![heading(2, "A"), heading(3, "A.1"), level(Priority::Ok)];
        let tree = build_section_tree(&mut elements);
        elements.remove(0);

        assert!(matches!(
            aggregate(&tree.roots, &elements),
            Err(StructureError::SectionNotFound { .. })
        ));
    }
}
