//! structure::toc
//!
//! Table of contents and the per-chapter priority summary.

use std::fmt::Write as _;

use serde::Serialize;

use super::priority::{Aggregation, Rollup};
use super::render::{babel_html, escape_html};
use super::tree::Section;
use crate::core::types::{Babel, Priority};

/// One entry of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocItem {
    pub anchor: String,
    pub title: Babel,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
}

/// Project sections into ToC entries, at most `max_level` levels deep
/// (roots are level 1). `None` means unbounded.
pub fn scan_sections(sections: &[Section], max_level: Option<usize>) -> Vec<TocItem> {
    scan_level(sections, max_level, 1)
}

fn scan_level(sections: &[Section], max_level: Option<usize>, level: usize) -> Vec<TocItem> {
    if max_level.is_some_and(|max| level > max) {
        return Vec::new();
    }
    sections
        .iter()
        .map(|s| TocItem {
            anchor: s.anchor.clone(),
            title: s.title.clone(),
            children: scan_level(&s.subsections, max_level, level + 1),
        })
        .collect()
}

/// Render the `<nav id="toc">` block; `None` when there is nothing to list.
pub fn toc_html(items: &[TocItem]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut out = String::from("<nav id=\"toc\">\n");
    out.push_str(
        "<h2 class=\"introductory\"><span lang=\"en\" its-locale-filter-list=\"en\">Contents</span>\
         <span lang=\"zh-Hans\" its-locale-filter-list=\"zh\">目录</span></h2>\n",
    );
    render_list(items, &mut out);
    out.push_str("</nav>\n");
    Some(out)
}

fn render_list(items: &[TocItem], out: &mut String) {
    out.push_str("<ol class=\"toc\">\n");
    for item in items {
        let _ = write!(
            out,
            "<li class=\"tocline\"><a href=\"#{}\" class=\"tocxref\">{}</a>",
            escape_html(&item.anchor),
            babel_html(&item.title)
        );
        if !item.children.is_empty() {
            out.push('\n');
            render_list(&item.children, out);
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n");
}

/// One row of the chapter summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub anchor: String,
    pub title: Babel,
    /// One dot per annotated level, most severe first.
    pub dots: Vec<Priority>,
    pub report: String,
}

/// Summary rows for the top-level sections that received a rollup.
pub fn summary_rows(aggregation: &Aggregation) -> Vec<SummaryRow> {
    aggregation
        .top_levels
        .iter()
        .filter_map(|top| {
            let rollup = Rollup::from_levels(&top.levels)?;
            let mut dots = top.levels.clone();
            dots.sort_by(|a, b| b.cmp(a));
            Some(SummaryRow {
                anchor: top.anchor.clone(),
                title: top.title.clone(),
                dots,
                report: rollup.report(),
            })
        })
        .collect()
}

/// Render the rows for `ol#summary`.
pub fn summary_html(rows: &[SummaryRow]) -> String {
    let mut out = String::from("<ol id=\"summary\">\n");
    for row in rows {
        let _ = write!(
            out,
            "<li class=\"tocline\"><a href=\"#{}\" class=\"tocxref\"><p>{}</p><p class=\"dots\">",
            escape_html(&row.anchor),
            babel_html(&row.title)
        );
        for dot in &row.dots {
            let _ = write!(out, "<span style=\"background: #{}\" class=\"dot\"></span>", dot.paint());
        }
        let _ = writeln!(
            out,
            "</p><p class=\"report\">{}</p></a></li>",
            escape_html(&row.report)
        );
    }
    out.push_str("</ol>\n");
    out
}
