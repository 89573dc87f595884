//! structure::render
//!
//! Projects aggregation results into a presentation element stream, and
//! that stream into HTML.
//!
//! # Idempotence
//!
//! A rollup goes right after its heading and any prompts that follow it.
//! If a rollup is already there it is replaced, so rendering an already
//! rendered stream does not duplicate rollups.

use std::fmt::Write as _;

use super::priority::{Aggregation, Rollup};
use super::StructureError;
use crate::core::types::Babel;
use crate::document::{Element, Link, Metadata};

/// Insert (or replace) each section's rollup after its heading.
///
/// # Errors
///
/// Returns `StructureError::SectionNotFound` when a rollup's heading is not
/// at its recorded position.
pub fn insert_rollups(
    elements: &mut Vec<Element>,
    aggregation: &Aggregation,
) -> Result<(), StructureError> {
    let mut rollups: Vec<_> = aggregation.rollups.iter().collect();
    // Back to front, so earlier positions stay valid.
    rollups.sort_by(|a, b| b.position.cmp(&a.position));

    for entry in rollups {
        match elements.get(entry.position).and_then(Element::as_heading) {
            Some(h) if h.id.as_deref() == Some(entry.anchor.as_str()) => {}
            _ => {
                return Err(StructureError::SectionNotFound {
                    anchor: entry.anchor.clone(),
                })
            }
        }

        let mut at = entry.position + 1;
        while matches!(elements.get(at), Some(Element::Prompt(_))) {
            at += 1;
        }

        match elements.get_mut(at) {
            Some(Element::Rollup(existing)) => *existing = entry.rollup.clone(),
            _ => elements.insert(at, Element::Rollup(entry.rollup.clone())),
        }
    }

    Ok(())
}

/// Render a presentation element stream as an HTML fragment.
pub fn to_html(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        render_element(element, &mut out);
    }
    out
}

fn render_element(element: &Element, out: &mut String) {
    match element {
        Element::Heading(h) => {
            let _ = write!(out, "<h{}", h.level);
            if let Some(id) = &h.id {
                let _ = write!(out, " id=\"{}\">", escape_html(id));
                let _ = write!(out, "{}", permalink(id));
            } else {
                out.push('>');
            }
            out.push_str(&babel_html(&h.title));
            let _ = writeln!(out, "</h{}>", h.level);
        }
        Element::Prompt(text) => {
            let _ = writeln!(out, "<p class=\"prompt\">{}</p>", escape_html(text));
        }
        Element::Metadata(Metadata::Priority(p)) => {
            let _ = writeln!(
                out,
                "<span class=\"priority\" data-priority-level=\"{}\" style=\"background: #{}\">{}</span>",
                p,
                p.paint(),
                p.human()
            );
        }
        Element::Metadata(m) => {
            if let Some(link) = m.to_link() {
                let _ = writeln!(out, "{}", link_html(&link));
            }
        }
        Element::Group(children) => {
            out.push_str("<div>\n");
            for child in children {
                render_element(child, out);
            }
            out.push_str("</div>\n");
        }
        Element::Rollup(rollup) => {
            let _ = writeln!(out, "{}", rollup_html(rollup));
        }
    }
}

/// The paragraph summarising a section's priority levels.
pub fn rollup_html(rollup: &Rollup) -> String {
    format!(
        "<p class=\"rollup\"><span style=\"background: #{}; display: inline-block; width: 0.8em; \
         height: 0.8em; margin-inline: 0.25em; vertical-align: -5%;\"></span>{} — {}.</p>",
        rollup.worst.paint(),
        rollup.worst.human(),
        rollup.report()
    )
}

fn permalink(id: &str) -> String {
    format!(
        "<a ref=\"bookmark\" href=\"#{}\" class=\"permalink\" title=\"Permalink\" aria-label=\"Permalink\"></a>",
        escape_html(id)
    )
}

fn link_html(link: &Link) -> String {
    match link {
        Link::Issue(m) => format!(
            "<a class=\"issue\" href=\"https://github.com/{}/issues/{}\">{}#{}</a>",
            escape_html(&m.repo),
            escape_html(&m.num),
            escape_html(&m.repo),
            escape_html(&m.num)
        ),
        Link::Pull(m) => format!(
            "<a class=\"pull\" href=\"https://github.com/{}/pull/{}\">{}#{}</a>",
            escape_html(&m.repo),
            escape_html(&m.num),
            escape_html(&m.repo),
            escape_html(&m.num)
        ),
        Link::Workaround(m) => format!(
            "<a class=\"workaround\" href=\"{}\">{}</a>",
            escape_html(&m.dest),
            escape_html(m.note.as_deref().unwrap_or(&m.dest))
        ),
    }
}

/// Bilingual text as language-tagged spans; plain when both agree.
pub fn babel_html(text: &Babel) -> String {
    if text.en == text.zh_hans {
        escape_html(&text.en)
    } else {
        format!(
            "<span lang=\"en\">{}</span><span lang=\"zh-Hans\">{}</span>",
            escape_html(&text.en),
            escape_html(&text.zh_hans)
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
