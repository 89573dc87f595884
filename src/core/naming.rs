//! core::naming
//!
//! Stable anchor identifiers for document elements.
//!
//! # Rules
//!
//! An element that already carries an id keeps it. Otherwise an id is derived
//! from its text:
//!
//! 1. Trim, lowercase (unless suppressed), NFD-normalize and drop combining
//!    marks (U+0300..U+036F)
//! 2. Collapse each run of non-word characters to a single `-`
//! 3. Strip leading and trailing `-`
//! 4. Empty results become [`FALLBACK_ID`]
//! 5. Prefix `x` when the id ends with `.` or does not start with a letter
//!
//! Ids are unique per document: a taken id gets the lowest free `-N` suffix.
//!
//! # Example
//!
//! ```
//! use clreq_tools::core::naming::IdRegistry;
//!
//! let mut ids = IdRegistry::new();
//! assert_eq!(ids.add_id(None, None, "Line Breaking", false), "line-breaking");
//! assert_eq!(ids.add_id(None, None, "Line breaking", false), "line-breaking-0");
//! assert_eq!(ids.add_id(None, None, "2. Punctuation", false), "x2-punctuation");
//! ```

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Id used when nothing usable can be derived from the text.
pub const FALLBACK_ID: &str = "generatedID";

/// Registry of ids taken in one document.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    taken: HashSet<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with ids that already exist in the document.
    pub fn with_existing<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }

    /// Return `existing` if set, otherwise derive and reserve a unique id.
    ///
    /// `prefix` is joined as `prefix-id`; `no_lowercase` keeps the case of
    /// `text`.
    pub fn add_id(
        &mut self,
        existing: Option<&str>,
        prefix: Option<&str>,
        text: &str,
        no_lowercase: bool,
    ) -> String {
        if let Some(id) = existing.filter(|id| !id.is_empty()) {
            self.taken.insert(id.to_string());
            return id.to_string();
        }

        let prefix = prefix.filter(|p| !p.is_empty());
        let mut id = derive_id(text, no_lowercase);

        if id.is_empty() {
            id = FALLBACK_ID.to_string();
        } else if id.ends_with('.') || !starts_with_letter(prefix.unwrap_or(&id)) {
            id = format!("x{}", id);
        }
        if let Some(prefix) = prefix {
            id = format!("{}-{}", prefix, id);
        }

        if self.taken.contains(&id) {
            let mut n = 0usize;
            while self.taken.contains(&format!("{}-{}", id, n)) {
                n += 1;
            }
            id = format!("{}-{}", id, n);
        }

        self.taken.insert(id.clone());
        id
    }
}

/// Derive the base id from text, without uniqueness or escaping.
pub fn derive_id(text: &str, no_lowercase: bool) -> String {
    let text = text.trim();
    let text = if no_lowercase {
        text.to_string()
    } else {
        text.to_lowercase()
    };

    let mut id = String::with_capacity(text.len());
    let mut in_gap = false;
    for c in text.nfd().filter(|c| !('\u{0300}'..='\u{036f}').contains(c)) {
        if is_word_char(c) {
            id.push(c);
            in_gap = false;
        } else if !in_gap {
            id.push('-');
            in_gap = true;
        }
    }

    id.trim_matches('-').to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn starts_with_letter(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_basic() {
        assert_eq!(derive_id("Hello World", false), "hello-world");
        assert_eq!(derive_id("  Line   breaking  ", false), "line-breaking");
        assert_eq!(derive_id("a--b__c", false), "a-b__c");
    }

    #[test]
    fn derive_strips_diacritics() {
        assert_eq!(derive_id("Café Crème", false), "cafe-creme");
    }

    #[test]
    fn derive_drops_non_ascii_words() {
        assert_eq!(derive_id("Punctuation 标点符号", false), "punctuation");
        assert_eq!(derive_id("标点", false), "");
    }

    #[test]
    fn derive_keeps_case_when_asked() {
        assert_eq!(derive_id("CJK Layout", true), "CJK-Layout");
    }

    #[test]
    fn existing_id_wins() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.add_id(Some("intro"), None, "Whatever", false), "intro");
        assert!(ids.contains("intro"));
    }

    #[test]
    fn empty_falls_back() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.add_id(None, None, "目录", false), FALLBACK_ID);
        assert_eq!(ids.add_id(None, None, "", false), "generatedID-0");
    }

    #[test]
    fn escapes_non_letter_start() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.add_id(None, None, "3.1 Fonts", false), "x3-1-fonts");
        assert_eq!(ids.add_id(None, None, "_private", false), "x_private");
    }

    #[test]
    fn prefix_decides_escaping() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.add_id(None, Some("sec"), "1 Intro", false), "sec-1-intro");
    }

    #[test]
    fn collisions_take_lowest_free_suffix() {
        let mut ids = IdRegistry::with_existing(["fonts", "fonts-0"]);
        assert_eq!(ids.add_id(None, None, "Fonts", false), "fonts-1");
        assert_eq!(ids.add_id(None, None, "Fonts", false), "fonts-2");
        assert_eq!(ids.len(), 4);
    }
}
