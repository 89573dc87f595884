//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Priority`] - Ranked priority level annotated on document sections
//! - [`GeneralPriority`] - A priority, or the `(inherited)` sentinel
//! - [`Babel`] - Bilingual text (English and Simplified Chinese)
//! - [`CitationKey`] - `(repo, number)` pair identifying an issue or PR
//!
//! # Ordering
//!
//! [`Priority`] derives `Ord` in severity order, so `max()` over a set of
//! levels is the worst one:
//!
//! ```
//! use clreq_tools::core::types::Priority;
//!
//! let levels = [Priority::Ok, Priority::Broken, Priority::Tbd];
//! assert_eq!(levels.iter().max(), Some(&Priority::Broken));
//! assert!(Priority::Tbd < Priority::Na);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid priority level: {0}")]
    InvalidPriority(String),

    #[error("invalid citation '{0}': expected owner/name#number")]
    InvalidCitation(String),
}

/// Priority level of a section, from least to most severe.
///
/// The variant order is the "worst wins" aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// To be done
    Tbd,
    /// Not applicable
    Na,
    /// OK
    Ok,
    /// Advanced
    Advanced,
    /// Basic
    Basic,
    /// Broken
    Broken,
}

impl Priority {
    /// All levels, least severe first.
    pub const ALL: [Priority; 6] = [
        Priority::Tbd,
        Priority::Na,
        Priority::Ok,
        Priority::Advanced,
        Priority::Basic,
        Priority::Broken,
    ];

    /// Identifier used in the document and in the JSON index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Tbd => "tbd",
            Priority::Na => "na",
            Priority::Ok => "ok",
            Priority::Advanced => "advanced",
            Priority::Basic => "basic",
            Priority::Broken => "broken",
        }
    }

    /// Display colour as a hex triplet without `#`.
    pub fn paint(&self) -> &'static str {
        match self {
            Priority::Tbd => "eeeeee",
            Priority::Na | Priority::Ok => "008000",
            Priority::Advanced => "ffe4b5",
            Priority::Basic => "ffa500",
            Priority::Broken => "ff0000",
        }
    }

    /// Human-readable label.
    pub fn human(&self) -> &'static str {
        match self {
            Priority::Tbd => "To be done",
            Priority::Na => "Not applicable",
            Priority::Ok => "OK",
            Priority::Advanced => "Advanced",
            Priority::Basic => "Basic",
            Priority::Broken => "Broken",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TypeError::InvalidPriority(s.to_string()))
    }
}

/// A section's own priority, or `(inherited)` when none is annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneralPriority {
    Level(Priority),
    #[default]
    Inherited,
}

/// Serialized form of [`GeneralPriority::Inherited`].
const INHERITED: &str = "(inherited)";

impl GeneralPriority {
    /// The annotated level, if any.
    pub fn level(&self) -> Option<Priority> {
        match self {
            GeneralPriority::Level(p) => Some(*p),
            GeneralPriority::Inherited => None,
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, GeneralPriority::Inherited)
    }
}

impl fmt::Display for GeneralPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneralPriority::Level(p) => write!(f, "{}", p),
            GeneralPriority::Inherited => f.write_str(INHERITED),
        }
    }
}

impl FromStr for GeneralPriority {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == INHERITED {
            Ok(GeneralPriority::Inherited)
        } else {
            s.parse().map(GeneralPriority::Level)
        }
    }
}

impl Serialize for GeneralPriority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeneralPriority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Bilingual text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Babel {
    pub en: String,
    #[serde(rename = "zh-Hans")]
    pub zh_hans: String,
}

impl Babel {
    pub fn new(en: impl Into<String>, zh_hans: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            zh_hans: zh_hans.into(),
        }
    }

    /// The same text in both languages.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            en: text.clone(),
            zh_hans: text,
        }
    }

    /// Text as a browser would expose it through `textContent`.
    pub fn text_content(&self) -> String {
        if self.en == self.zh_hans || self.zh_hans.is_empty() {
            self.en.clone()
        } else if self.en.is_empty() {
            self.zh_hans.clone()
        } else {
            format!("{} {}", self.en, self.zh_hans)
        }
    }
}

impl fmt::Display for Babel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.en, self.zh_hans)
    }
}

/// Identifies an issue or pull request on GitHub.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CitationKey {
    /// `owner/name`
    pub repo: String,
    pub number: u64,
}

impl CitationKey {
    /// Build a key from the string fields recorded in the document.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCitation` when the repo is not
    /// `owner/name` or the number is not a positive integer.
    pub fn new(repo: &str, num: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidCitation(format!("{}#{}", repo, num));

        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {}
            _ => return Err(invalid()),
        }
        let number = num.trim().parse::<u64>().map_err(|_| invalid())?;
        if number == 0 {
            return Err(invalid());
        }

        Ok(Self {
            repo: repo.to_string(),
            number,
        })
    }

    pub fn owner(&self) -> &str {
        self.repo.split_once('/').map(|(o, _)| o).unwrap_or(&self.repo)
    }

    pub fn name(&self) -> &str {
        self.repo.split_once('/').map(|(_, n)| n).unwrap_or("")
    }
}

impl fmt::Display for CitationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}
