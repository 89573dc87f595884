//! document
//!
//! Data model of the typst document as seen through `typst query`.
//!
//! # Modules
//!
//! - [`elements`] - Headings, the element stream, and the query parser
//! - [`metadata`] - Priority annotations and issue/PR/workaround citations

pub mod elements;
pub mod metadata;

pub use elements::{label_to_id, parse_elements, Element, Heading, QueryError};
pub use metadata::{IssueMeta, Link, Metadata, PullMeta, WorkaroundMeta};
