//! clreq-tools - Build and check the clreq document
//!
//! clreq-tools drives the typst toolchain for the clreq requirements
//! document: precompiling embedded examples, building and serving the
//! page, extracting its structure, and reconciling the GitHub issues and
//! pull requests it cites with their live state.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to modules)
//! - [`core`] - Domain types, naming rules, paths and configuration
//! - [`typst`] - Running the typst compiler and precompiling artifacts
//! - [`document`] - Typed elements queried from the document
//! - [`structure`] - Section tree, priority rollups, table of contents
//! - [`index`] - The public JSON index of sections
//! - [`forge`] - Abstraction for GitHub state lookups
//! - [`reconcile`] - Uniqueness, freshness and coverage checks
//! - [`dev`] - Watchers and local servers for development
//! - [`htmldiff`] - Post-build patch for the htmldiff service
//! - [`git`] - Build provenance
//! - [`ui`] - User-facing output
//!
//! # Invariants
//!
//! 1. Structure analysis is pure: the same elements give the same tree
//! 2. Section ids are unique within a document
//! 3. Every reconciliation check runs; none short-circuits another

pub mod cli;
pub mod core;
pub mod dev;
pub mod document;
pub mod forge;
pub mod git;
pub mod htmldiff;
pub mod index;
pub mod reconcile;
pub mod structure;
pub mod typst;
pub mod ui;
