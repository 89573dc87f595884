//! core
//!
//! Core domain types, naming rules and configuration for clreq-tools.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CitationKey, Priority, Babel
//! - [`naming`] - Section id and anchor rules
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for project files
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod naming;
pub mod paths;
pub mod types;
