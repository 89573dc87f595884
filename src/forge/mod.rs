//! forge
//!
//! Read access to the issue tracker holding the cited issues and pull
//! requests.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for fetching upstream state.
//! Commands use the [`create_forge`] factory function rather than
//! constructing transports directly.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and state types
//! - [`github`]: GitHub implementation over GraphQL
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Backend selection and creation

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{
    create_forge, create_forge_with_env, token_from_env, valid_backend_names, GithubBackend,
    TOKEN_ENV_VARS,
};
pub use traits::*;
