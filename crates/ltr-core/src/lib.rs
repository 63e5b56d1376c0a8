//! ltr-core - Core types and traits for learning-to-rank config resolution
//!
//! This crate provides the ranking configuration model, the collaborator
//! traits (model storage, model loading, templating) and the error type
//! shared by the rest of the workspace.

pub mod config;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{LtrError, RenderError, Result};
pub use query::QueryProvider;
pub use traits::*;
pub use types::*;
