//! ltr-service - Ranking config resolution
//!
//! This crate resolves the ranking config of a trained learning-to-rank
//! model: it fetches the stored config, validates its feature extractors and
//! substitutes runtime parameters into templated extractor queries.
//!
//! # Features
//!
//! - Untemplated queries pass through untouched
//! - Missing parameters degrade a single feature to a match-none query
//! - Malformed templates and unparseable rendered queries fail the request
//!
//! # Example
//!
//! ```rust,ignore
//! use ltr_service::LearnToRankService;
//! use std::sync::Arc;
//!
//! let service = LearnToRankService::new(store.clone(), store, Arc::new(MustacheEngine::new()));
//! let config = service.resolve_config("my-ltr-model", &params).await?;
//! ```

mod resolver;
mod service;

pub use resolver::RankingConfigResolver;
pub use service::LearnToRankService;

// Re-export for convenience
pub use ltr_core::{RankingConfig, TemplateParams};
