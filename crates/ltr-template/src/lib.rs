//! ltr-template - Mustache query templates
//!
//! This crate provides the default template capability used to substitute
//! runtime parameters into feature extractor queries.
//!
//! # Features
//!
//! - Variables with JSON-string escaping (`{{q}}`), raw variables (`{{{q}}}`)
//! - Dotted paths and array indices (`{{user.tags.0}}`)
//! - Sections, inverted sections and comments
//! - `toJson` and `join` helpers
//! - Strict missing-parameter detection reported as a typed error
//!
//! # Example
//!
//! ```rust
//! use ltr_template::{CompiledTemplate, MustacheEngine, TemplateEngine, TemplateOptions};
//! use ltr_core::TemplateParams;
//!
//! let engine = MustacheEngine::new();
//! let template = engine
//!     .compile(r#"{"match":{"title":"{{q}}"}}"#, "mustache", &TemplateOptions::strict())
//!     .unwrap();
//!
//! let mut params = TemplateParams::new();
//! params.insert("q".to_string(), "shoes".into());
//! assert_eq!(template.render(&params).unwrap(), r#"{"match":{"title":"shoes"}}"#);
//! ```

mod mustache;
mod parser;

pub use mustache::{MustacheEngine, MustacheTemplate};

// Re-export the template traits for convenience
pub use ltr_core::{CompiledTemplate, RenderError, TemplateEngine, TemplateOptions};
