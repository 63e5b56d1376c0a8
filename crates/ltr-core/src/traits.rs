//! Core traits defining the interfaces to external collaborators.

use async_trait::async_trait;

use crate::error::{RenderError, Result};
use crate::types::{Includes, ModelRecord, TemplateParams};

/// Template language used for query templates.
pub const DEFAULT_TEMPLATE_LANG: &str = "mustache";

/// Opening delimiter marking a template placeholder.
pub const TEMPLATE_OPEN_DELIMITER: &str = "{{";

/// Trained model storage.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Fetch a trained model record by id.
    ///
    /// Fails with `ModelNotFound` when no such model exists.
    async fn get_trained_model(&self, model_id: &str, includes: Includes) -> Result<ModelRecord>;
}

/// Loads trained scoring models for execution.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Loaded model handle.
    type Model: Send + Sync;

    /// Load a model usable for learning to rank.
    async fn get_model_for_learning_to_rank(&self, model_id: &str) -> Result<Self::Model>;
}

/// Options passed to template compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateOptions {
    /// Fail rendering when a referenced parameter is absent.
    pub detect_missing_params: bool,
}

impl TemplateOptions {
    /// Options with missing-parameter detection enabled.
    pub fn strict() -> Self {
        Self {
            detect_missing_params: true,
        }
    }
}

/// Template capability.
pub trait TemplateEngine: Send + Sync {
    /// Whether templates in `lang` can be compiled.
    fn supports_language(&self, lang: &str) -> bool;

    /// Compile template source.
    fn compile(
        &self,
        source: &str,
        lang: &str,
        options: &TemplateOptions,
    ) -> std::result::Result<Box<dyn CompiledTemplate>, RenderError>;
}

/// A compiled template, renderable any number of times.
pub trait CompiledTemplate: Send + Sync {
    /// Render the template against the given parameters.
    fn render(&self, params: &TemplateParams) -> std::result::Result<String, RenderError>;
}
