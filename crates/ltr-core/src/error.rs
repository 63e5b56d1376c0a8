//! Error types for ranking config resolution.

use thiserror::Error;

/// Result type alias using LtrError.
pub type Result<T> = std::result::Result<T, LtrError>;

/// Errors that can occur while loading or resolving a ranking config.
#[derive(Error, Debug)]
pub enum LtrError {
    /// Trained model not found in storage.
    #[error("Model not found: {model_id}")]
    ModelNotFound { model_id: String },

    /// The stored model's inference config is not of the expected kind.
    #[error("Inference config type [{actual}] is incorrect, expected [{expected}]")]
    IncorrectInferenceConfigType { actual: String, expected: String },

    /// A feature extractor failed validation.
    #[error("Invalid feature extractor [{feature_name}]: {reason}")]
    InvalidFeatureExtractor {
        feature_name: String,
        reason: String,
    },

    /// Two feature extractors share the same feature name.
    #[error("Duplicate feature name: {feature_name}")]
    DuplicateFeatureName { feature_name: String },

    /// A query document is not a valid query.
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Template rendering failed for reasons other than a missing parameter.
    #[error("Failed to render query template for feature [{feature_name}]: {message}")]
    TemplateRender {
        feature_name: String,
        message: String,
    },

    /// Model storage error.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Model loading error.
    #[error("Failed to load model [{model_id}]: {message}")]
    ModelLoad { model_id: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl LtrError {
    /// Create an invalid feature extractor error.
    pub fn invalid_extractor(feature_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFeatureExtractor {
            feature_name: feature_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid query error.
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Create a template render error.
    pub fn template_render(feature_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            feature_name: feature_name.into(),
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a model loading error.
    pub fn model_load(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Get the stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::IncorrectInferenceConfigType { .. } => "INCORRECT_INFERENCE_CONFIG_TYPE",
            Self::InvalidFeatureExtractor { .. } => "INVALID_FEATURE_EXTRACTOR",
            Self::DuplicateFeatureName { .. } => "DUPLICATE_FEATURE_NAME",
            Self::InvalidQuery { .. } => "INVALID_QUERY",
            Self::TemplateRender { .. } => "TEMPLATE_RENDER_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::ModelLoad { .. } => "MODEL_LOAD_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether the error was caused by the caller's input rather than a system fault.
    ///
    /// Client errors are surfaced verbatim and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::IncorrectInferenceConfigType { .. }
                | Self::InvalidFeatureExtractor { .. }
                | Self::DuplicateFeatureName { .. }
                | Self::InvalidQuery { .. }
        )
    }
}

/// Failure returned by a template capability.
///
/// `MissingParameter` is the one condition callers recover from; everything
/// else is reported as `Other`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The template references a parameter that was not supplied.
    #[error("Missing template parameter: {name}")]
    MissingParameter { name: String },

    /// Compilation or execution failed.
    #[error("{message}")]
    Other { message: String },
}

impl RenderError {
    /// Create a missing parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create a generic render error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LtrError::IncorrectInferenceConfigType {
            actual: "regression".to_string(),
            expected: "learning_to_rank".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("regression"));
        assert!(message.contains("learning_to_rank"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LtrError::ModelNotFound {
                model_id: "x".to_string()
            }
            .error_code(),
            "MODEL_NOT_FOUND"
        );
        assert_eq!(
            LtrError::template_render("f1", "boom").error_code(),
            "TEMPLATE_RENDER_ERROR"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(LtrError::invalid_extractor("f1", "empty query").is_client_error());
        assert!(LtrError::DuplicateFeatureName {
            feature_name: "f1".to_string()
        }
        .is_client_error());
        assert!(!LtrError::storage("disk full").is_client_error());
        assert!(!LtrError::template_render("f1", "bad template").is_client_error());
    }

    #[test]
    fn test_render_error_variants() {
        assert_eq!(
            RenderError::missing("q"),
            RenderError::MissingParameter {
                name: "q".to_string()
            }
        );
        assert_eq!(RenderError::other("unclosed tag").to_string(), "unclosed tag");
    }
}
