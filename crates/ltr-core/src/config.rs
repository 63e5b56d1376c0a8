//! Configuration types for ranking config resolution.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::traits::DEFAULT_TEMPLATE_LANG;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LtrConfig {
    /// Template configuration.
    #[serde(default)]
    pub template: TemplateSettings,

    /// Model store configuration.
    #[serde(default)]
    pub store: StoreSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Template configuration.
///
/// Missing-parameter detection is always on and deliberately not exposed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Template language of feature extractor queries.
    #[serde(default = "default_template_lang")]
    pub lang: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            lang: default_template_lang(),
        }
    }
}

/// Model store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Path to a JSON file of model records.
    #[serde(default = "default_models_path")]
    pub models_path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            models_path: default_models_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level filter (overridden by RUST_LOG).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions

fn default_template_lang() -> String {
    DEFAULT_TEMPLATE_LANG.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_models_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ltr")
        .join("models.json")
}

impl LtrConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::error::LtrError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ltr").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("ltr.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}
