//! Core domain types for ranking config resolution.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{LtrError, Result};
use crate::query::QueryProvider;

/// Runtime parameters substituted into query templates.
pub type TemplateParams = HashMap<String, serde_json::Value>;

/// Feature extractor that scores a document by executing a query against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExtractor {
    /// Feature name (unique within a ranking config).
    pub feature_name: String,

    /// Query to execute, possibly templated.
    pub query: QueryProvider,

    /// Score used when the query does not match.
    #[serde(default)]
    pub default_score: f32,
}

impl QueryExtractor {
    /// Create a new query extractor with a zero default score.
    pub fn new(feature_name: impl Into<String>, query: QueryProvider) -> Self {
        Self {
            feature_name: feature_name.into(),
            query,
            default_score: 0.0,
        }
    }

    /// Copy this extractor with a different query.
    pub fn with_query(&self, query: QueryProvider) -> Self {
        Self {
            feature_name: self.feature_name.clone(),
            query,
            default_score: self.default_score,
        }
    }

    /// Validate the extractor.
    pub fn validate(&self) -> Result<()> {
        validate_feature_name(&self.feature_name)?;
        if !self.default_score.is_finite() {
            return Err(LtrError::invalid_extractor(
                &self.feature_name,
                "default score must be finite",
            ));
        }
        Ok(())
    }
}

/// Feature extractor that reads a numeric document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValueExtractor {
    /// Feature name (unique within a ranking config).
    pub feature_name: String,

    /// Field to read.
    pub field: String,

    /// Value used when the field is absent.
    #[serde(default)]
    pub missing: Option<f64>,
}

impl FieldValueExtractor {
    /// Validate the extractor.
    pub fn validate(&self) -> Result<()> {
        validate_feature_name(&self.feature_name)?;
        if self.field.trim().is_empty() {
            return Err(LtrError::invalid_extractor(
                &self.feature_name,
                "field must not be empty",
            ));
        }
        Ok(())
    }
}

fn validate_feature_name(feature_name: &str) -> Result<()> {
    if feature_name.trim().is_empty() {
        return Err(LtrError::invalid_extractor(
            feature_name,
            "feature name must not be empty",
        ));
    }
    Ok(())
}

/// A unit of feature computation.
///
/// Only query extractors take part in templating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureExtractor {
    QueryExtractor(QueryExtractor),
    FieldValue(FieldValueExtractor),
}

impl FeatureExtractor {
    /// Get the feature name.
    pub fn feature_name(&self) -> &str {
        match self {
            Self::QueryExtractor(extractor) => &extractor.feature_name,
            Self::FieldValue(extractor) => &extractor.feature_name,
        }
    }

    /// Validate the extractor according to its kind.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::QueryExtractor(extractor) => extractor.validate(),
            Self::FieldValue(extractor) => extractor.validate(),
        }
    }

    /// Narrow to a query extractor.
    pub fn as_query_extractor(&self) -> Option<&QueryExtractor> {
        match self {
            Self::QueryExtractor(extractor) => Some(extractor),
            _ => None,
        }
    }
}

impl From<QueryExtractor> for FeatureExtractor {
    fn from(extractor: QueryExtractor) -> Self {
        Self::QueryExtractor(extractor)
    }
}

impl From<FieldValueExtractor> for FeatureExtractor {
    fn from(extractor: FieldValueExtractor) -> Self {
        Self::FieldValue(extractor)
    }
}

/// Feature extractors used to compute ranking signals for a trained model.
///
/// Never mutated in place: a resolved config is a fresh copy built with
/// [`RankingConfig::with_feature_extractors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    feature_extractors: Vec<FeatureExtractor>,

    #[serde(default)]
    num_top_feature_importance_values: u32,
}

impl RankingConfig {
    /// Inference config name of ranking configs.
    pub const NAME: &'static str = "learning_to_rank";

    /// Create a ranking config, rejecting duplicate feature names.
    pub fn new(feature_extractors: Vec<FeatureExtractor>) -> Result<Self> {
        let config = Self {
            feature_extractors,
            num_top_feature_importance_values: 0,
        };
        config.check_unique_names()?;
        Ok(config)
    }

    /// Set the number of top feature importance values to report.
    pub fn with_num_top_feature_importance_values(mut self, value: u32) -> Self {
        self.num_top_feature_importance_values = value;
        self
    }

    /// Copy this config, replacing its feature extractors.
    pub fn with_feature_extractors(&self, feature_extractors: Vec<FeatureExtractor>) -> Self {
        Self {
            feature_extractors,
            num_top_feature_importance_values: self.num_top_feature_importance_values,
        }
    }

    /// Get the feature extractors in order.
    pub fn feature_extractors(&self) -> &[FeatureExtractor] {
        &self.feature_extractors
    }

    /// Get the number of top feature importance values.
    pub fn num_top_feature_importance_values(&self) -> u32 {
        self.num_top_feature_importance_values
    }

    /// Get the feature names in order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.feature_extractors
            .iter()
            .map(FeatureExtractor::feature_name)
            .collect()
    }

    /// Validate every extractor, then feature name uniqueness.
    pub fn validate(&self) -> Result<()> {
        for extractor in &self.feature_extractors {
            extractor.validate()?;
        }
        self.check_unique_names()
    }

    fn check_unique_names(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.feature_extractors.len());
        for name in self.feature_names() {
            if !seen.insert(name) {
                return Err(LtrError::DuplicateFeatureName {
                    feature_name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Regression inference config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    #[serde(default = "default_results_field")]
    pub results_field: String,
}

/// Classification inference config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_results_field")]
    pub results_field: String,

    #[serde(default)]
    pub num_top_classes: u32,
}

fn default_results_field() -> String {
    "predicted_value".to_string()
}

/// Inference config embedded in a trained model record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceConfig {
    LearningToRank(RankingConfig),
    Regression(RegressionConfig),
    Classification(ClassificationConfig),
}

impl InferenceConfig {
    /// Get the config kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LearningToRank(_) => RankingConfig::NAME,
            Self::Regression(_) => "regression",
            Self::Classification(_) => "classification",
        }
    }

    /// Narrow to a ranking config.
    pub fn as_learning_to_rank(&self) -> Option<&RankingConfig> {
        match self {
            Self::LearningToRank(config) => Some(config),
            _ => None,
        }
    }

    /// Narrow to a ranking config, taking ownership.
    pub fn into_learning_to_rank(self) -> Option<RankingConfig> {
        match self {
            Self::LearningToRank(config) => Some(config),
            _ => None,
        }
    }
}

/// A stored trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Model identifier.
    pub model_id: String,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// Inference config, if any.
    #[serde(default)]
    pub inference_config: Option<InferenceConfig>,

    /// Opaque scoring model definition.
    #[serde(default)]
    pub definition: Option<serde_json::Value>,
}

impl ModelRecord {
    /// Create a record with the given inference config.
    pub fn new(model_id: impl Into<String>, inference_config: InferenceConfig) -> Self {
        Self {
            model_id: model_id.into(),
            description: None,
            inference_config: Some(inference_config),
            definition: None,
        }
    }

    /// Name of the inference config kind, `"null"` when absent.
    pub fn inference_config_name(&self) -> &'static str {
        self.inference_config
            .as_ref()
            .map(InferenceConfig::name)
            .unwrap_or("null")
    }
}

/// Which optional parts of a model record to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Includes {
    /// Include the scoring model definition.
    pub definition: bool,
}

impl Includes {
    /// Include everything.
    pub fn all() -> Self {
        Self { definition: true }
    }

    /// Include only the record's config.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_extractor(name: &str, query: serde_json::Value) -> FeatureExtractor {
        QueryExtractor::new(name, QueryProvider::from_literal_query(query).unwrap()).into()
    }

    #[test]
    fn test_ranking_config_rejects_duplicates() {
        let err = RankingConfig::new(vec![
            query_extractor("f1", json!({"match_all": {}})),
            query_extractor("f1", json!({"match_none": {}})),
        ])
        .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_FEATURE_NAME");
    }

    #[test]
    fn test_with_feature_extractors_keeps_other_fields() {
        let config = RankingConfig::new(vec![query_extractor("f1", json!({"match_all": {}}))])
            .unwrap()
            .with_num_top_feature_importance_values(3);

        let replaced =
            config.with_feature_extractors(vec![query_extractor("f2", json!({"match_none": {}}))]);

        assert_eq!(replaced.num_top_feature_importance_values(), 3);
        assert_eq!(replaced.feature_names(), vec!["f2"]);
        assert_eq!(config.feature_names(), vec!["f1"]);
    }

    #[test]
    fn test_extractor_validation() {
        assert!(query_extractor("", json!({"match_all": {}})).validate().is_err());

        let field = FeatureExtractor::FieldValue(FieldValueExtractor {
            feature_name: "popularity".to_string(),
            field: " ".to_string(),
            missing: None,
        });
        let err = field.validate().unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_inference_config_serde() {
        let record: ModelRecord = serde_json::from_value(json!({
            "model_id": "ltr-model",
            "inference_config": {
                "learning_to_rank": {
                    "feature_extractors": [
                        {"query_extractor": {"feature_name": "f1", "query": {"match": {"title": "{{q}}"}}}},
                        {"field_value": {"feature_name": "f2", "field": "popularity"}}
                    ]
                }
            }
        }))
        .unwrap();

        assert_eq!(record.inference_config_name(), "learning_to_rank");
        let config = record
            .inference_config
            .as_ref()
            .and_then(InferenceConfig::as_learning_to_rank)
            .unwrap();
        assert_eq!(config.feature_names(), vec!["f1", "f2"]);
        assert!(config.feature_extractors()[0].as_query_extractor().is_some());
        assert!(config.feature_extractors()[1].as_query_extractor().is_none());
    }

    #[test]
    fn test_inference_config_name() {
        let record = ModelRecord::new(
            "regressor",
            InferenceConfig::Regression(RegressionConfig {
                results_field: "y".to_string(),
            }),
        );
        assert_eq!(record.inference_config_name(), "regression");
        assert!(record
            .inference_config
            .as_ref()
            .and_then(InferenceConfig::as_learning_to_rank)
            .is_none());

        let empty = ModelRecord {
            inference_config: None,
            ..record
        };
        assert_eq!(empty.inference_config_name(), "null");
    }
}
