//! Learning-to-rank service: storage lookup, config validation and
//! template resolution.

use std::sync::Arc;

use tracing::{debug, info};

use ltr_core::{
    Includes, LtrError, ModelLoader, ModelStore, RankingConfig, Result, TemplateEngine,
    TemplateParams, TemplateSettings,
};

use crate::resolver::RankingConfigResolver;

/// Resolves ranking configs of stored models.
///
/// Retry, caching and timeouts belong to the store and loader.
pub struct LearnToRankService<S, L, T> {
    /// Trained model storage.
    store: Arc<S>,

    /// Scoring model loader.
    loader: Arc<L>,

    /// Template resolver.
    resolver: RankingConfigResolver<T>,
}

impl<S, L, T> LearnToRankService<S, L, T>
where
    S: ModelStore,
    L: ModelLoader,
    T: TemplateEngine,
{
    /// Create a new service using the default template language.
    pub fn new(store: Arc<S>, loader: Arc<L>, engine: Arc<T>) -> Self {
        Self {
            store,
            loader,
            resolver: RankingConfigResolver::new(engine),
        }
    }

    /// Create a new service from template settings.
    pub fn with_settings(
        store: Arc<S>,
        loader: Arc<L>,
        engine: Arc<T>,
        settings: &TemplateSettings,
    ) -> Self {
        Self {
            store,
            loader,
            resolver: RankingConfigResolver::with_lang(engine, settings.lang.clone()),
        }
    }

    /// Get the template resolver.
    pub fn resolver(&self) -> &RankingConfigResolver<T> {
        &self.resolver
    }

    /// Load a scoring model for learning to rank.
    pub async fn load_model(&self, model_id: &str) -> Result<L::Model> {
        self.loader.get_model_for_learning_to_rank(model_id).await
    }

    /// Load the ranking config of `model_id` and apply template params to it.
    pub async fn resolve_config(
        &self,
        model_id: &str,
        params: &TemplateParams,
    ) -> Result<RankingConfig> {
        info!("Resolving ranking config for model {}", model_id);

        let record = self.store.get_trained_model(model_id, Includes::all()).await?;
        let actual = record.inference_config_name();

        let config = record
            .inference_config
            .and_then(|config| config.into_learning_to_rank())
            .ok_or_else(|| LtrError::IncorrectInferenceConfigType {
                actual: actual.to_string(),
                expected: RankingConfig::NAME.to_string(),
            })?;

        config.validate()?;

        debug!(
            "Model {} has {} feature extractor(s)",
            model_id,
            config.feature_extractors().len()
        );

        self.resolver.apply(config, params)
    }
}
