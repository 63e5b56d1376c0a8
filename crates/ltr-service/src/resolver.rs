//! Ranking config resolution: substitutes runtime parameters into templated
//! feature extractor queries.

use std::sync::Arc;

use tracing::debug;

use ltr_core::{
    CompiledTemplate, FeatureExtractor, LtrError, QueryExtractor, QueryProvider, RankingConfig,
    RenderError, Result, TemplateEngine, TemplateOptions, TemplateParams, DEFAULT_TEMPLATE_LANG,
    TEMPLATE_OPEN_DELIMITER,
};

/// Turns a ranking config with templated queries into one with literal queries.
///
/// Stateless apart from its immutable settings, so one resolver can serve
/// concurrent resolutions.
pub struct RankingConfigResolver<T> {
    /// Template capability.
    engine: Arc<T>,

    /// Template language of extractor queries.
    lang: String,

    /// Compile options, fixed at construction.
    options: TemplateOptions,
}

impl<T> RankingConfigResolver<T>
where
    T: TemplateEngine,
{
    /// Create a resolver for the default template language.
    pub fn new(engine: Arc<T>) -> Self {
        Self::with_lang(engine, DEFAULT_TEMPLATE_LANG)
    }

    /// Create a resolver for a specific template language.
    pub fn with_lang(engine: Arc<T>, lang: impl Into<String>) -> Self {
        Self {
            engine,
            lang: lang.into(),
            options: TemplateOptions::strict(),
        }
    }

    /// Template language of extractor queries.
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Apply template params to every query extractor of `config`.
    ///
    /// Extractors referencing a missing parameter fall back to a match-none
    /// query. Any other rendering failure fails the whole call. When the
    /// template language is unsupported the config is returned unchanged.
    pub fn apply(&self, config: RankingConfig, params: &TemplateParams) -> Result<RankingConfig> {
        if !self.engine.supports_language(&self.lang) {
            debug!(
                "Template language [{}] unavailable, skipping templating",
                self.lang
            );
            return Ok(config);
        }

        let feature_extractors = config
            .feature_extractors()
            .iter()
            .map(|extractor| self.apply_to_extractor(extractor, params))
            .collect::<Result<Vec<_>>>()?;

        Ok(config.with_feature_extractors(feature_extractors))
    }

    fn apply_to_extractor(
        &self,
        extractor: &FeatureExtractor,
        params: &TemplateParams,
    ) -> Result<FeatureExtractor> {
        match extractor {
            FeatureExtractor::QueryExtractor(query_extractor) => self
                .apply_to_query_extractor(query_extractor, params)
                .map(FeatureExtractor::QueryExtractor),
            other => Ok(other.clone()),
        }
    }

    fn apply_to_query_extractor(
        &self,
        extractor: &QueryExtractor,
        params: &TemplateParams,
    ) -> Result<QueryExtractor> {
        let source = extractor.query.to_text();

        // Untemplated queries are kept as-is, never round-tripped
        if !source.contains(TEMPLATE_OPEN_DELIMITER) {
            return Ok(extractor.clone());
        }

        let rendered = self
            .engine
            .compile(&source, &self.lang, &self.options)
            .and_then(|template| template.render(params));

        match rendered {
            Ok(text) => {
                let query = QueryProvider::from_parsed_text(&text).map_err(|e| {
                    LtrError::template_render(&extractor.feature_name, e.to_string())
                })?;
                debug!(
                    "Rendered query template for feature {}: {}",
                    extractor.feature_name, query
                );
                Ok(extractor.with_query(query))
            }
            Err(RenderError::MissingParameter { name }) => {
                debug!(
                    "Missing template parameter [{}] for feature {}, using match_none query",
                    name, extractor.feature_name
                );
                Ok(extractor.with_query(QueryProvider::match_none()))
            }
            Err(RenderError::Other { message }) => {
                Err(LtrError::template_render(&extractor.feature_name, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltr_core::FieldValueExtractor;
    use ltr_template::MustacheEngine;
    use serde_json::{json, Value};

    fn resolver() -> RankingConfigResolver<MustacheEngine> {
        RankingConfigResolver::new(Arc::new(MustacheEngine::new()))
    }

    fn query_extractor(name: &str, query: Value) -> FeatureExtractor {
        QueryExtractor::new(name, QueryProvider::from_literal_query(query).unwrap()).into()
    }

    fn params(value: Value) -> TemplateParams {
        serde_json::from_value(value).unwrap()
    }

    fn query_of(config: &RankingConfig, index: usize) -> &QueryProvider {
        &config.feature_extractors()[index]
            .as_query_extractor()
            .unwrap()
            .query
    }

    #[test]
    fn test_substitutes_params() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{q}}"}}))])
                .unwrap();

        let resolved = resolver().apply(config, &params(json!({"q": "shoes"}))).unwrap();

        assert_eq!(resolved.feature_names(), vec!["f1"]);
        assert_eq!(
            query_of(&resolved, 0).query(),
            &json!({"match": {"title": "shoes"}})
        );
    }

    #[test]
    fn test_missing_param_falls_back_to_match_none() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{q}}"}}))])
                .unwrap();

        let resolved = resolver().apply(config, &TemplateParams::new()).unwrap();

        assert_eq!(resolved.feature_names(), vec!["f1"]);
        assert_eq!(query_of(&resolved, 0), &QueryProvider::match_none());
    }

    #[test]
    fn test_untemplated_query_unchanged() {
        let extractor = query_extractor("f1", json!({"term": {"status": "active"}}));
        let before = extractor.as_query_extractor().unwrap().query.to_text();
        let config = RankingConfig::new(vec![extractor.clone()]).unwrap();

        let resolved = resolver().apply(config, &params(json!({"q": "x"}))).unwrap();

        assert_eq!(resolved.feature_extractors()[0], extractor);
        assert_eq!(query_of(&resolved, 0).to_text(), before);
    }

    #[test]
    fn test_mixed_extractors_keep_order() {
        let config = RankingConfig::new(vec![
            query_extractor("title", json!({"match": {"title": "{{q}}"}})),
            FieldValueExtractor {
                feature_name: "popularity".to_string(),
                field: "popularity".to_string(),
                missing: Some(0.0),
            }
            .into(),
            query_extractor("brand", json!({"term": {"brand": "{{brand}}"}})),
            query_extractor("active", json!({"term": {"status": "active"}})),
        ])
        .unwrap()
        .with_num_top_feature_importance_values(2);

        let resolved = resolver()
            .apply(config.clone(), &params(json!({"q": "boots"})))
            .unwrap();

        assert_eq!(resolved.feature_names(), config.feature_names());
        assert_eq!(resolved.num_top_feature_importance_values(), 2);
        assert_eq!(
            query_of(&resolved, 0).query(),
            &json!({"match": {"title": "boots"}})
        );
        assert_eq!(resolved.feature_extractors()[1], config.feature_extractors()[1]);
        assert!(query_of(&resolved, 2).is_match_none());
        assert_eq!(resolved.feature_extractors()[3], config.feature_extractors()[3]);
    }

    #[test]
    fn test_apply_is_idempotent_on_resolved_config() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{q}}"}}))])
                .unwrap();
        let params = params(json!({"q": "shoes"}));

        let once = resolver().apply(config, &params).unwrap();
        let twice = resolver().apply(once.clone(), &params).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_default_score_preserved() {
        let mut extractor = QueryExtractor::new(
            "f1",
            QueryProvider::from_literal_query(json!({"match": {"title": "{{q}}"}})).unwrap(),
        );
        extractor.default_score = 1.5;
        let config = RankingConfig::new(vec![extractor.into()]).unwrap();

        let resolved = resolver().apply(config, &TemplateParams::new()).unwrap();
        let resolved = resolved.feature_extractors()[0].as_query_extractor().unwrap();

        assert!(resolved.query.is_match_none());
        assert_eq!(resolved.default_score, 1.5);
    }

    #[test]
    fn test_rendered_text_must_parse() {
        // toJson inside a string literal produces invalid JSON
        let config = RankingConfig::new(vec![query_extractor(
            "f1",
            json!({"terms": {"tags": "{{#toJson}}tags{{/toJson}}"}}),
        )])
        .unwrap();

        let err = resolver()
            .apply(config, &params(json!({"tags": ["a", "b"]})))
            .unwrap_err();

        assert_eq!(err.error_code(), "TEMPLATE_RENDER_ERROR");
        assert!(err.to_string().contains("f1"));
    }

    #[test]
    fn test_malformed_template_is_fatal() {
        let config = RankingConfig::new(vec![query_extractor(
            "f1",
            json!({"match": {"title": "{{#q}}unclosed"}}),
        )])
        .unwrap();

        let err = resolver()
            .apply(config, &params(json!({"q": "x"})))
            .unwrap_err();

        assert!(matches!(err, LtrError::TemplateRender { .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_join_param_stays_one_string() {
        let config = RankingConfig::new(vec![query_extractor(
            "f1",
            json!({"query_string": {"query": "{{#join}}tags{{/join}}"}}),
        )])
        .unwrap();
        let tags = [r#"x","default_field":"secret"#, r#"say "hi""#, r"a\b"];

        let resolved = resolver()
            .apply(config, &params(json!({"tags": tags})))
            .unwrap();

        assert_eq!(
            query_of(&resolved, 0).query(),
            &json!({"query_string": {"query": tags.join(",")}})
        );
    }

    #[test]
    fn test_join_double_quoted_delimiter() {
        let config = RankingConfig::new(vec![query_extractor(
            "f1",
            json!({"query_string": {"query": "{{#join delimiter=\"|\"}}tags{{/join}}"}}),
        )])
        .unwrap();

        let resolved = resolver()
            .apply(config, &params(json!({"tags": ["a", "b"]})))
            .unwrap();

        assert_eq!(
            query_of(&resolved, 0).query(),
            &json!({"query_string": {"query": "a|b"}})
        );
    }

    #[test]
    fn test_escaped_param_cannot_add_clauses() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{q}}"}}))])
                .unwrap();
        let q = r#"x"}},"match_all":{"boost":"\"#;

        let resolved = resolver().apply(config, &params(json!({"q": q}))).unwrap();

        assert_eq!(query_of(&resolved, 0).query(), &json!({"match": {"title": q}}));
    }

    #[test]
    fn test_raw_param_breaking_document_is_fatal() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{{q}}}"}}))])
                .unwrap();

        let err = resolver()
            .apply(config, &params(json!({"q": r#"x"}}"#})))
            .unwrap_err();

        match err {
            LtrError::TemplateRender { feature_name, .. } => assert_eq!(feature_name, "f1"),
            other => panic!("unexpected error: {}", other),
        }
    }

    struct UnsupportedEngine;

    impl TemplateEngine for UnsupportedEngine {
        fn supports_language(&self, _lang: &str) -> bool {
            false
        }

        fn compile(
            &self,
            _source: &str,
            _lang: &str,
            _options: &TemplateOptions,
        ) -> std::result::Result<Box<dyn CompiledTemplate>, RenderError> {
            Err(RenderError::other("templating disabled"))
        }
    }

    #[test]
    fn test_unsupported_language_is_noop() {
        let config =
            RankingConfig::new(vec![query_extractor("f1", json!({"match": {"title": "{{q}}"}}))])
                .unwrap();

        let resolved = RankingConfigResolver::new(Arc::new(UnsupportedEngine))
            .apply(config.clone(), &TemplateParams::new())
            .unwrap();

        assert_eq!(resolved, config);
    }

    struct RecordingEngine {
        seen: std::sync::Mutex<Vec<TemplateOptions>>,
    }

    impl TemplateEngine for RecordingEngine {
        fn supports_language(&self, _lang: &str) -> bool {
            true
        }

        fn compile(
            &self,
            source: &str,
            lang: &str,
            options: &TemplateOptions,
        ) -> std::result::Result<Box<dyn CompiledTemplate>, RenderError> {
            self.seen.lock().unwrap().push(*options);
            MustacheEngine::new().compile(source, lang, options)
        }
    }

    #[test]
    fn test_compiles_with_strict_options() {
        let engine = Arc::new(RecordingEngine {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let config = RankingConfig::new(vec![
            query_extractor("f1", json!({"match": {"title": "{{q}}"}})),
            query_extractor("f2", json!({"term": {"status": "active"}})),
        ])
        .unwrap();

        RankingConfigResolver::new(engine.clone())
            .apply(config, &params(json!({"q": "x"})))
            .unwrap();

        // Only the templated query is compiled
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[TemplateOptions::strict()]);
    }
}
