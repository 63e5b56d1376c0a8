//! Map-backed model store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use ltr_core::{
    Includes, LtrError, ModelLoader, ModelRecord, ModelStore, RankingConfig, Result,
};

/// In-memory model store.
///
/// Records are cloned out on every fetch, so callers never share state with
/// the stored copy.
#[derive(Debug, Clone, Default)]
pub struct MemoryModelStore {
    models: Arc<RwLock<HashMap<String, ModelRecord>>>,
}

/// A model loaded for learning to rank.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalModel {
    /// Model identifier.
    pub model_id: String,

    /// Opaque scoring model definition.
    pub definition: serde_json::Value,

    /// Ranking config the model was trained with.
    pub config: RankingConfig,
}

impl MemoryModelStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with records.
    pub fn from_records(records: impl IntoIterator<Item = ModelRecord>) -> Result<Self> {
        let store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Open a store from a JSON file holding an array of model records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let records: Vec<ModelRecord> = serde_json::from_str(&content)?;

        let store = Self::from_records(records)?;
        info!("Loaded {} model(s) from {:?}", store.len()?, path);
        Ok(store)
    }

    /// Insert a record, rejecting duplicate model ids.
    pub fn insert(&self, record: ModelRecord) -> Result<()> {
        let mut models = self.write()?;
        if models.contains_key(&record.model_id) {
            return Err(LtrError::storage(format!(
                "model [{}] already exists",
                record.model_id
            )));
        }
        debug!("Storing model {}", record.model_id);
        models.insert(record.model_id.clone(), record);
        Ok(())
    }

    /// List stored records, sorted by model id.
    pub fn list(&self) -> Result<Vec<ModelRecord>> {
        let mut records: Vec<ModelRecord> = self.read()?.values().cloned().collect();
        records.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(records)
    }

    /// Number of stored models.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, ModelRecord>>> {
        self.models.read().map_err(|e| LtrError::storage(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, ModelRecord>>> {
        self.models.write().map_err(|e| LtrError::storage(e.to_string()))
    }

    fn get(&self, model_id: &str) -> Result<ModelRecord> {
        self.read()?
            .get(model_id)
            .cloned()
            .ok_or_else(|| LtrError::ModelNotFound {
                model_id: model_id.to_string(),
            })
    }
}

#[async_trait]
impl ModelStore for MemoryModelStore {
    async fn get_trained_model(&self, model_id: &str, includes: Includes) -> Result<ModelRecord> {
        let mut record = self.get(model_id)?;
        if !includes.definition {
            record.definition = None;
        }
        Ok(record)
    }
}

#[async_trait]
impl ModelLoader for MemoryModelStore {
    type Model = LocalModel;

    async fn get_model_for_learning_to_rank(&self, model_id: &str) -> Result<LocalModel> {
        let record = self.get(model_id)?;
        let actual = record.inference_config_name();

        let config = record
            .inference_config
            .and_then(|config| config.into_learning_to_rank())
            .ok_or_else(|| LtrError::IncorrectInferenceConfigType {
                actual: actual.to_string(),
                expected: RankingConfig::NAME.to_string(),
            })?;

        let definition = record
            .definition
            .ok_or_else(|| LtrError::model_load(model_id, "model has no definition"))?;

        debug!("Loaded model {} for learning to rank", model_id);

        Ok(LocalModel {
            model_id: record.model_id,
            definition,
            config,
        })
    }
}
