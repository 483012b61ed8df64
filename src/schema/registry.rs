use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use super::model::{Model, ModelSchema};
use super::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("model '{0}' is already registered")]
    Duplicate(String),
    #[error("model '{0}' is not registered")]
    UnknownModel(String),
}

/// `(schema name, instance name)` identifying a shared instance.
pub type InstanceKey = (String, Option<String>);

struct Slot {
    seq: u64,
    model: Arc<Model>,
}

/// Registry of declared schemas and named model instances.
///
/// Owned by the application and handed to handlers through the dispatch
/// context; there is no process-global instance. Instance creation is an
/// atomic insert-if-absent: the first call for a key constructs and validates
/// the model, every later call returns the same `Arc` untouched.
#[derive(Default)]
pub struct ModelRegistry {
    schemas: DashMap<String, Arc<ModelSchema>>,
    instances: DashMap<InstanceKey, Slot>,
    seq: AtomicU64,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema to the catalog. Names are unique.
    pub fn register(&self, schema: ModelSchema) -> Result<Arc<ModelSchema>, RegistryError> {
        match self.schemas.entry(schema.name().to_string()) {
            Entry::Occupied(e) => Err(RegistryError::Duplicate(e.key().clone())),
            Entry::Vacant(e) => {
                let schema = Arc::new(schema);
                debug!(model = %schema.name(), columns = schema.columns().len(), "Model registered");
                e.insert(Arc::clone(&schema));
                Ok(schema)
            }
        }
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.schemas.get(name).map(|s| Arc::clone(s.value()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schemas sorted by name.
    #[must_use]
    pub fn schemas(&self) -> Vec<Arc<ModelSchema>> {
        let mut all: Vec<_> = self.schemas.iter().map(|s| Arc::clone(s.value())).collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Get or create the instance keyed by `(model, name)`.
    ///
    /// `values` is only used when the instance does not exist yet.
    pub fn instance<I, K>(
        &self,
        model: &str,
        name: Option<&str>,
        values: I,
    ) -> Result<Arc<Model>, RegistryError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let schema = self
            .schema(model)
            .ok_or_else(|| RegistryError::UnknownModel(model.to_string()))?;
        let key = (model.to_string(), name.map(str::to_string));
        let slot = self.instances.entry(key).or_insert_with(|| {
            let mut built = Model::with_values(schema, values);
            if let Some(n) = name {
                built = built.named(n);
            }
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            debug!(model, instance = ?name, seq, "Model instance created");
            Slot {
                seq,
                model: Arc::new(built),
            }
        });
        Ok(Arc::clone(&slot.model))
    }

    #[must_use]
    pub fn get_instance(&self, model: &str, name: Option<&str>) -> Option<Arc<Model>> {
        let key = (model.to_string(), name.map(str::to_string));
        self.instances.get(&key).map(|s| Arc::clone(&s.model))
    }

    /// Instances in the order they were first requested.
    #[must_use]
    pub fn instances(&self) -> Vec<(InstanceKey, Arc<Model>)> {
        let mut all: Vec<_> = self
            .instances
            .iter()
            .map(|e| (e.seq, e.key().clone(), Arc::clone(&e.model)))
            .collect();
        all.sort_by_key(|(seq, _, _)| *seq);
        all.into_iter().map(|(_, k, m)| (k, m)).collect()
    }

    /// Drop every instance, keeping the schema catalog.
    pub fn clear_instances(&self) {
        self.instances.clear();
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("schemas", &self.schemas.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
