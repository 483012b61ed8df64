use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value as Json};

use super::column::{Column, ColumnState};
use super::value::Value;
use super::{SchemaError, ValidationError};

/// Ordered set of columns describing one record type.
///
/// Built once, then shared behind an `Arc` by every instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    name: String,
    prefix: Option<String>,
    collection: Option<String>,
    columns: Vec<Column>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            collection: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Declare a column. A column with the same name is replaced in place,
    /// keeping its original position.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(slot) => *slot = column,
            None => self.columns.push(column),
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Storage collection name: explicit override or lower-cased model name,
    /// prefixed with `prefix_` when a prefix is set.
    #[must_use]
    pub fn collection_name(&self) -> String {
        let base = self
            .collection
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase());
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}_{base}"),
            _ => base,
        }
    }

    fn dump_with(&self, states: Option<&[ColumnState]>) -> Json {
        let mut properties = Map::new();
        for (i, column) in self.columns.iter().enumerate() {
            let state = states.and_then(|s| s.get(i));
            properties.extend(column.dump(state));
        }
        let mut out = Map::new();
        out.insert(
            self.name.clone(),
            json!({ "type": "object", "properties": properties }),
        );
        Json::Object(out)
    }

    /// `{Name: {type: "object", properties}}` with every column at its default.
    #[must_use]
    pub fn dump(&self) -> Json {
        self.dump_with(None)
    }
}

/// One record instance of a [`ModelSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    schema: Arc<ModelSchema>,
    name: Option<String>,
    collection: String,
    states: Vec<ColumnState>,
}

impl Model {
    /// Instance with every column at its default. Nothing is validated.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        let states = schema.columns.iter().map(ColumnState::initial).collect();
        let collection = schema.collection_name();
        Self {
            schema,
            name: None,
            collection,
            states,
        }
    }

    /// Instance built from `values`.
    ///
    /// With at least one value supplied, every column is set to the supplied
    /// value (or its default when absent or null) and validated immediately.
    /// Keys that name no column are ignored. With no values this is
    /// [`Model::new`].
    pub fn with_values<I, K>(schema: Arc<ModelSchema>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values: BTreeMap<String, Value> =
            values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut model = Self::new(schema);
        if values.is_empty() {
            return model;
        }
        let schema = Arc::clone(&model.schema);
        for (column, state) in schema.columns.iter().zip(model.states.iter_mut()) {
            let value = values
                .get(&column.name)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| column.default.clone());
            state.assign(column, value);
        }
        model
    }

    /// Instance built from a JSON object in wire form, the inverse of
    /// [`Model::to_json`]. Anything other than an object is treated as an
    /// empty value set.
    ///
    /// String values are passed through their column's
    /// [`FieldType::deserialize`](super::FieldType::deserialize); values that
    /// are already structured are taken as is. A string that fails to
    /// deserialize is kept and recorded as that column's error.
    pub fn from_json(schema: Arc<ModelSchema>, json: &Json) -> Self {
        let Json::Object(map) = json else {
            return Self::new(schema);
        };
        let mut failures = Vec::new();
        let values: Vec<(String, Value)> = map
            .iter()
            .map(|(key, raw)| {
                let value = Value::from(raw.clone());
                let Some(column) = schema.get_column(key).filter(|_| value.as_str().is_some())
                else {
                    return (key.clone(), value);
                };
                match column.field_type.deserialize(&value) {
                    Ok(decoded) => (key.clone(), decoded),
                    Err(e) => {
                        failures.push(ValidationError::new(key.clone(), e.message));
                        (key.clone(), value)
                    }
                }
            })
            .collect();

        let mut model = Self::with_values(Arc::clone(&schema), values);
        for failure in failures {
            if let Some(idx) = schema.position(&failure.field) {
                model.states[idx].error = Some(failure);
            }
        }
        model
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Assign and validate one column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let idx = self
            .schema
            .position(column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                model: self.schema.name.clone(),
                column: column.to_string(),
            })?;
        self.states[idx].assign(&self.schema.columns[idx], value.into());
        Ok(())
    }

    /// Read a column: null while it carries an error, else value-or-default.
    /// `None` when no such column exists.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<Value> {
        let idx = self.schema.position(column)?;
        let state = &self.states[idx];
        if state.has_error() {
            return Some(Value::Null);
        }
        Some(self.schema.columns[idx].value_or_default(&state.value).clone())
    }

    #[must_use]
    pub fn state(&self, column: &str) -> Option<&ColumnState> {
        self.schema.position(column).map(|i| &self.states[i])
    }

    /// Column name to error message for every failing column.
    #[must_use]
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.schema
            .columns
            .iter()
            .zip(&self.states)
            .filter_map(|(c, s)| s.error.as_ref().map(|e| (c.name.clone(), e.message.clone())))
            .collect()
    }

    /// Failing columns in declaration order.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        self.states.iter().filter_map(|s| s.error.clone()).collect()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.states.iter().any(ColumnState::has_error)
    }

    /// Object schema carrying this instance's values and errors.
    #[must_use]
    pub fn dump(&self) -> Json {
        self.schema.dump_with(Some(&self.states))
    }

    /// Flat map of column name to serialized value.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .schema
            .columns
            .iter()
            .zip(&self.states)
            .map(|(c, s)| (c.name.clone(), c.field_type.serialize(&s.value).to_json()))
            .collect();
        Json::Object(map)
    }
}

/// Ordered list of model instances, serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection(Vec<Model>);

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, model: Model) {
        self.0.push(model);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.0.iter()
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Array(self.0.iter().map(Model::to_json).collect())
    }
}

impl FromIterator<Model> for Collection {
    fn from_iter<T: IntoIterator<Item = Model>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Model>> for Collection {
    fn from(models: Vec<Model>) -> Self {
        Self(models)
    }
}
