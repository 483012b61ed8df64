//! YAML model declarations.
//!
//! ```yaml
//! models:
//!   - name: User
//!     prefix: app
//!     columns:
//!       - name: id
//!         type: key
//!         primary_key: true
//!       - name: email
//!         type: email
//!         nullable: false
//! security: [bearer, api_key]
//! ```

use std::path::Path;

use serde::Deserialize;

use super::column::Column;
use super::model::ModelSchema;
use super::registry::ModelRegistry;
use super::security::{SecurityKind, SecurityScheme};
use super::SchemaError;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDecl {
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl ModelDecl {
    /// Build the schema. Later columns with a repeated name replace earlier ones.
    #[must_use]
    pub fn into_schema(self) -> ModelSchema {
        let mut schema = ModelSchema::new(self.name);
        if let Some(prefix) = self.prefix {
            schema = schema.prefix(prefix);
        }
        if let Some(collection) = self.collection {
            schema = schema.collection(collection);
        }
        self.columns.into_iter().fold(schema, ModelSchema::column)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub models: Vec<ModelDecl>,
    #[serde(default)]
    pub security: Vec<SecurityKind>,
}

impl Declarations {
    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Register every declared model into `registry`.
    pub fn register_into(&self, registry: &ModelRegistry) -> Result<(), SchemaError> {
        for decl in &self.models {
            registry.register(decl.clone().into_schema())?;
        }
        Ok(())
    }

    #[must_use]
    pub fn security_schemes(&self) -> Vec<SecurityScheme> {
        self.security.iter().copied().map(SecurityScheme::from).collect()
    }
}
