//! # Schema Module
//!
//! Declares data shapes once and derives three things from the declaration:
//! runtime validation, JSON projection and OpenAPI schema fragments.
//!
//! ## Layers
//!
//! - [`FieldType`] - stateless value-shape descriptor (validation rule + type fragment)
//! - [`Column`] - a named, constrained binding of a field type
//! - [`ModelSchema`] - ordered columns describing one record type
//! - [`Model`] - one record instance; owns per-column [`ColumnState`]
//! - [`ModelRegistry`] - injected registry of schemas and named instances
//! - [`SecurityScheme`] - OpenAPI security-scheme fragments
//!
//! Validation failures never propagate out of a model. They are recorded in the
//! column state and surfaced through [`Model::errors`] and [`Model::has_errors`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtkit::schema::{Column, FieldType, Model, ModelSchema};
//!
//! let schema = Arc::new(
//!     ModelSchema::new("User")
//!         .column(Column::new("id", FieldType::key()).primary_key(true))
//!         .column(Column::new("email", FieldType::email()).nullable(false)),
//! );
//! let user = Model::with_values(schema, [("id", 1.into())]);
//! assert!(user.has_errors());
//! assert_eq!(user.collection(), "user");
//! ```

mod column;
pub mod decl;
mod field;
mod model;
mod registry;
mod security;
mod value;

pub use column::{Column, ColumnState};
pub use decl::{Declarations, ModelDecl};
pub use field::{
    DataFormat, FieldType, DEFAULT_JSON_LENGTH, DEFAULT_STRING_LENGTH, DEFAULT_TEXT_LENGTH,
};
pub use model::{Collection, Model, ModelSchema};
pub use registry::{InstanceKey, ModelRegistry, RegistryError};
pub use security::{SecurityKind, SecurityScheme};
pub use value::Value;

use serde::Serialize;
use thiserror::Error;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while declaring or addressing schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model '{model}' has no column '{column}'")]
    UnknownColumn { model: String, column: String },
    #[error("invalid model declaration: {0}")]
    Declaration(#[from] serde_yaml::Error),
    #[error("failed to read declaration file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
