use serde::Deserialize;
use serde_json::{json, Map, Value as Json};

use super::field::FieldType;
use super::value::Value;
use super::ValidationError;

fn default_true() -> bool {
    true
}

/// Named, constrained binding of a [`FieldType`].
///
/// A column is a descriptor only: it never holds an instance value. Values and
/// the last validation outcome live in a [`ColumnState`] owned by the model.
///
/// Columns deserialize from a flat mapping where the field type is inlined:
///
/// ```yaml
/// name: email
/// type: email
/// nullable: false
/// max_length: 120
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub example: Value,
}

impl Column {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
            required: false,
            unique: false,
            index: false,
            primary_key: false,
            default: Value::Null,
            min_length: None,
            max_length: None,
            title: None,
            description: None,
            example: Value::Null,
        }
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    #[must_use]
    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = example.into();
        self
    }

    /// Run the column rules against `value`, stopping at the first failure.
    ///
    /// Order: not-nullable, required, field type, minimum length, maximum
    /// length. Lengths are measured in characters of the value's string form.
    ///
    /// The `required` rule fails when a value *is* present. This mirrors the
    /// behaviour existing declarations were written against; see DESIGN.md.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if !self.nullable && value.is_null() {
            return Err(self.error(format!(
                "The value {value} does not match the field format."
            )));
        }
        if self.required && !value.is_null() {
            return Err(self.error("Field must have a value"));
        }
        if value.is_null() {
            return Ok(());
        }
        self.field_type.validate(value, &self.name)?;

        let text = value.to_string();
        let len = text.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(self.error(format!(
                    "The length of the value {text} is less than {min}"
                )));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(self.error(format!(
                    "The length of the value {text} is greater than {max}"
                )));
            }
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::new(self.name.clone(), message)
    }

    /// The stored value, or the column default when the stored value is null.
    #[must_use]
    pub fn value_or_default<'a>(&'a self, value: &'a Value) -> &'a Value {
        if value.is_null() {
            &self.default
        } else {
            value
        }
    }

    /// `{name: {...field dump, column attributes, value, error}}` for the given
    /// instance state. Without a state the column reports its default.
    #[must_use]
    pub fn dump(&self, state: Option<&ColumnState>) -> Map<String, Json> {
        let (value, error) = match state {
            Some(s) => (
                self.value_or_default(&s.value),
                s.error.as_ref().map(|e| e.message.clone()),
            ),
            None => (&self.default, None),
        };

        let mut body = self.field_type.dump();
        body.insert("index".into(), json!(self.index));
        body.insert("unique".into(), json!(self.unique));
        body.insert("default".into(), self.default.to_json());
        body.insert("required".into(), json!(self.required));
        body.insert("title".into(), json!(self.title));
        body.insert("description".into(), json!(self.description));
        body.insert("nullable".into(), json!(self.nullable));
        body.insert("value".into(), value.to_json());
        body.insert("primaryKey".into(), json!(self.primary_key));
        body.insert("example".into(), self.example.to_json());
        body.insert("error".into(), json!(error));

        let mut out = Map::new();
        out.insert(self.name.clone(), Json::Object(body));
        out
    }
}

/// Per-instance value and last validation outcome of one column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnState {
    pub value: Value,
    pub error: Option<ValidationError>,
}

impl ColumnState {
    /// Fresh state holding the column default, unvalidated.
    #[must_use]
    pub fn initial(column: &Column) -> Self {
        Self {
            value: column.default.clone(),
            error: None,
        }
    }

    /// Store `value` then validate it. Afterwards `error` reflects exactly
    /// this pass.
    pub fn assign(&mut self, column: &Column, value: Value) {
        self.value = value;
        self.error = column.validate(&self.value).err();
    }

    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
