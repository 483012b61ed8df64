use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

/// Built-in security-scheme presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityKind {
    Basic,
    Bearer,
    ApiKey,
}

/// OpenAPI security-scheme declaration, dumped as `{name: {type, ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityScheme {
    name: String,
    schema: Map<String, Json>,
}

impl SecurityScheme {
    /// Arbitrary scheme of the given OpenAPI `type`.
    pub fn new(name: impl Into<String>, security_type: impl Into<String>) -> Self {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(security_type.into()));
        Self {
            name: name.into(),
            schema,
        }
    }

    /// `BasicAuth`: HTTP basic.
    pub fn basic() -> Self {
        Self::new("BasicAuth", "http").with("scheme", "basic")
    }

    /// `BearerAuth`: HTTP bearer.
    pub fn bearer() -> Self {
        Self::new("BearerAuth", "http").with("scheme", "bearer")
    }

    /// `ApiKeyAuth`: API key sent in the `X-Api-Token` header.
    pub fn api_key() -> Self {
        Self::api_key_in("header", "X-Api-Token")
    }

    pub fn api_key_in(location: &str, name: &str) -> Self {
        Self::new("ApiKeyAuth", "apiKey")
            .with("in", location)
            .with("name", name)
    }

    /// Add or overwrite one key of the fragment.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.schema.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dump(&self) -> Map<String, Json> {
        let mut out = Map::new();
        out.insert(self.name.clone(), Json::Object(self.schema.clone()));
        out
    }
}

impl From<SecurityKind> for SecurityScheme {
    fn from(kind: SecurityKind) -> Self {
        match kind {
            SecurityKind::Basic => SecurityScheme::basic(),
            SecurityKind::Bearer => SecurityScheme::bearer(),
            SecurityKind::ApiKey => SecurityScheme::api_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(
            Json::Object(SecurityScheme::basic().dump()),
            json!({"BasicAuth": {"type": "http", "scheme": "basic"}})
        );
        assert_eq!(
            Json::Object(SecurityScheme::bearer().dump()),
            json!({"BearerAuth": {"type": "http", "scheme": "bearer"}})
        );
        assert_eq!(
            Json::Object(SecurityScheme::api_key().dump()),
            json!({"ApiKeyAuth": {"type": "apiKey", "in": "header", "name": "X-Api-Token"}})
        );
    }

    #[test]
    fn test_extra_keys() {
        let s = SecurityScheme::bearer().with("bearerFormat", "JWT");
        assert_eq!(s.dump()["BearerAuth"]["bearerFormat"], "JWT");
    }
}
