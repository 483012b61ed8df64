//! OpenAPI `components` fragment for registered models.

use serde_json::{Map, Value as Json};

use crate::schema::{ModelRegistry, SecurityScheme};

/// `{"schemas": {...}, "securitySchemes": {...}}` built from every schema in
/// `registry` (sorted by name) and the given security schemes.
///
/// Later entries with the same name replace earlier ones.
pub fn components(registry: &ModelRegistry, security: &[SecurityScheme]) -> Json {
    let mut schemas = Map::new();
    for schema in registry.schemas() {
        if let Json::Object(dumped) = schema.dump() {
            schemas.extend(dumped);
        }
    }

    let mut security_schemes = Map::new();
    for scheme in security {
        security_schemes.extend(scheme.dump());
    }

    let mut out = Map::new();
    out.insert("schemas".into(), Json::Object(schemas));
    out.insert("securitySchemes".into(), Json::Object(security_schemes));
    Json::Object(out)
}
