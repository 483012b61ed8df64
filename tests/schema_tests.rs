use std::sync::Arc;

use brrtkit::openapi;
use brrtkit::schema::{
    Column, Declarations, FieldType, Model, ModelRegistry, ModelSchema, SchemaError, Value,
};
use serde_json::json;

mod common;

fn user_schema() -> Arc<ModelSchema> {
    Arc::new(
        ModelSchema::new("User")
            .prefix("app")
            .column(Column::new("id", FieldType::key()).primary_key(true))
            .column(Column::new("email", FieldType::email()).nullable(false))
            .column(
                Column::new("nick", FieldType::string())
                    .min_length(3)
                    .max_length(8)
                    .default("guest"),
            )
            .column(Column::new("settings", FieldType::json())),
    )
}

#[test]
fn test_not_nullable_reported_first() {
    let schema = Arc::new(
        ModelSchema::new("Strict").column(
            Column::new("code", FieldType::integer())
                .nullable(false)
                .required(true)
                .min_length(2),
        ),
    );
    let model = Model::with_values(schema, [("other", Value::from(1))]);
    assert_eq!(
        model.errors().get("code").map(String::as_str),
        Some("The value null does not match the field format.")
    );
}

#[test]
fn test_construction_applies_defaults_and_validates() {
    let user = Model::with_values(user_schema(), [("email", Value::from("a@b.io"))]);
    assert!(!user.has_errors(), "{:?}", user.errors());
    assert_eq!(user.get("nick"), Some(Value::from("guest")));
    assert_eq!(user.collection(), "app_user");

    let user = Model::with_values(
        user_schema(),
        [("email", Value::from("a@b.io")), ("nick", Value::from("xy"))],
    );
    assert_eq!(
        user.errors()["nick"],
        "The length of the value xy is less than 3"
    );
    // A failing column reads as null.
    assert_eq!(user.get("nick"), Some(Value::Null));
}

#[test]
fn test_set_revalidates_and_rejects_unknown_columns() {
    let mut user = Model::with_values(user_schema(), [("email", Value::from("a@b.io"))]);
    user.set("nick", "far-too-long").unwrap();
    assert!(user.has_errors());
    user.set("nick", "okay").unwrap();
    assert!(!user.has_errors());

    let err = user.set("age", 3).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownColumn { ref column, .. } if column == "age"));
}

#[test]
fn test_json_column_round_trip() {
    let ft = FieldType::json();
    let original = Value::from(json!({"theme": "dark", "tabs": [1, 2]}));
    let wire = ft.serialize(&original);
    assert!(matches!(wire, Value::Str(_)));
    assert_eq!(ft.deserialize(&wire).unwrap(), original);

    let user = Model::with_values(
        user_schema(),
        [
            ("email", Value::from("a@b.io")),
            ("settings", original.clone()),
        ],
    );
    let settings = user.to_json()["settings"].clone();
    assert_eq!(settings, json!(r#"{"tabs":[1,2],"theme":"dark"}"#));
}

#[test]
fn test_round_trip_for_plain_types() {
    let cases = [
        (FieldType::boolean(), Value::from(true)),
        (FieldType::integer(), Value::from(7)),
        (FieldType::float(), Value::from(2.5)),
        (FieldType::string(), Value::from("text")),
        (FieldType::binary(), Value::from(vec![0u8, 1, 2])),
        (FieldType::list_any(), Value::from(json!([1, "a"]))),
        (FieldType::date(), Value::from("2024-01-31")),
    ];
    for (ft, value) in cases {
        assert_eq!(ft.deserialize(&ft.serialize(&value)).unwrap(), value, "{ft:?}");
    }
}

#[test]
fn test_schema_dump_is_stable() {
    let schema = user_schema();
    let first = schema.dump();
    assert_eq!(first, schema.dump());
    let props = first["User"]["properties"].as_object().unwrap();
    assert_eq!(props.len(), 4);
    assert_eq!(props["email"]["format"], "email");
    assert_eq!(props["id"]["type"], "big_integer");
    assert_eq!(props["id"]["primaryKey"], true);
    assert_eq!(props["nick"]["default"], "guest");
}

#[test]
fn test_instance_dump_carries_values_and_errors() {
    let user = Model::with_values(
        user_schema(),
        [("email", Value::from(5)), ("nick", Value::from("neo"))],
    );
    let dump = user.dump();
    let props = &dump["User"]["properties"];
    assert_eq!(props["nick"]["value"], "neo");
    assert_eq!(props["nick"]["error"], json!(null));
    assert_eq!(props["email"]["error"], "The value email=5 is not a string");
}

#[test]
fn test_declarations_from_file_feed_openapi() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::temp_files::write(
        &dir,
        "models.yaml",
        r#"
models:
  - name: Order
    collection: orders
    columns:
      - name: id
        type: uuid4
      - name: total
        type: numeric
        precision: 10
        scale: 2
      - name: state
        type: enum
        enum: [open, paid]
security: [api_key]
"#,
    );
    let decls = Declarations::from_file(&path).unwrap();
    let registry = ModelRegistry::new();
    decls.register_into(&registry).unwrap();

    let components = openapi::components(&registry, &decls.security_schemes());
    let order = &components["schemas"]["Order"]["properties"];
    assert_eq!(order["state"]["type"], "string");
    assert_eq!(order["id"]["type"], "uuid4");
    assert_eq!(components["securitySchemes"]["ApiKeyAuth"]["in"], "header");
    assert_eq!(registry.schema("Order").unwrap().collection_name(), "orders");

    assert!(matches!(
        Declarations::from_yaml("models: 3"),
        Err(SchemaError::Declaration(_))
    ));
}
