use std::io::Write as _;

use brrtkit::schema::{Collection, Column, FieldType, Model, ModelSchema, ValidationError};
use brrtkit::server::{Body, Envelope, Request, Response, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE};
use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

fn body_json(resp: &Response) -> Value {
    serde_json::from_slice(&resp.body_bytes().unwrap()).unwrap()
}

fn pet_schema() -> Arc<ModelSchema> {
    Arc::new(
        ModelSchema::new("Pet")
            .column(Column::new("id", FieldType::integer()))
            .column(Column::new("name", FieldType::string())),
    )
}

#[test]
fn test_envelopes_match_published_schema() {
    let ok = jsonschema::validator_for(&Response::schema(200, None)).unwrap();
    let fail = jsonschema::validator_for(&Response::schema(404, None)).unwrap();

    let samples = [
        Body::from(json!({"a": 1})),
        Body::from(json!([1, 2, 3])),
        Body::map([("nested", Body::map([("ok", true)]))]),
        Body::List(vec![Body::from("x"), Body::from(2)]),
    ];
    for body in samples {
        let resp = Response::ok(body.clone());
        assert!(ok.is_valid(&body_json(&resp)), "200 envelope for {body:?}");
        let resp = Response::new(404).with_body(body.clone());
        assert!(fail.is_valid(&body_json(&resp)), "404 envelope for {body:?}");
    }

    // Unknown labels and a missing status are rejected.
    let bad = json!({"status": "WHATEVER", "data": 1});
    assert!(!ok.is_valid(&bad));
    assert!(!ok.is_valid(&json!({"data": 1})));
}

#[test]
fn test_schema_with_model_child() {
    let child = json!({
        "type": "object",
        "required": ["id", "name"],
        "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
    });
    let validator = jsonschema::validator_for(&Response::schema(200, Some(child))).unwrap();

    let pet = Model::with_values(pet_schema(), [("id", 1000.into()), ("name", "Rex".into())]);
    assert!(validator.is_valid(&body_json(&Response::ok(pet))));

    let resp = Response::ok(json!({"id": "not a number", "name": "Rex"}));
    assert!(!validator.is_valid(&body_json(&resp)));
}

#[test]
fn test_model_and_collection_bodies() {
    let schema = pet_schema();
    let rex = Model::with_values(Arc::clone(&schema), [("id", 1000.into()), ("name", "Rex".into())]);
    let tom = Model::with_values(Arc::clone(&schema), [("id", 1001.into()), ("name", "Tom".into())]);

    let resp = Response::ok(rex.clone());
    assert_eq!(
        body_json(&resp),
        json!({"status": "SUCCESS", "data": {"id": 1000, "name": "Rex"}})
    );

    let resp = Response::ok(Collection::from(vec![rex, tom])).with_envelope(Envelope::Plain);
    assert_eq!(
        body_json(&resp),
        json!([{"id": 1000, "name": "Rex"}, {"id": 1001, "name": "Tom"}])
    );
}

#[test]
fn test_detailed_envelope_keeps_body_and_errors() {
    let resp = Response::new(200)
        .with_body(json!({"id": 1}))
        .with_errors(vec![ValidationError::new("name", "missing")])
        .with_envelope(Envelope::Detailed);
    assert_eq!(
        body_json(&resp),
        json!({
            "status": "SUCCESS",
            "body": {"id": 1},
            "errors": [{"field": "name", "message": "missing"}]
        })
    );
}

#[test]
fn test_finalize_output_and_wire_format() {
    let resp = Response::ok(json!({"a": 1})).with_header("X-Trace", "abc");
    let out = resp.finalize().unwrap();
    assert_eq!(out.status_line, "200 OK");
    assert_eq!(out.get_header("content-type"), Some(JSON_CONTENT_TYPE));

    let mut wire = Vec::new();
    out.write_to(&mut wire).unwrap();
    wire.flush().unwrap();
    let text = String::from_utf8(wire).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("X-Trace: abc\r\n"));
    assert!(text.ends_with("\r\n\r\n{\"status\":\"SUCCESS\",\"data\":{\"a\":1}}"));
}

#[test]
fn test_file_response_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.html");
    std::fs::write(&path, "<h1>hi</h1>").unwrap();

    let out = Response::file(&path, None).finalize().unwrap();
    assert_eq!(out.body, b"<h1>hi</h1>");
    assert_eq!(out.get_header("content-type"), Some("text/html"));

    let err = Response::file(dir.path().join("gone.html"), None)
        .finalize()
        .unwrap_err();
    assert_eq!(err.status, 404);
}

#[test]
fn test_json_request_and_plain_text() {
    let req = Request::from_parts(
        Method::POST,
        "/items?x=1",
        [("Content-Type", "application/json")],
        br#"{"k": "v"}"#.to_vec(),
    );
    assert_eq!(req.json, Some(json!({"k": "v"})));

    let out = Response::ok("saved").for_request(&req).finalize().unwrap();
    assert_eq!(out.get_header("content-type"), Some(JSON_CONTENT_TYPE));
    assert_eq!(out.text(), "saved");

    let out = Response::ok("saved").finalize().unwrap();
    assert_eq!(out.get_header("content-type"), Some(HTML_CONTENT_TYPE));
}
