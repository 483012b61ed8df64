//! Response construction.
//!
//! A [`Response`] holds a loosely typed [`Body`] and turns it into bytes plus a
//! header set when finalized. JSON bodies are normalized depth first and
//! wrapped in the configured [`Envelope`]; everything else is written as is.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use super::output::{single_line, Output};
use super::request::{HeaderVec, Request};
use crate::error::HttpError;
use crate::schema::{Collection, Model, ValidationError};
use crate::static_files::guess_type;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Default `Server` header value.
pub const SERVER_NAME: &str = concat!("brrtkit ", env!("CARGO_PKG_VERSION"));

/// Canonical reason phrase for `status`, empty when unknown.
pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Envelope label for a status code.
pub fn status_label(status: u16) -> &'static str {
    match status {
        200 => "SUCCESS",
        403 => "ACCESS DENIED",
        500 => "ERROR",
        418 => "TEAPOT",
        422 => "UNPROCESSABLE ENTITY",
        _ => "FAIL",
    }
}

/// Every label [`status_label`] can produce.
pub const STATUS_LABELS: [&str; 6] = [
    "SUCCESS",
    "FAIL",
    "ERROR",
    "ACCESS DENIED",
    "TEAPOT",
    "UNPROCESSABLE ENTITY",
];

/// Shape of serialized JSON bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `{status, data}` on 200, `{status, error}` otherwise
    #[default]
    Standard,
    /// `{status, body, errors}` for every status
    Detailed,
    /// The normalized body, unwrapped
    Plain,
}

impl Envelope {
    /// Lenient parse; unknown values fall back to `Standard`.
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Envelope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Envelope::Standard),
            "detailed" => Ok(Envelope::Detailed),
            "plain" => Ok(Envelope::Plain),
            other => Err(format!("unknown envelope '{other}'")),
        }
    }
}

/// How a body is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Text,
    Raw,
    Json,
}

/// Response body in any of the shapes a handler may produce.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Number(serde_json::Number),
    /// Ordered mapping
    Map(Vec<(String, Body)>),
    List(Vec<Body>),
    Json(Json),
    Model(Box<Model>),
    Collection(Collection),
}

impl Body {
    /// Ordered mapping from `(key, value)` pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Body>,
    {
        Body::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn body_type(&self) -> BodyType {
        match self {
            Body::Empty | Body::Text(_) => BodyType::Text,
            Body::Bytes(_) | Body::Bool(_) | Body::Number(_) => BodyType::Raw,
            Body::Map(_) | Body::List(_) | Body::Json(_) | Body::Model(_) | Body::Collection(_) => {
                BodyType::Json
            }
        }
    }

    /// Empty, empty text, or an empty mapping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(s) => s.is_empty(),
            Body::Map(m) => m.is_empty(),
            Body::Json(Json::Null) => true,
            Body::Json(Json::Object(m)) => m.is_empty(),
            _ => false,
        }
    }

    /// JSON tree of this body. Models and collections project through
    /// `to_json`, nested bytes become base64 strings.
    #[must_use]
    pub fn normalize(&self) -> Json {
        match self {
            Body::Empty => Json::Null,
            Body::Text(s) => Json::String(s.clone()),
            Body::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
            Body::Bool(b) => Json::Bool(*b),
            Body::Number(n) => Json::Number(n.clone()),
            Body::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.normalize()))
                    .collect(),
            ),
            Body::List(items) => Json::Array(items.iter().map(Body::normalize).collect()),
            Body::Json(v) => v.clone(),
            Body::Model(m) => m.to_json(),
            Body::Collection(c) => c.to_json(),
        }
    }

    /// Bytes of a non-JSON body.
    fn raw_bytes(&self) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Text(s) => s.as_bytes().to_vec(),
            Body::Bytes(b) => b.clone(),
            Body::Bool(true) => b"true".to_vec(),
            Body::Bool(false) => b"false".to_vec(),
            Body::Number(n) => n.to_string().into_bytes(),
            other => other.normalize().to_string().into_bytes(),
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b)
    }
}

impl From<bool> for Body {
    fn from(b: bool) -> Self {
        Body::Bool(b)
    }
}

impl From<i64> for Body {
    fn from(n: i64) -> Self {
        Body::Number(n.into())
    }
}

impl From<i32> for Body {
    fn from(n: i32) -> Self {
        Body::Number(n.into())
    }
}

impl From<f64> for Body {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Body::Number)
            .unwrap_or(Body::Empty)
    }
}

impl From<Json> for Body {
    fn from(v: Json) -> Self {
        Body::Json(v)
    }
}

impl From<Model> for Body {
    fn from(m: Model) -> Self {
        Body::Model(Box::new(m))
    }
}

impl From<Collection> for Body {
    fn from(c: Collection) -> Self {
        Body::Collection(c)
    }
}

impl From<Vec<Body>> for Body {
    fn from(items: Vec<Body>) -> Self {
        Body::List(items)
    }
}

impl From<Vec<ValidationError>> for Body {
    fn from(errors: Vec<ValidationError>) -> Self {
        Body::Json(json!(errors))
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a> {
    status: &'a str,
    data: &'a Json,
}

#[derive(Serialize)]
struct FailureEnvelope<'a> {
    status: &'a str,
    error: &'a Json,
}

#[derive(Serialize)]
struct DetailedEnvelope<'a> {
    status: &'a str,
    body: &'a Json,
    errors: &'a Json,
}

/// HTTP response under construction.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    reason: Option<String>,
    body: Body,
    errors: Body,
    file: Option<PathBuf>,
    headers: HeaderVec,
    json_request: bool,
    envelope: Envelope,
    server: Arc<str>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
            body: Body::Empty,
            errors: Body::Empty,
            file: None,
            headers: HeaderVec::new(),
            json_request: false,
            envelope: Envelope::Standard,
            server: Arc::from(SERVER_NAME),
        }
    }

    /// 200 response carrying `body`.
    pub fn ok(body: impl Into<Body>) -> Self {
        Self::new(200).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: impl Into<Body>) -> Self {
        self.errors = errors.into();
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        self.reason = Some(single_line(&reason).into_owned());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value.into());
        self
    }

    #[must_use]
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    #[must_use]
    pub fn with_server(mut self, server: &str) -> Self {
        self.server = Arc::from(server);
        self
    }

    /// Bind the originating request; a request that declares JSON forces a
    /// JSON content type.
    #[must_use]
    pub fn for_request(mut self, request: &Request) -> Self {
        self.json_request = request.is_json();
        self
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .unwrap_or_else(|| status_reason(self.status))
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    #[must_use]
    pub fn errors(&self) -> &Body {
        &self.errors
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    #[must_use]
    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Caller-supplied headers, before assembly.
    #[must_use]
    pub fn raw_headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive, last write wins). Line
    /// breaks in the name or value become spaces.
    pub fn set_header(&mut self, name: &str, value: String) {
        let name = single_line(name);
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        let value = if value.contains(['\r', '\n']) {
            single_line(&value).into_owned()
        } else {
            value
        };
        self.headers.push((Arc::from(name.as_ref()), value));
    }

    /// Body if present, otherwise the errors payload.
    fn payload(&self) -> &Body {
        if self.body.is_empty() {
            &self.errors
        } else {
            &self.body
        }
    }

    #[must_use]
    pub fn body_type(&self) -> BodyType {
        self.payload().body_type()
    }

    /// Serialized body bytes.
    pub fn body_bytes(&self) -> Result<Vec<u8>, HttpError> {
        let payload = self.payload();
        if payload.body_type() != BodyType::Json {
            return Ok(payload.raw_bytes());
        }

        let label = status_label(self.status);
        let encoded = match self.envelope {
            Envelope::Standard => {
                let data = payload.normalize();
                if self.status == 200 {
                    serde_json::to_vec(&SuccessEnvelope {
                        status: label,
                        data: &data,
                    })
                } else {
                    serde_json::to_vec(&FailureEnvelope {
                        status: label,
                        error: &data,
                    })
                }
            }
            Envelope::Detailed => serde_json::to_vec(&DetailedEnvelope {
                status: label,
                body: &self.body.normalize(),
                errors: &self.errors.normalize(),
            }),
            Envelope::Plain => serde_json::to_vec(&payload.normalize()),
        };
        encoded.map_err(|e| {
            HttpError::internal(format!("failed to encode response body: {e}"), Vec::new())
        })
    }

    /// Final header set.
    ///
    /// Caller-supplied `Content-Length`/`Content-Type` are dropped and
    /// recomputed; a `Server` header is always present.
    pub fn headers(&self) -> Result<HeaderVec, HttpError> {
        let mut out: HeaderVec = self
            .headers
            .iter()
            .filter(|(k, _)| {
                !k.eq_ignore_ascii_case("content-length") && !k.eq_ignore_ascii_case("content-type")
            })
            .cloned()
            .collect();

        let content_type = if self.json_request || self.body_type() == BodyType::Json {
            JSON_CONTENT_TYPE
        } else {
            HTML_CONTENT_TYPE
        };

        if let Some(file) = &self.file {
            let (mime, encoding) = guess_type(file);
            out.push((Arc::from("Content-Type"), mime.to_string()));
            if let Some(encoding) = encoding {
                out.push((Arc::from("Content-Encoding"), encoding.to_string()));
            }
        } else if !self.payload().is_empty() {
            let len = self.body_bytes()?.len();
            out.push((Arc::from("Content-Length"), len.to_string()));
            out.push((Arc::from("Content-Type"), content_type.to_string()));
        }

        out.push((Arc::from("Server"), self.server.to_string()));

        if !out.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
            out.push((Arc::from("Content-Type"), HTML_CONTENT_TYPE.to_string()));
        }
        Ok(out)
    }

    /// Status line without the protocol, e.g. `404 Not Found`.
    #[must_use]
    pub fn http_status(&self) -> String {
        format!("{} {}", self.status, self.reason())
    }

    /// Produce the transport-facing output.
    ///
    /// File responses stream the file bytes: a `Bytes` body is taken as the
    /// already-read content, otherwise the file is read here.
    pub fn finalize(&self) -> Result<Output, HttpError> {
        let headers = self.headers()?;
        let body = match (&self.file, &self.body) {
            (Some(_), Body::Bytes(bytes)) => bytes.clone(),
            (Some(path), _) => std::fs::read(path).map_err(|_| HttpError::not_found())?,
            (None, _) => self.body_bytes()?,
        };
        Ok(Output {
            status: self.status,
            status_line: self.http_status(),
            headers,
            body,
        })
    }

    /// 200 response serving `path`.
    pub fn file(path: impl Into<PathBuf>, headers: Option<HeaderVec>) -> Self {
        let mut resp = Self::new(200);
        if let Some(headers) = headers {
            resp.headers = headers;
        }
        resp.file = Some(path.into());
        resp
    }

    /// Redirect to `location` (307 unless `status` is given).
    pub fn redirect(location: &str, status: Option<u16>, reason: Option<&str>) -> Self {
        let resp = Self::new(status.unwrap_or(307)).with_header("Location", location);
        match reason {
            Some(reason) => resp.with_reason(reason),
            None => resp,
        }
    }

    /// Error for a handler to propagate.
    ///
    /// With field errors this is a `Multi` error carrying them, otherwise an
    /// `Application` error. The reason defaults to the canonical phrase.
    pub fn abort(status: u16, errors: Option<Vec<ValidationError>>, reason: Option<&str>) -> HttpError {
        let reason = reason.unwrap_or_else(|| status_reason(status)).to_string();
        match errors {
            Some(errors) => HttpError::multi(status, reason, errors),
            None => HttpError::new(status, reason),
        }
    }

    pub fn not_found(reason: Option<&str>) -> Self {
        let resp = Self::new(404);
        match reason {
            Some(reason) => resp.with_reason(reason),
            None => resp,
        }
    }

    /// JSON Schema of the standard envelope for `status`.
    ///
    /// `child` describes the payload; by default any JSON value is accepted.
    pub fn schema(status: u16, child: Option<Json>) -> Json {
        let child = child.unwrap_or_else(|| {
            json!({
                "oneOf": [
                    {"type": "object"},
                    {"type": "string"},
                    {"type": "number"},
                    {"type": "array"},
                    {"type": "boolean"},
                    {"type": "null"},
                ]
            })
        });
        let status_prop = json!({"type": "string", "enum": STATUS_LABELS});
        if status == 200 {
            json!({
                "type": "object",
                "required": ["status"],
                "properties": {
                    "status": status_prop,
                    "data": child,
                },
            })
        } else {
            json!({
                "type": "object",
                "required": ["status"],
                "properties": {
                    "status": status_prop,
                    "error": child,
                    "errors": {
                        "type": "object",
                        "additionalProperties": {"type": "string"},
                    },
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn header<'a>(headers: &'a HeaderVec, name: &str) -> Vec<&'a str> {
        headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_success_envelope() {
        let resp = Response::ok(json!({"a": 1}));
        assert_eq!(
            String::from_utf8(resp.body_bytes().unwrap()).unwrap(),
            r#"{"status":"SUCCESS","data":{"a":1}}"#
        );
    }

    #[test]
    fn test_failure_envelope() {
        let resp = Response::new(500).with_body(json!({"a": 1}));
        assert_eq!(
            String::from_utf8(resp.body_bytes().unwrap()).unwrap(),
            r#"{"status":"ERROR","error":{"a":1}}"#
        );
        let resp = Response::new(418).with_body(Body::map([("x", 1)]));
        assert!(String::from_utf8(resp.body_bytes().unwrap())
            .unwrap()
            .starts_with(r#"{"status":"TEAPOT""#));
    }

    #[test]
    fn test_detailed_envelope() {
        let resp = Response::new(422)
            .with_body(json!({"id": 1}))
            .with_errors(json!({"name": "missing"}))
            .with_envelope(Envelope::Detailed);
        assert_eq!(
            String::from_utf8(resp.body_bytes().unwrap()).unwrap(),
            r#"{"status":"UNPROCESSABLE ENTITY","body":{"id":1},"errors":{"name":"missing"}}"#
        );
    }

    #[test]
    fn test_errors_used_when_body_empty() {
        let resp = Response::new(400).with_errors(json!({"f": "bad"}));
        assert_eq!(resp.body_type(), BodyType::Json);
        assert_eq!(
            String::from_utf8(resp.body_bytes().unwrap()).unwrap(),
            r#"{"status":"FAIL","error":{"f":"bad"}}"#
        );
    }

    #[test]
    fn test_scalars_written_raw() {
        assert_eq!(Response::ok(true).body_bytes().unwrap(), b"true");
        assert_eq!(Response::ok(42).body_bytes().unwrap(), b"42");
        assert_eq!(Response::ok("hi").body_bytes().unwrap(), b"hi");
        assert_eq!(Response::ok("hi").body_type(), BodyType::Text);
        assert_eq!(Response::ok(vec![1u8, 2]).body_type(), BodyType::Raw);
    }

    #[test]
    fn test_nested_bytes_become_base64() {
        let resp = Response::ok(Body::map([("blob", Body::Bytes(b"hi".to_vec()))]))
            .with_envelope(Envelope::Plain);
        assert_eq!(resp.body_bytes().unwrap(), br#"{"blob":"aGk="}"#);
    }

    #[test]
    fn test_header_exclusivity() {
        let resp = Response::ok("hello")
            .with_header("content-type", "text/plain")
            .with_header("Content-Length", "999")
            .with_header("X-Trace", "1");
        let headers = resp.headers().unwrap();
        assert_eq!(header(&headers, "content-type"), [HTML_CONTENT_TYPE]);
        assert_eq!(header(&headers, "content-length"), ["5"]);
        assert_eq!(header(&headers, "x-trace"), ["1"]);
        assert_eq!(header(&headers, "server"), [SERVER_NAME]);
    }

    #[test]
    fn test_json_request_forces_json_content_type() {
        let req = Request::new(Method::POST, "/").with_header("Content-Type", "application/json");
        let resp = Response::ok("plain").for_request(&req);
        assert_eq!(
            header(&resp.headers().unwrap(), "content-type"),
            [JSON_CONTENT_TYPE]
        );
    }

    #[test]
    fn test_empty_body_gets_fallback_content_type() {
        let headers = Response::new(204).headers().unwrap();
        assert_eq!(header(&headers, "content-type"), [HTML_CONTENT_TYPE]);
        assert!(header(&headers, "content-length").is_empty());
    }

    #[test]
    fn test_file_headers() {
        let resp = Response::file("site/archive.tar.gz", None);
        let headers = resp.headers().unwrap();
        assert_eq!(header(&headers, "content-type"), ["application/x-tar"]);
        assert_eq!(header(&headers, "content-encoding"), ["gzip"]);
        assert!(header(&headers, "content-length").is_empty());

        let headers = Response::file("blob.unknownext", None).headers().unwrap();
        assert_eq!(
            header(&headers, "content-type"),
            ["application/octet-stream"]
        );
    }

    #[test]
    fn test_redirect_and_not_found() {
        let resp = Response::redirect("/login", None, None);
        assert_eq!(resp.status(), 307);
        assert_eq!(resp.get_header("location"), Some("/login"));
        assert_eq!(resp.http_status(), "307 Temporary Redirect");

        let resp = Response::not_found(None);
        assert_eq!(resp.http_status(), "404 Not Found");
        let resp = Response::not_found(Some("Nothing here"));
        assert_eq!(resp.http_status(), "404 Nothing here");
    }

    #[test]
    fn test_abort_kinds() {
        let err = Response::abort(409, None, None);
        assert_eq!(err.status, 409);
        assert_eq!(err.reason, "Conflict");
        assert_eq!(err.kind, crate::error::ErrorKind::Application);

        let err = Response::abort(
            422,
            Some(vec![ValidationError::new("name", "required")]),
            Some("Invalid input"),
        );
        assert_eq!(err.kind, crate::error::ErrorKind::Multi);
        assert_eq!(err.reason, "Invalid input");
    }

    #[test]
    fn test_reason_and_headers_cannot_inject_lines() {
        let out = Response::new(400)
            .with_reason("Bad\r\nSet-Cookie: pwned=1")
            .with_header("X-Note", "a\nb")
            .finalize()
            .unwrap();
        assert_eq!(out.status_line, "400 Bad  Set-Cookie: pwned=1");
        assert_eq!(out.get_header("x-note"), Some("a b"));
        let wire = String::from_utf8(out.to_bytes()).unwrap();
        assert!(!wire.contains("\r\nSet-Cookie"));

        let err = Response::abort(422, None, Some("Invalid\r\nX-Evil: 1"));
        assert_eq!(err.reason, "Invalid  X-Evil: 1");
        let err = crate::error::HttpError::new(409, "line\nbreak");
        assert_eq!(err.reason, "line break");
    }

    #[test]
    fn test_envelope_parse() {
        assert_eq!(Envelope::parse("Detailed"), Envelope::Detailed);
        assert_eq!(Envelope::parse("plain"), Envelope::Plain);
        assert_eq!(Envelope::parse("bogus"), Envelope::Standard);
    }
}
