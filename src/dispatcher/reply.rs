use serde_json::{Map, Value as Json};

use crate::schema::{Collection, Model};
use crate::server::{Body, Envelope, HeaderVec, Request, Response};

/// What a handler or pre-request hook hands back.
///
/// Everything but [`Reply::Response`] is coerced into a 200 response (or the
/// tuple's status) carrying the configured envelope.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(Response),
    Text(String),
    Bytes(Vec<u8>),
    Map(Map<String, Json>),
    /// `(body, status?, headers?)`
    Tuple {
        body: Body,
        status: Option<u16>,
        headers: Option<HeaderVec>,
    },
    Other(Body),
}

impl Reply {
    /// Tuple reply with an explicit status.
    pub fn with_status(body: impl Into<Body>, status: u16) -> Self {
        Reply::Tuple {
            body: body.into(),
            status: Some(status),
            headers: None,
        }
    }

    /// `None`, empty text, empty bytes or an empty mapping. Pre-request hooks
    /// returning an empty reply do not short-circuit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::Response(_) | Reply::Tuple { .. } => false,
            Reply::Text(s) => s.is_empty(),
            Reply::Bytes(b) => b.is_empty(),
            Reply::Map(m) => m.is_empty(),
            Reply::Other(body) => body.is_empty(),
        }
    }

    /// Turn the reply into a response bound to `request`.
    #[must_use]
    pub fn into_response(self, envelope: Envelope, request: &Request) -> Response {
        let resp = match self {
            Reply::Response(resp) => return resp,
            Reply::Text(s) => Response::ok(s),
            Reply::Bytes(b) => Response::ok(b),
            Reply::Map(m) => Response::ok(Json::Object(m)),
            Reply::Tuple {
                body,
                status,
                headers,
            } => {
                let mut resp = Response::new(status.unwrap_or(200)).with_body(body);
                for (name, value) in headers.unwrap_or_default() {
                    resp.set_header(&name, value);
                }
                resp
            }
            Reply::Other(body) => Response::ok(body),
        };
        resp.with_envelope(envelope).for_request(request)
    }
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Response(r)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(b: Vec<u8>) -> Self {
        Reply::Bytes(b)
    }
}

impl From<Map<String, Json>> for Reply {
    fn from(m: Map<String, Json>) -> Self {
        Reply::Map(m)
    }
}

/// JSON objects become [`Reply::Map`], other JSON values [`Reply::Other`].
impl From<Json> for Reply {
    fn from(v: Json) -> Self {
        match v {
            Json::Object(m) => Reply::Map(m),
            other => Reply::Other(Body::Json(other)),
        }
    }
}

impl From<Model> for Reply {
    fn from(m: Model) -> Self {
        Reply::Other(m.into())
    }
}

impl From<Collection> for Reply {
    fn from(c: Collection) -> Self {
        Reply::Other(c.into())
    }
}

impl From<Body> for Reply {
    fn from(b: Body) -> Self {
        Reply::Other(b)
    }
}
