use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::HttpError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::ParamVec;

/// Maximum inline headers/cookies before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header/cookie storage. Names are shared `Arc<str>`, values are per request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Route bound to a request once an itinerary resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Name of the itinerary that matched
    pub itinerary: Arc<str>,
    /// Name of the matched route's handler
    pub handler_name: Arc<str>,
    /// Declared path pattern (e.g. `/users/{id}`)
    pub pattern: Arc<str>,
}

/// Incoming request as seen by the pipeline.
///
/// Built by the transport adapter. Carries parsed headers, cookies, query
/// parameters and an optional JSON body, plus the slots the pipeline fills in
/// while processing (route, path params) and the exception slot a transport
/// uses to flag a malformed request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Path without query string
    pub path: String,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Cookies parsed from the Cookie header
    pub cookies: HeaderVec,
    pub query_params: ParamVec,
    /// Filled in when a route matches
    pub path_params: ParamVec,
    /// Raw request body
    pub body: Vec<u8>,
    /// Body parsed as JSON (if it parses)
    pub json: Option<Value>,
    pub route: Option<RouteInfo>,
    /// Transport-level failure; the pipeline goes straight to the error path
    pub exception: Option<HttpError>,
}

impl Request {
    /// Request for `target` (path with optional query string), no headers, no body.
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/").to_string();
        Self {
            request_id: RequestId::new(),
            method,
            path,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            query_params: parse_query_params(target),
            path_params: ParamVec::new(),
            body: Vec::new(),
            json: None,
            route: None,
            exception: None,
        }
    }

    /// Assemble a request from transport-level parts.
    ///
    /// Header names are lower-cased, cookies and query parameters parsed, the
    /// request id taken from `x-request-id` when it holds a valid ULID, and the
    /// body parsed as JSON when non-empty.
    pub fn from_parts<I, K, V>(method: Method, target: &str, headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut req = Self::new(method, target);
        for (name, value) in headers {
            req.headers
                .push((Arc::from(name.as_ref().to_ascii_lowercase()), value.into()));
        }
        req.cookies = parse_cookies(&req.headers);
        req.request_id = RequestId::from_header_or_new(req.get_header(REQUEST_ID_HEADER));
        req.set_body(body);

        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            header_count = req.headers.len(),
            cookie_count = req.cookies.len(),
            query_count = req.query_params.len(),
            json_body = req.json.is_some(),
            "Request assembled"
        );
        req
    }

    /// Builder-style header insertion (last write wins).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| k.as_ref() != name);
        self.headers.push((Arc::from(name.as_str()), value.into()));
        if name == "cookie" {
            self.cookies = parse_cookies(&self.headers);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(body.into());
        self
    }

    /// Replace the raw body and re-parse the JSON view.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.json = if body.is_empty() {
            None
        } else {
            serde_json::from_slice(&body).ok()
        };
        self.body = body;
    }

    /// Flag the request as malformed.
    pub fn set_exception(&mut self, error: HttpError) {
        self.exception = Some(error);
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// True when the request declares a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false)
    }
}

/// Parse the `cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HeaderVec) -> HeaderVec {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        .map(|(_, c)| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((Arc::from(name), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a request target
///
/// Everything after the first `?` is form-urldecoded.
pub fn parse_query_params(target: &str) -> ParamVec {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}
