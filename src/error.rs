//! HTTP error taxonomy.
//!
//! Handlers and hooks return `anyhow::Result`; any [`HttpError`] inside the
//! `anyhow::Error` keeps its status, reason and body when the dispatcher turns
//! it into a response. Anything else becomes a 500.

use thiserror::Error;

use crate::schema::ValidationError;
use crate::server::output::single_line;
use crate::server::{Body, Envelope, Response};

pub const NOT_FOUND_BODY: &str = "Indicates that the origin server did not find a current \
representation for the target resource or is not willing to disclose that one exists.";
pub const FORBIDDEN_BODY: &str =
    "Indicates that the server understood the request but refuses to authorize it.";
pub const TEAPOT_BODY: &str =
    "Any attempt to brew coffee with a teapot should result in the error code 418 I'm a teapot.";
pub const ATTRIBUTE_BODY: &str = "Attribute error.";
pub const INTERNAL_BODY: &str = "Internal Server Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Application,
    NotFound,
    Forbidden,
    Teapot,
    Attribute,
    /// Carries a list of field-level validation failures as its body
    Multi,
}

/// An error that maps onto an HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{status} {reason}")]
pub struct HttpError {
    pub kind: ErrorKind,
    pub status: u16,
    pub reason: String,
    pub body: Body,
}

impl HttpError {
    /// Application error with an empty body.
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self {
            kind: ErrorKind::Application,
            status,
            reason: single_line(&reason).into_owned(),
            body: Body::Empty,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn not_found() -> Self {
        Self {
            kind: ErrorKind::NotFound,
            status: 404,
            reason: "Not Found".into(),
            body: Body::Text(NOT_FOUND_BODY.into()),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            status: 403,
            reason: "Forbidden".into(),
            body: Body::Text(FORBIDDEN_BODY.into()),
        }
    }

    pub fn teapot() -> Self {
        Self {
            kind: ErrorKind::Teapot,
            status: 418,
            reason: "I'm a teapot".into(),
            body: Body::Text(TEAPOT_BODY.into()),
        }
    }

    pub fn attribute() -> Self {
        Self {
            kind: ErrorKind::Attribute,
            status: 500,
            reason: "Attribute error".into(),
            body: Body::Text(ATTRIBUTE_BODY.into()),
        }
    }

    /// Field-level failures, serialized as `[{field, message}, ...]`.
    pub fn multi(status: u16, reason: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        let reason: String = reason.into();
        Self {
            kind: ErrorKind::Multi,
            status,
            reason: single_line(&reason).into_owned(),
            body: errors.into(),
        }
    }

    /// 500 with an optional diagnostic trace. Without trace lines the body is
    /// the generic phrase. Line breaks in `reason` are flattened since it ends
    /// up in the status line.
    pub fn internal(reason: impl Into<String>, trace: Vec<String>) -> Self {
        let reason: String = reason.into();
        let body = if trace.is_empty() {
            Body::Text(INTERNAL_BODY.into())
        } else {
            Body::List(trace.into_iter().map(Body::Text).collect())
        };
        Self {
            kind: ErrorKind::Application,
            status: 500,
            reason: single_line(&reason).into_owned(),
            body,
        }
    }

    /// Plain response for this error.
    #[must_use]
    pub fn to_response(&self, envelope: Envelope) -> Response {
        Response::new(self.status)
            .with_reason(self.reason.clone())
            .with_body(self.body.clone())
            .with_envelope(envelope)
    }
}

/// Convert any `anyhow::Error` into an [`HttpError`].
///
/// An `HttpError` anywhere in the chain is kept; otherwise a 500 is built
/// from the error message, with the cause chain as trace when requested.
pub fn classify(err: &anyhow::Error, include_traces: bool) -> HttpError {
    if let Some(http) = err.chain().find_map(|e| e.downcast_ref::<HttpError>()) {
        return http.clone();
    }
    let trace = if include_traces {
        err.chain().map(ToString::to_string).collect()
    } else {
        Vec::new()
    };
    HttpError::internal(err.to_string(), trace)
}
