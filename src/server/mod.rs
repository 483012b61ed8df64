//! # Server Module
//!
//! Transport-facing types: the [`Request`] the pipeline consumes, the
//! [`Response`] it builds, and the [`Output`] it hands back. Reading bytes off
//! a socket belongs to the transport adapter, not to this crate.

pub mod output;
pub mod request;
pub mod response;

pub use output::Output;
pub use request::{parse_cookies, parse_query_params, HeaderVec, Request, RouteInfo, MAX_INLINE_HEADERS};
pub use response::{
    status_label, status_reason, Body, BodyType, Envelope, Response, HTML_CONTENT_TYPE,
    JSON_CONTENT_TYPE, SERVER_NAME, STATUS_LABELS,
};
