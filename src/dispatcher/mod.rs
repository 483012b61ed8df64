//! # Dispatcher Module
//!
//! The request pipeline. A [`Dispatcher`] takes a [`Request`](crate::server::Request)
//! through these stages and always comes back with an
//! [`Output`](crate::server::Output):
//!
//! 1. **Static mounts**: a path under a mounted prefix is served from disk
//!    before any hook runs; a missing file is a 404.
//! 2. **ResolvingHooks**: global pre-request hooks in registration order. The
//!    first non-empty [`Reply`] becomes the response.
//! 3. **ResolvingRoute**: itineraries are asked in registration order; the
//!    first match binds route and path params to the request and runs that
//!    itinerary's pre-request hooks. No match is a 404.
//! 4. **Dispatching**: the handler or controller action runs under
//!    `catch_unwind`; its [`Reply`] is coerced into a response. The
//!    itinerary's response modifier and every post-response hook follow.
//! 5. **Error**: any failure is classified into an
//!    [`HttpError`](crate::error::HttpError), handed to the error responder
//!    (or turned into a plain response), and the first itinerary with a
//!    transform for that status rewrites the body.
//!
//! ## Example
//!
//! ```rust
//! use brrtkit::dispatcher::{Dispatcher, Reply};
//! use brrtkit::router::RouteTable;
//! use brrtkit::runtime_config::PipelineConfig;
//! use brrtkit::server::Request;
//! use http::Method;
//!
//! let api = RouteTable::new("api").route(Method::GET, "/pets/{id}", "get_pet", |cx| {
//!     let id = cx.request.get_path_param("id").unwrap_or_default();
//!     Ok(Reply::from(serde_json::json!({ "id": id })))
//! });
//! let dispatcher = Dispatcher::builder(PipelineConfig::default())
//!     .itinerary(api)
//!     .build();
//!
//! let out = dispatcher.handle(Request::new(Method::GET, "/pets/7"));
//! assert_eq!(out.status, 200);
//! assert_eq!(out.text(), r#"{"status":"SUCCESS","data":{"id":"7"}}"#);
//! ```

mod core;
mod reply;

pub use core::{
    Context, Controller, Dispatcher, DispatcherBuilder, ErrorResponder, Handler, Stage,
    StaticMount,
};
pub use reply::Reply;
