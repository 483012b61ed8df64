//! # brrtkit
//!
//! **brrtkit** is a small web-service toolkit: a declarative model layer that
//! validates record values and publishes OpenAPI schema fragments, a response
//! layer that wraps JSON bodies in a status-labelled envelope, and a
//! synchronous request pipeline with hooks, pluggable route resolvers and an
//! error path that always ends in a response.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Field types, columns, models, the model registry and
//!   security-scheme presets
//! - **[`server`]** - [`Request`](server::Request), [`Response`](server::Response),
//!   the JSON envelope and the transport-facing [`Output`](server::Output)
//! - **[`router`]** - The [`Itinerary`](router::Itinerary) resolver trait and
//!   the bundled [`RouteTable`](router::RouteTable)
//! - **[`dispatcher`]** - The request pipeline
//! - **[`middleware`]** - Global pre-request and post-response hooks
//! - **[`error`]** - HTTP error kinds and failure classification
//! - **[`openapi`]** - `components` fragment for registered models
//! - **[`static_files`]** - Directory serving with traversal protection
//! - **[`runtime_config`]** / **[`telemetry`]** - Configuration and logging setup
//! - **[`cli`]** - The `brrtkit` command-line tool
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant M as Middleware
//!     participant I as Itinerary
//!     participant H as Handler
//!
//!     T->>D: handle(Request)
//!     D->>D: static mount?
//!     D->>M: before(request)
//!     M-->>D: Option<Reply> (non-empty short-circuits)
//!     D->>I: resolve(request)
//!     I-->>D: RouteMatch (none → 404)
//!     D->>I: before_request(request)
//!     D->>H: call (catch_unwind)
//!     H-->>D: Reply
//!     D->>I: modify_response(response)
//!     D->>M: after(request, response)
//!     D-->>T: Output
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use brrtkit::dispatcher::{Dispatcher, Reply};
//! use brrtkit::router::RouteTable;
//! use brrtkit::runtime_config::PipelineConfig;
//! use brrtkit::schema::{Column, FieldType, Model, ModelSchema, ModelRegistry};
//! use brrtkit::server::Request;
//! use http::Method;
//!
//! let models = Arc::new(ModelRegistry::new());
//! models
//!     .register(
//!         ModelSchema::new("Pet")
//!             .column(Column::new("id", FieldType::integer()))
//!             .column(Column::new("name", FieldType::string()).nullable(false)),
//!     )
//!     .unwrap();
//!
//! let api = RouteTable::new("api").route(Method::POST, "/pets", "add_pet", |cx| {
//!     let schema = cx.models.schema("Pet").expect("registered above");
//!     let body = cx.request.json.clone().unwrap_or_default();
//!     Ok(Reply::from(Model::from_json(schema, &body)))
//! });
//!
//! let dispatcher = Dispatcher::builder(PipelineConfig::default())
//!     .models(models)
//!     .itinerary(api)
//!     .build();
//!
//! let req = Request::new(Method::POST, "/pets").with_body(r#"{"id": 1000, "name": "Rex"}"#);
//! let out = dispatcher.handle(req);
//! assert_eq!(out.status, 200);
//! ```

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod runtime_config;
pub mod schema;
pub mod server;
pub mod static_files;
pub mod telemetry;

pub use dispatcher::{Dispatcher, Reply};
pub use error::{classify, ErrorKind, HttpError};
pub use router::{Itinerary, RouteTable};
pub use runtime_config::PipelineConfig;
pub use schema::{Column, FieldType, Model, ModelRegistry, ModelSchema, Value};
pub use server::{Body, Envelope, Output, Request, Response};
