//! # Router Module
//!
//! Route resolution. The pipeline only knows the [`Itinerary`] trait; any
//! resolver can plug in. [`RouteTable`] is the bundled implementation:
//! `{param}` patterns compiled to anchored regexes, tried longest pattern
//! first, with method filtering, redirects, controller actions, per-table
//! hooks and status-keyed error-body transforms.

mod core;

pub use core::{Endpoint, Itinerary, ParamVec, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
