//! Global pre-request and post-response hooks.

mod core;
mod logging;

pub use core::{AfterFn, BeforeFn, Middleware};
pub use logging::AccessLog;
