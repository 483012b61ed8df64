use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::Reply;
use crate::server::{Request, Response};

/// Global pipeline hook.
///
/// `before` runs ahead of route resolution, in registration order; the first
/// non-empty reply becomes the response and nothing else runs, after hooks
/// included. `after` runs on every dispatched response, in registration
/// order, and may replace it.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &Request) -> anyhow::Result<Option<Reply>> {
        Ok(None)
    }

    fn after(&self, _req: &Request, res: Response, _latency: Duration) -> anyhow::Result<Response> {
        Ok(res)
    }
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn before(&self, req: &Request) -> anyhow::Result<Option<Reply>> {
        (**self).before(req)
    }

    fn after(&self, req: &Request, res: Response, latency: Duration) -> anyhow::Result<Response> {
        (**self).after(req, res, latency)
    }
}

/// Pre-request hook from a closure.
pub struct BeforeFn<F>(pub F);

impl<F> Middleware for BeforeFn<F>
where
    F: Fn(&Request) -> anyhow::Result<Option<Reply>> + Send + Sync,
{
    fn before(&self, req: &Request) -> anyhow::Result<Option<Reply>> {
        (self.0)(req)
    }
}

/// Post-response hook from a closure.
pub struct AfterFn<F>(pub F);

impl<F> Middleware for AfterFn<F>
where
    F: Fn(&Request, Response) -> anyhow::Result<Response> + Send + Sync,
{
    fn after(&self, req: &Request, res: Response, _latency: Duration) -> anyhow::Result<Response> {
        (self.0)(req, res)
    }
}
