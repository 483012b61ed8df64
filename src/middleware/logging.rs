use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tracing::info;

use super::Middleware;
use crate::server::{Request, Response};

/// Logs one line per dispatched request and keeps simple counters.
#[derive(Debug, Default)]
pub struct AccessLog {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl AccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean latency over every logged request; zero before the first one.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count() as u64;
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
    }
}

impl Middleware for AccessLog {
    fn after(&self, req: &Request, res: Response, latency: Duration) -> anyhow::Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        let handler = req
            .route
            .as_ref()
            .map(|r| r.handler_name.as_ref())
            .unwrap_or("-");
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler_name = %handler,
            status = res.status(),
            latency_ms = latency.as_millis() as u64,
            "Request handled"
        );
        Ok(res)
    }
}
