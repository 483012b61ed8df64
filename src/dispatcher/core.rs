use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::Reply;
use crate::error::{classify, HttpError, INTERNAL_BODY};
use crate::middleware::{AfterFn, BeforeFn, Middleware};
use crate::router::{Endpoint, Itinerary, RouteMatch};
use crate::runtime_config::PipelineConfig;
use crate::schema::ModelRegistry;
use crate::server::{HeaderVec, Output, Request, Response, RouteInfo, HTML_CONTENT_TYPE};
use crate::static_files::StaticFiles;

/// What a handler sees while it runs.
pub struct Context<'a> {
    pub request: &'a Request,
    pub models: &'a ModelRegistry,
    pub config: &'a PipelineConfig,
}

/// Function endpoint.
pub type Handler = Arc<dyn Fn(&Context<'_>) -> anyhow::Result<Reply> + Send + Sync>;

/// A type exposing several named actions.
pub trait Controller: Send + Sync {
    fn handle(&self, action: &str, cx: &Context<'_>) -> anyhow::Result<Reply>;
}

/// Builds the response for an error before itinerary transforms run.
pub trait ErrorResponder: Send + Sync {
    fn respond(&self, error: &HttpError, request: Option<&Request>) -> Response;
}

impl<F> ErrorResponder for F
where
    F: Fn(&HttpError, Option<&Request>) -> Response + Send + Sync,
{
    fn respond(&self, error: &HttpError, request: Option<&Request>) -> Response {
        self(error, request)
    }
}

type StaticHandler = Arc<dyn Fn(Response) -> Response + Send + Sync>;

/// Directory served under a URL prefix, checked before routing.
#[derive(Clone)]
pub struct StaticMount {
    prefix: String,
    files: StaticFiles,
    handler: Option<StaticHandler>,
}

impl StaticMount {
    /// Serve `dir` under `prefix` (e.g. `/static`).
    ///
    /// A prefix of `/` (or empty) mounts `dir` at the root. A root mount only
    /// answers for files that exist; other paths fall through to routing.
    pub fn new(prefix: &str, dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            files: StaticFiles::new(dir),
            handler: None,
        }
    }

    /// Post-process every file response served from this mount.
    #[must_use]
    pub fn with_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Remainder of `path` below the prefix, if the mount covers it.
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.strip_prefix(self.prefix.as_str())
            .filter(|rest| rest.starts_with('/'))
    }
}

/// Pipeline stage, recorded on log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingHooks,
    ResolvingRoute,
    Dispatching,
    Responding,
    Error,
}

/// Assembles a [`Dispatcher`]. Hook lists are frozen by [`build`](Self::build).
pub struct DispatcherBuilder {
    config: PipelineConfig,
    models: Option<Arc<ModelRegistry>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    itineraries: Vec<Arc<dyn Itinerary>>,
    static_mounts: Vec<StaticMount>,
    error_responder: Option<Arc<dyn ErrorResponder>>,
}

impl DispatcherBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            models: None,
            middlewares: Vec::new(),
            itineraries: Vec::new(),
            static_mounts: Vec::new(),
            error_responder: None,
        }
    }

    /// Registry handed to handlers through [`Context::models`]. A fresh empty
    /// registry is used when none is given.
    #[must_use]
    pub fn models(mut self, models: Arc<ModelRegistry>) -> Self {
        self.models = Some(models);
        self
    }

    #[must_use]
    pub fn middleware(mut self, mw: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(mw));
        self
    }

    /// Pre-request hook from a closure.
    #[must_use]
    pub fn before<F>(self, f: F) -> Self
    where
        F: Fn(&Request) -> anyhow::Result<Option<Reply>> + Send + Sync + 'static,
    {
        self.middleware(BeforeFn(f))
    }

    /// Post-response hook from a closure.
    #[must_use]
    pub fn after<F>(self, f: F) -> Self
    where
        F: Fn(&Request, Response) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.middleware(AfterFn(f))
    }

    #[must_use]
    pub fn itinerary(mut self, itinerary: impl Itinerary + 'static) -> Self {
        self.itineraries.push(Arc::new(itinerary));
        self
    }

    #[must_use]
    pub fn static_mount(mut self, mount: StaticMount) -> Self {
        self.static_mounts.push(mount);
        self
    }

    #[must_use]
    pub fn error_responder(mut self, responder: impl ErrorResponder + 'static) -> Self {
        self.error_responder = Some(Arc::new(responder));
        self
    }

    pub fn build(self) -> Dispatcher {
        info!(
            itineraries = self.itineraries.len(),
            middlewares = self.middlewares.len(),
            static_mounts = self.static_mounts.len(),
            envelope = ?self.config.envelope,
            "Dispatcher built"
        );
        Dispatcher {
            config: self.config,
            models: self.models.unwrap_or_default(),
            middlewares: self.middlewares,
            itineraries: self.itineraries,
            static_mounts: self.static_mounts,
            error_responder: self.error_responder,
        }
    }
}

/// Request pipeline. Immutable once built and shareable across threads.
pub struct Dispatcher {
    config: PipelineConfig,
    models: Arc<ModelRegistry>,
    middlewares: Vec<Arc<dyn Middleware>>,
    itineraries: Vec<Arc<dyn Itinerary>>,
    static_mounts: Vec<StaticMount>,
    error_responder: Option<Arc<dyn ErrorResponder>>,
}

impl Dispatcher {
    pub fn builder(config: PipelineConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    /// Run one request through the pipeline. Always produces an output, even
    /// when a hook, handler or error responder panics.
    pub fn handle(&self, mut request: Request) -> Output {
        let start = Instant::now();
        let processed = catch_unwind(AssertUnwindSafe(|| self.process(&mut request, start)))
            .unwrap_or_else(|panic| Err(self.panic_error(panic.as_ref(), &request, "Pipeline").into()));
        let output = match processed {
            Ok(response) => self.finish(response, Some(&request)),
            Err(err) => self.fail(&err, Some(&request)),
        };
        info!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            status = output.status,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Request complete"
        );
        output
    }

    /// Error path without a dispatched handler, for transports that fail
    /// before or outside [`handle`](Self::handle).
    pub fn send_error(&self, error: HttpError, request: Option<&Request>) -> Output {
        self.fail(&error.into(), request)
    }

    fn process(&self, request: &mut Request, start: Instant) -> anyhow::Result<Response> {
        if let Some(exc) = &request.exception {
            warn!(
                request_id = %request.request_id,
                status = exc.status,
                reason = %exc.reason,
                "Malformed request flagged by transport"
            );
            return Err(exc.clone().into());
        }

        if let Some(response) = self.serve_static(request)? {
            return Ok(response);
        }

        for mw in &self.middlewares {
            if let Some(reply) = mw.before(request)? {
                if !reply.is_empty() {
                    debug!(
                        request_id = %request.request_id,
                        stage = ?Stage::ResolvingHooks,
                        "Pre-request hook short-circuited"
                    );
                    return Ok(reply.into_response(self.config.envelope, request));
                }
            }
        }

        let (itinerary, matched) = self.resolve(request)?;

        let reply = self.invoke(&matched, request)?;
        let response = reply.into_response(self.config.envelope, request);

        debug!(
            request_id = %request.request_id,
            stage = ?Stage::Responding,
            status = response.status(),
            "Applying response hooks"
        );
        let mut response = itinerary.modify_response(response)?;
        for mw in &self.middlewares {
            response = mw.after(request, response, start.elapsed())?;
        }
        Ok(response)
    }

    fn serve_static(&self, request: &Request) -> Result<Option<Response>, HttpError> {
        for mount in &self.static_mounts {
            let Some(rest) = mount.strip(&request.path) else {
                continue;
            };
            let loaded = urlencoding::decode(rest)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))
                .and_then(|decoded| mount.files.load(&decoded));
            match loaded {
                Ok((path, bytes)) => return Ok(Some(self.static_response(mount, request, path, bytes))),
                Err(e) if mount.is_root() => {
                    debug!(
                        request_id = %request.request_id,
                        path = %request.path,
                        error = %e,
                        "No file under root mount, routing"
                    );
                }
                Err(e) => {
                    debug!(
                        request_id = %request.request_id,
                        path = %request.path,
                        error = %e,
                        "Static file not found"
                    );
                    return Err(HttpError::not_found());
                }
            }
        }
        Ok(None)
    }

    fn static_response(
        &self,
        mount: &StaticMount,
        request: &Request,
        path: std::path::PathBuf,
        bytes: Vec<u8>,
    ) -> Response {
        info!(
            request_id = %request.request_id,
            prefix = %mount.prefix,
            file = %path.display(),
            size = bytes.len(),
            "Static file served"
        );
        let response = Response::file(path, None).with_body(bytes);
        match &mount.handler {
            Some(handler) => handler(response),
            None => response,
        }
    }

    fn resolve(&self, request: &mut Request) -> anyhow::Result<(&Arc<dyn Itinerary>, RouteMatch)> {
        let found = self
            .itineraries
            .iter()
            .find_map(|it| it.resolve(request).map(|m| (it, m)));
        let Some((itinerary, matched)) = found else {
            warn!(
                request_id = %request.request_id,
                stage = ?Stage::ResolvingRoute,
                method = %request.method,
                path = %request.path,
                "No route matched"
            );
            return Err(HttpError::not_found().into());
        };

        request.route = Some(RouteInfo {
            itinerary: Arc::from(itinerary.name()),
            handler_name: Arc::clone(&matched.handler_name),
            pattern: Arc::clone(&matched.pattern),
        });
        request.path_params = matched.path_params.clone();
        itinerary.before_request(request)?;
        Ok((itinerary, matched))
    }

    fn invoke(&self, matched: &RouteMatch, request: &Request) -> anyhow::Result<Reply> {
        let handler_name = matched.handler_name.as_ref();

        info!(
            request_id = %request.request_id,
            stage = ?Stage::Dispatching,
            handler_name = %handler_name,
            path_params = ?request.path_params,
            query_params = ?request.query_params,
            "Handler execution start"
        );
        let execution_start = Instant::now();
        let cx = Context {
            request,
            models: &self.models,
            config: &self.config,
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| match &matched.endpoint {
            Endpoint::Function(handler) => handler(&cx),
            Endpoint::Controller { controller, action } => controller.handle(action, &cx),
            Endpoint::Redirect { location, status } => {
                Ok(Reply::Response(Response::redirect(location, *status, None)))
            }
        }));

        match outcome {
            Ok(result) => {
                info!(
                    request_id = %request.request_id,
                    handler_name = %handler_name,
                    execution_time_ms = execution_start.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "Handler execution complete"
                );
                result
            }
            Err(panic) => Err(self.panic_error(panic.as_ref(), request, "Handler").into()),
        }
    }

    /// Log a caught panic and turn it into a 500. `origin` names the failing
    /// part and leads the reason phrase.
    fn panic_error(&self, panic: &(dyn Any + Send), request: &Request, origin: &str) -> HttpError {
        let panic_message = panic_message(panic);
        let backtrace = std::backtrace::Backtrace::capture();
        let handler_name = request
            .route
            .as_ref()
            .map(|r| r.handler_name.to_string())
            .unwrap_or_default();
        error!(
            request_id = %request.request_id,
            origin,
            handler_name = %handler_name,
            panic_message = %panic_message,
            backtrace = %backtrace,
            "{origin} panicked - CRITICAL"
        );
        let trace = if self.config.include_traces {
            let mut lines = vec![panic_message.clone()];
            lines.extend(backtrace.to_string().lines().map(str::to_string));
            lines
        } else {
            Vec::new()
        };
        HttpError::internal(format!("{origin} panicked: {panic_message}"), trace)
    }

    fn error_response(&self, err: &anyhow::Error, request: Option<&Request>) -> Response {
        let http = classify(err, self.config.include_traces);
        let request_id = request.map(|r| r.request_id.to_string()).unwrap_or_default();
        if http.status >= 500 {
            let detail = format!("{err:#}");
            error!(
                request_id = %request_id,
                stage = ?Stage::Error,
                status = http.status,
                kind = ?http.kind,
                error = %detail,
                "Error response built"
            );
        } else {
            warn!(
                request_id = %request_id,
                stage = ?Stage::Error,
                status = http.status,
                kind = ?http.kind,
                reason = %http.reason,
                "Error response built"
            );
        }

        let mut response = match &self.error_responder {
            Some(responder) => responder.respond(&http, request),
            None => http.to_response(self.config.envelope),
        };
        if let Some(request) = request {
            response = response.for_request(request);
        }
        let body = self
            .itineraries
            .iter()
            .find_map(|it| it.error_body_for(&response, request));
        if let Some(body) = body {
            response.set_body(body);
        }
        response
    }

    fn finish(&self, response: Response, request: Option<&Request>) -> Output {
        match response.with_server(&self.config.server_name).finalize() {
            Ok(output) => output,
            Err(http) => self.fail(&http.into(), request),
        }
    }

    /// Error path to output. A responder or transform that panics, or an
    /// error response that cannot be finalized, yields a bare 500.
    fn fail(&self, err: &anyhow::Error, request: Option<&Request>) -> Output {
        let built = catch_unwind(AssertUnwindSafe(|| self.error_response(err, request)));
        let response = match built {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    request_id = %request.map(|r| r.request_id.to_string()).unwrap_or_default(),
                    stage = ?Stage::Error,
                    panic_message = %panic_message(panic.as_ref()),
                    "Error responder panicked - CRITICAL"
                );
                return self.bare_internal_error();
            }
        };
        response
            .with_server(&self.config.server_name)
            .finalize()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to finalize error response");
                self.bare_internal_error()
            })
    }

    fn bare_internal_error(&self) -> Output {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("Content-Type"), HTML_CONTENT_TYPE.to_string()));
        headers.push((Arc::from("Content-Length"), INTERNAL_BODY.len().to_string()));
        headers.push((Arc::from("Server"), self.config.server_name.clone()));
        Output {
            status: 500,
            status_line: "500 Internal Server Error".to_string(),
            headers,
            body: INTERNAL_BODY.as_bytes().to_vec(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteTable;
    use http::Method;

    fn hello(_: &Context<'_>) -> anyhow::Result<Reply> {
        Ok(Reply::from("hello"))
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }

    #[test]
    fn test_static_mount_prefix() {
        let mount = StaticMount::new("/static/", "site");
        assert_eq!(mount.prefix(), "/static");
        assert_eq!(mount.strip("/static/a.css"), Some("/a.css"));
        assert_eq!(mount.strip("/staticfile"), None);
        assert_eq!(mount.strip("/other/a.css"), None);
    }

    #[test]
    fn test_route_info_bound() {
        let dispatcher = Dispatcher::builder(PipelineConfig::default())
            .itinerary(RouteTable::new("api").route(Method::GET, "/hi/{who}", "hi", hello))
            .build();
        let mut req = Request::new(Method::GET, "/hi/bob");
        let (_, matched) = dispatcher.resolve(&mut req).unwrap();
        assert_eq!(matched.handler_name.as_ref(), "hi");
        let route = req.route.unwrap();
        assert_eq!(route.itinerary.as_ref(), "api");
        assert_eq!(route.pattern.as_ref(), "/hi/{who}");
        assert_eq!(req.path_params[0].1, "bob");
    }

    #[test]
    fn test_send_error_uses_envelope() {
        let dispatcher = Dispatcher::builder(PipelineConfig::default()).build();
        let out = dispatcher.send_error(HttpError::teapot(), None);
        assert_eq!(out.status, 418);
        assert_eq!(out.status_line, "418 I'm a teapot");
        assert_eq!(out.text(), crate::error::TEAPOT_BODY);
    }
}
