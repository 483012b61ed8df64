use std::fmt;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::dispatcher::{Context, Controller, Handler, Reply};
use crate::server::{Body, Request, Response};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage. Names are shared with the route table, values are per
/// request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What a matched route runs.
#[derive(Clone)]
pub enum Endpoint {
    /// Plain function handler
    Function(Handler),
    /// Named action on a controller instance
    Controller {
        controller: Arc<dyn Controller>,
        action: Arc<str>,
    },
    /// Redirect without invoking anything
    Redirect {
        location: String,
        status: Option<u16>,
    },
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Function(_) => f.write_str("Function"),
            Endpoint::Controller { action, .. } => write!(f, "Controller({action})"),
            Endpoint::Redirect { location, status } => {
                write!(f, "Redirect({location}, {status:?})")
            }
        }
    }
}

/// Result of successfully matching a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    /// Name of the handler that should process this request
    pub handler_name: Arc<str>,
    /// Declared pattern, e.g. `/users/{id}`
    pub pattern: Arc<str>,
    /// Path parameters extracted from the URL (`{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A registered group of routes with its own hooks and error-body transforms.
///
/// The dispatcher asks itineraries in registration order; the first one whose
/// [`resolve`](Itinerary::resolve) returns a match owns the request.
pub trait Itinerary: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(&self, request: &Request) -> Option<RouteMatch>;

    /// Runs after a match, before the handler. May mutate the request.
    fn before_request(&self, _request: &mut Request) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on the coerced handler response.
    fn modify_response(&self, response: Response) -> anyhow::Result<Response> {
        Ok(response)
    }

    /// Replacement body for an error response, if this itinerary has one.
    fn error_body_for(&self, _response: &Response, _request: Option<&Request>) -> Option<Body> {
        None
    }
}

type BeforeHook = Arc<dyn Fn(&mut Request) -> anyhow::Result<()> + Send + Sync>;
type ResponseHook = Arc<dyn Fn(Response) -> anyhow::Result<Response> + Send + Sync>;
type ErrorBodyFn = Arc<dyn Fn(&Response, Option<&Request>) -> Body + Send + Sync>;

struct Route {
    /// `None` matches every method
    method: Option<Method>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    pattern: Arc<str>,
    name: Arc<str>,
    endpoint: Endpoint,
}

/// Reference [`Itinerary`]: regex segment matching over `{param}` patterns.
///
/// Longer patterns are tried first so `/users/me` wins over `/users/{id}`
/// when both are registered.
pub struct RouteTable {
    name: String,
    routes: Vec<Route>,
    before: Vec<BeforeHook>,
    modifier: Option<ResponseHook>,
    error_bodies: Vec<(u16, ErrorBodyFn)>,
}

impl RouteTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            before: Vec::new(),
            modifier: None,
            error_bodies: Vec::new(),
        }
    }

    fn push(&mut self, method: Option<Method>, pattern: &str, name: &str, endpoint: Endpoint) {
        let (regex, param_names) = match path_to_regex(pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(
                    itinerary = %self.name,
                    pattern = %pattern,
                    error = %e,
                    "Route pattern rejected"
                );
                return;
            }
        };
        debug!(
            itinerary = %self.name,
            method = ?method,
            pattern = %pattern,
            handler_name = %name,
            endpoint = ?endpoint,
            "Route registered"
        );
        self.routes.push(Route {
            method,
            regex,
            param_names: param_names.into_iter().map(Arc::from).collect(),
            pattern: Arc::from(pattern),
            name: Arc::from(name),
            endpoint,
        });
        // Stable sort keeps registration order among equal lengths.
        self.routes
            .sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
    }

    /// Register a function handler.
    #[must_use]
    pub fn route<F>(mut self, method: Method, pattern: &str, name: &str, handler: F) -> Self
    where
        F: Fn(&Context<'_>) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.push(Some(method), pattern, name, Endpoint::Function(Arc::new(handler)));
        self
    }

    /// Register a controller action. The handler name is `action`.
    #[must_use]
    pub fn controller(
        mut self,
        method: Method,
        pattern: &str,
        controller: Arc<dyn Controller>,
        action: &str,
    ) -> Self {
        let endpoint = Endpoint::Controller {
            controller,
            action: Arc::from(action),
        };
        self.push(Some(method), pattern, action, endpoint);
        self
    }

    /// Register a redirect for every method on `pattern`.
    #[must_use]
    pub fn redirect(mut self, pattern: &str, location: &str, status: Option<u16>) -> Self {
        let endpoint = Endpoint::Redirect {
            location: location.to_string(),
            status,
        };
        self.push(None, pattern, "redirect", endpoint);
        self
    }

    #[must_use]
    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn modify_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Response) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.modifier = Some(Arc::new(hook));
        self
    }

    /// Rewrite the body of error responses with `status`.
    #[must_use]
    pub fn on_error<F>(mut self, status: u16, f: F) -> Self
    where
        F: Fn(&Response, Option<&Request>) -> Body + Send + Sync + 'static,
    {
        self.error_bodies.push((status, Arc::new(f)));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `METHOD pattern -> handler` lines, in match order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| {
                let method = r.method.as_ref().map(Method::as_str).unwrap_or("*");
                format!("{method} {} -> {}", r.pattern, r.name)
            })
            .collect()
    }
}

impl Itinerary for RouteTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, request: &Request) -> Option<RouteMatch> {
        for route in &self.routes {
            if let Some(m) = &route.method {
                if *m != request.method {
                    continue;
                }
            }
            let Some(caps) = route.regex.captures(&request.path) else {
                continue;
            };
            let path_params: ParamVec = route
                .param_names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| {
                    let raw = m?.as_str();
                    let value = urlencoding::decode(raw)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| raw.to_string());
                    Some((Arc::clone(name), value))
                })
                .collect();
            info!(
                itinerary = %self.name,
                method = %request.method,
                path = %request.path,
                handler_name = %route.name,
                route_pattern = %route.pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                endpoint: route.endpoint.clone(),
                handler_name: Arc::clone(&route.name),
                pattern: Arc::clone(&route.pattern),
                path_params,
            });
        }
        None
    }

    fn before_request(&self, request: &mut Request) -> anyhow::Result<()> {
        for hook in &self.before {
            hook(request)?;
        }
        Ok(())
    }

    fn modify_response(&self, response: Response) -> anyhow::Result<Response> {
        match &self.modifier {
            Some(hook) => hook(response),
            None => Ok(response),
        }
    }

    fn error_body_for(&self, response: &Response, request: Option<&Request>) -> Option<Body> {
        self.error_bodies
            .iter()
            .find(|(status, _)| *status == response.status())
            .map(|(_, f)| f(response, request))
    }
}

/// Convert a path pattern to an anchored regex and its parameter names.
///
/// `/users/{id}` becomes `^/users/([^/]+)$` with `["id"]`. Literal segments
/// are escaped.
pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    let mut param_names = Vec::with_capacity(path.matches('{').count());

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment.starts_with('{') && segment.ends_with('}') {
            pattern.push_str("/([^/]+)");
            param_names.push(segment[1..segment.len() - 1].to_string());
        } else {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }
    if pattern.len() == 1 {
        pattern.push('/');
    }
    pattern.push('$');

    Ok((Regex::new(&pattern)?, param_names))
}
