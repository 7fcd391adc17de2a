//! Route table: one [`RouteEntry`] per declared endpoint.
//!
//! Entries are created once at startup and live as long as the server.  Each
//! carries a write-once handler slot that the [`HandlerInvoker`] fills on the
//! first successful resolution.
//!
//! [`HandlerInvoker`]: crate::invoker::HandlerInvoker

use fngate_kernel::mapping::RequestMapping;
use fngate_kernel::path::{normalize, translate};
use fngate_kernel::validation::validate_endpoint;
use fngate_kernel::{EndpointDeclaration, FunctionHandler, GatewayError, HttpMethod};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A startup-registered binding of method + matchable path + endpoint +
/// lazily cached handler.
pub struct RouteEntry {
    matchable_path: String,
    display_path: String,
    method: HttpMethod,
    endpoint: EndpointDeclaration,
    mapping: RequestMapping,
    handler: OnceLock<Arc<dyn FunctionHandler>>,
}

impl RouteEntry {
    /// Build an entry for `endpoint` mounted under `prefix`.
    pub fn new(endpoint: EndpointDeclaration, prefix: &str) -> Result<Self, GatewayError> {
        let method = validate_endpoint(&endpoint)?;
        let mapping = RequestMapping::from_templates(&endpoint.request_templates).map_err(|e| {
            GatewayError::InvalidRequestTemplate(endpoint.function_name.clone(), e.to_string())
        })?;

        Ok(Self {
            matchable_path: translate(prefix, &endpoint.path),
            display_path: normalize(prefix, &endpoint.path),
            method,
            endpoint,
            mapping,
            handler: OnceLock::new(),
        })
    }

    /// Path in the hosting router's syntax.
    pub fn matchable_path(&self) -> &str {
        &self.matchable_path
    }

    /// Normalized gateway path, used in log lines.
    pub fn display_path(&self) -> &str {
        &self.display_path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &EndpointDeclaration {
        &self.endpoint
    }

    pub fn mapping(&self) -> &RequestMapping {
        &self.mapping
    }

    /// The cached handler, if one has been resolved.
    pub fn cached_handler(&self) -> Option<Arc<dyn FunctionHandler>> {
        self.handler.get().cloned()
    }

    /// Store `handler` unless another request already did; returns the
    /// handler that ended up cached.
    pub fn cache_handler(&self, handler: Arc<dyn FunctionHandler>) -> Arc<dyn FunctionHandler> {
        match self.handler.set(Arc::clone(&handler)) {
            Ok(()) => handler,
            Err(_) => self.handler.get().cloned().unwrap_or(handler),
        }
    }

    fn overlaps(&self, method: HttpMethod) -> bool {
        self.method == method || self.method == HttpMethod::Any || method == HttpMethod::Any
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("matchable_path", &self.matchable_path)
            .field("function", &self.endpoint.function_name)
            .field("resolved", &self.handler.get().is_some())
            .finish()
    }
}

/// All registered routes, in registration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` under `prefix`.
    ///
    /// Rejects a second route for the same (method, path) and a route whose
    /// wildcards collide with an existing one at the same position.
    pub fn register(
        &mut self,
        endpoint: EndpointDeclaration,
        prefix: &str,
    ) -> Result<Arc<RouteEntry>, GatewayError> {
        let entry = RouteEntry::new(endpoint, prefix)?;
        if entry
            .matchable_path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
        {
            return Err(GatewayError::UnroutablePath(entry.display_path.clone()));
        }

        for existing in &self.entries {
            if existing.matchable_path == entry.matchable_path {
                if existing.overlaps(entry.method) {
                    return Err(GatewayError::DuplicateRoute(
                        entry.method.to_string(),
                        entry.display_path.clone(),
                    ));
                }
            } else if paths_conflict(&existing.matchable_path, &entry.matchable_path) {
                return Err(GatewayError::ConflictingRoute(
                    entry.display_path.clone(),
                    existing.display_path.clone(),
                ));
            }
        }

        debug!(
            method = %entry.method,
            path = %entry.display_path,
            route = %entry.matchable_path,
            function = %entry.endpoint.function_name,
            "route registered"
        );

        let entry = Arc::new(entry);
        self.entries.push(Arc::clone(&entry));
        Ok(entry)
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
    CatchAll(&'a str),
}

fn segments(matchable: &str) -> impl Iterator<Item = Segment<'_>> {
    matchable.split('/').map(|segment| {
        if let Some(name) = segment.strip_prefix("{*") {
            Segment::CatchAll(name.trim_end_matches('}'))
        } else if segment.starts_with('{') && !segment.starts_with("{{") {
            Segment::Param(segment.trim_start_matches('{').trim_end_matches('}'))
        } else {
            Segment::Literal(segment)
        }
    })
}

/// Whether two distinct paths would collide in the router.
///
/// Walking both paths in step, a differing literal separates them. A
/// wildcard sharing its position with a differently named or differently
/// kinded wildcard collides, so `/a/{x}` against `/a/{y}` and `/a/{id}`
/// against `/a/{*proxy}` both conflict.
fn paths_conflict(a: &str, b: &str) -> bool {
    for pair in segments(a).zip(segments(b)) {
        match pair {
            (Segment::Literal(x), Segment::Literal(y)) if x == y => {}
            (Segment::Param(x), Segment::Param(y)) if x == y => {}
            (Segment::CatchAll(x), Segment::CatchAll(y)) => return x != y,
            (Segment::Literal(_), _) | (_, Segment::Literal(_)) => return false,
            _ => return true,
        }
    }
    false
}
