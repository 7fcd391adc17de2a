//! Core data types shared by the translator, the mapping evaluator and the
//! handler contracts.
//!
//! These types carry no runtime dependencies beyond `serde` and `std`, so the
//! runtime crate can move them across task boundaries freely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// The synthetic event handed to a function handler.
///
/// Built fresh for every request and moved into the handler; it never aliases
/// request internals.
pub type InvocationEvent = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method an endpoint can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Matches every verb (`ANY` in gateway declarations).
    Any,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            "ANY" => Some(HttpMethod::Any),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a function handler: the module it lives in plus the name it is
/// exported under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Filesystem path of the module (shared library) holding the handler.
    pub module: PathBuf,
    /// Exported symbol name.
    pub export: String,
}

impl HandlerRef {
    pub fn new(module: impl Into<PathBuf>, export: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            export: export.into(),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module.display(), self.export)
    }
}

/// A single declared route: gateway path template, verb, request templates
/// and the handler it invokes.
///
/// Immutable once loaded; one instance per declared route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDeclaration {
    /// Gateway path template, e.g. `users/{id}`.
    pub path: String,
    /// HTTP verb as declared (`GET`, `post`, `ANY`, ...).
    pub method: String,
    /// Content type → mapping spec source (an object, or a JSON string).
    #[serde(default)]
    pub request_templates: Map<String, Value>,
    /// Handler invoked for this route.
    pub handler: HandlerRef,
    /// Name of the function the endpoint belongs to.
    pub function_name: String,
}

impl EndpointDeclaration {
    pub fn new(
        function_name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        handler: HandlerRef,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            request_templates: Map::new(),
            handler,
            function_name: function_name.into(),
        }
    }

    /// Builder: attach a request template for a content type.
    pub fn with_request_template(
        mut self,
        content_type: impl Into<String>,
        template: impl Into<Value>,
    ) -> Self {
        self.request_templates
            .insert(content_type.into(), template.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / context
// ─────────────────────────────────────────────────────────────────────────────

/// The parts of an inbound HTTP request the mapping evaluator reads.
///
/// The hosting server parses body, path parameters and query string before
/// the request reaches the kernel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// Request path as received.
    pub path: String,
    /// Parsed JSON body (`{}` when the request carried none).
    pub body: Value,
    /// Path parameters captured by the router.
    pub path_params: HashMap<String, String>,
    /// Query-string parameters.
    pub query: HashMap<String, String>,
    /// Request headers (names lowercased).
    pub headers: HashMap<String, String>,
}

impl InboundRequest {
    /// Construct a request with an empty object body.
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            body: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Builder helper: attach a header (name is lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}

/// Per-invocation context handed to the handler next to the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Name of the invoked function.
    pub function_name: String,
    /// Id of the HTTP request that triggered the invocation.
    pub request_id: String,
}

impl InvocationContext {
    pub fn new(function_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            request_id: request_id.into(),
        }
    }
}

/// Loose truthiness used by the mapping language and the callback contract:
/// `null`, `false`, `0` and `""` are falsy, everything else (including empty
/// objects and arrays) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
