//! Error types for `fngate-kernel`.
//!
//! [`GatewayError`] covers every failure mode that can be detected at
//! *definition time*: duplicate routes, unsupported verbs, invalid ports,
//! malformed handler strings.  Nothing in it is ever produced while a request is
//! in flight.
//!
//! Request-time failures are split by recovery strategy:
//!
//! | Error | Recovery |
//! |-------|----------|
//! | [`MappingError`] | logged, the mapped field is omitted, request proceeds |
//! | [`ResolveError`] | request fails with `500`, resolution retried next time |
//! | [`InvocationError`] | request fails with `500` |

use serde_json::Value;
use thiserror::Error;

/// Configuration error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Routes ───────────────────────────────────────────────────────────────
    /// A route for this (method, path) pair has already been registered.
    #[error("route {0} {1} is already registered")]
    DuplicateRoute(String, String),

    /// Two routes share a path shape but name their parameters differently;
    /// the hosting router cannot hold both.
    #[error("route '{0}' conflicts with already registered route '{1}'")]
    ConflictingRoute(String, String),

    /// A path segment starts with `:` or `*`, which the hosting router
    /// reserves.
    #[error("path '{0}' has a segment starting with ':' or '*'")]
    UnroutablePath(String),

    /// The endpoint declares an HTTP verb the gateway cannot serve.
    #[error("endpoint '{0}' declares unsupported method '{1}'")]
    UnsupportedMethod(String, String),

    /// An `application/json` request template is neither a mapping object
    /// nor a string that parses into one.
    #[error("endpoint '{0}' has an invalid request template: {1}")]
    InvalidRequestTemplate(String, String),

    // ── Functions ────────────────────────────────────────────────────────────
    /// A function declaration has an empty name.
    #[error("function name cannot be empty")]
    EmptyFunctionName,

    /// The handler string is not of the form `dir/file.export`.
    #[error("function '{0}' has an invalid handler '{1}'")]
    InvalidHandler(String, String),

    // ── Server ───────────────────────────────────────────────────────────────
    /// Port `0` would bind an ephemeral port nobody can find.
    #[error("port must be greater than 0")]
    InvalidPort,
}

/// A single mapping expression failed to evaluate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MappingError {
    /// `input.path(...)` is recognized but has no implementation.
    #[error("path input mapping method has not been implemented")]
    Unimplemented,

    /// `input.<name>(...)` where `<name>` is not `params`, `json` or `path`.
    #[error("unknown input mapping operation '{0}'")]
    UnknownOperation(String),

    /// The expression text after `input.` is malformed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// The argument of `input.json(...)` is not a valid JSON path.
    #[error("invalid JSON path '{path}': {message}")]
    JsonPath { path: String, message: String },
}

/// The target function could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolveError {
    /// The module (shared library) could not be opened.
    #[error("unable to load {path}: {message}")]
    Load { path: String, message: String },

    /// The module loaded but does not export the requested symbol.
    #[error("module {path} has no export '{export}'")]
    MissingExport { path: String, export: String },

    /// No handler is registered under this reference.
    #[error("no handler registered for {0}")]
    NotFound(String),
}

/// Failure of a single handler invocation.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum InvocationError {
    /// The handler could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// The handler completed with an error value.
    #[error("handler failed: {0}")]
    Handler(Value),
}
