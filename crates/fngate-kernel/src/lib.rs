//! Kernel contract for the fngate API-gateway simulator.
//!
//! This crate holds the *pure* half of the gateway: the data model, the
//! route-template translator, the request-mapping language and the handler
//! contracts.  It never binds a socket; the runtime lives in `fngate-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              fngate-kernel  (this crate)                    │
//! │  path::translate          mapping::build_event              │
//! │  FunctionHandler trait    HandlerResolver trait             │
//! │  Callback (oneshot bridge)  GatewayConfig + validate()      │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              fngate-gateway  (runtime crate)                │
//! │  RouteTable / RouteEntry   HandlerInvoker                   │
//! │  StaticResolver / DylibResolver   InitHook                  │
//! │  GatewayServer  (axum HTTP server)   `fngate` binary        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use fngate_kernel::mapping::{build_event, MappingSpec};
//! use fngate_kernel::types::InboundRequest;
//!
//! let request = InboundRequest::new("req-1", "/users/42").with_path_param("id", "42");
//! let spec = MappingSpec::from_pairs([("userId", "$input.params('id')")]);
//!
//! let event = build_event(&request, Some(&spec));
//! assert_eq!(event["userId"], "42");
//! ```

pub mod error;
pub mod handler;
pub mod manifest;
pub mod mapping;
pub mod path;
pub mod types;
pub mod validation;

#[cfg(feature = "config")]
pub mod config;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use error::{GatewayError, InvocationError, MappingError, ResolveError};
pub use handler::{Callback, FunctionHandler, HandlerOutcome, HandlerResolver};
pub use mapping::{MappingSpec, build_event};
pub use path::translate;
pub use types::{
    EndpointDeclaration, HandlerRef, HttpMethod, InboundRequest, InvocationContext,
    InvocationEvent,
};
pub use validation::GatewayConfig;
