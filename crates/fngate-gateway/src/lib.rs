//! `fngate-gateway` — local API-gateway simulator runtime.
//!
//! This crate provides the runtime half of the contracts defined in
//! `fngate-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`HandlerResolver`] | [`resolver::StaticResolver`], [`resolver::DylibResolver`] |
//! | [`FunctionHandler`] | Rust closures, [`resolver::DylibHandler`] |
//! | endpoint declarations | [`router::RouteTable`] installed into axum |
//!
//! The [`server::GatewayServer`] wires routes, the [`invoker::HandlerInvoker`]
//! and the global middleware into an axum HTTP service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fngate_gateway::resolver::StaticResolver;
//! use fngate_gateway::server::GatewayServer;
//! use fngate_kernel::{Callback, EndpointDeclaration, GatewayConfig, HandlerRef};
//! use fngate_kernel::{InvocationContext, InvocationEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hello = HandlerRef::new("hello", "handler");
//!     let resolver = StaticResolver::new().with_handler(
//!         hello.clone(),
//!         |event: InvocationEvent, _ctx: InvocationContext, cb: Callback| {
//!             cb.succeed(format!("hello {}", event["name"]));
//!         },
//!     );
//!
//!     let config = GatewayConfig::new()
//!         .with_port(3000)
//!         .with_endpoint(EndpointDeclaration::new("hello", "GET", "hello/{name}", hello));
//!
//!     GatewayServer::new(config, Arc::new(resolver)).start().await.unwrap();
//! }
//! ```
//!
//! [`HandlerResolver`]: fngate_kernel::HandlerResolver
//! [`FunctionHandler`]: fngate_kernel::FunctionHandler

pub mod cli;
pub mod error;
pub mod init;
pub mod invoker;
pub mod resolver;
pub mod router;
pub mod server;

pub use error::{ServeError, ServeResult};
pub use server::GatewayServer;
