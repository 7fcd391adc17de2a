//! Axum-based gateway server.
//!
//! [`GatewayServer`] validates a [`GatewayConfig`], registers every endpoint
//! in a [`RouteTable`], runs the optional [`InitHook`] and serves the result.
//!
//! # Built-in behaviour
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`     | `/__quit` | Answers `{"ok":true}` and shuts the listener down. |
//! | `OPTIONS` | any       | `200` with an empty body and CORS headers. |
//!
//! Every response carries `Access-Control-Allow-Origin: *`.  Request bodies
//! are limited to [`BODY_LIMIT`] bytes.

use crate::error::{ServeError, ServeResult};
use crate::init::{HandlerTable, InitHook};
use crate::invoker::HandlerInvoker;
use crate::router::RouteTable;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::{
        HeaderName, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use fngate_kernel::{GatewayConfig, GatewayError, HandlerResolver, HttpMethod};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Path of the built-in shutdown endpoint.
pub const QUIT_PATH: &str = "/__quit";

/// Local API-gateway simulator.
pub struct GatewayServer {
    config: GatewayConfig,
    resolver: Arc<dyn HandlerResolver>,
    init_hook: Option<Box<dyn InitHook>>,
    quit: Arc<Notify>,
}

impl GatewayServer {
    /// Create a server that resolves handlers through `resolver`.
    pub fn new(config: GatewayConfig, resolver: Arc<dyn HandlerResolver>) -> Self {
        Self {
            config,
            resolver,
            init_hook: None,
            quit: Arc::new(Notify::new()),
        }
    }

    /// Run `hook` after route registration, before serving.
    pub fn with_init_hook(mut self, hook: impl InitHook + 'static) -> Self {
        self.init_hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle that stops a running server when notified, like `GET /__quit`.
    pub fn quit_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.quit)
    }

    /// Validate the config and register every endpoint.
    pub fn route_table(&self) -> ServeResult<RouteTable> {
        self.config.validate()?;

        let prefix = self.config.normalized_prefix();
        let mut table = RouteTable::new();
        for endpoint in &self.config.endpoints {
            table.register(endpoint.clone(), &prefix)?;
        }

        if let Some(entry) = table.entries().iter().find(|entry| {
            entry.matchable_path() == QUIT_PATH
                && matches!(entry.method(), HttpMethod::Get | HttpMethod::Any)
        }) {
            return Err(GatewayError::DuplicateRoute(
                entry.method().to_string(),
                QUIT_PATH.to_string(),
            )
            .into());
        }

        Ok(table)
    }

    /// Build the complete axum application without binding a socket.
    pub fn build_app(&self) -> ServeResult<Router> {
        let table = self.route_table()?;
        info!(routes = table.len(), "function routes registered");

        let invoker = Arc::new(HandlerInvoker::new(Arc::clone(&self.resolver)));
        let quit = Arc::clone(&self.quit);
        let mut app = table
            .into_router(invoker)
            .route(QUIT_PATH, get(move || quit_handler(quit)));

        if let Some(hook) = &self.init_hook {
            let handlers = HandlerTable::from_endpoints(&self.config.endpoints);
            app = hook.init(app, &handlers)?;
        }

        Ok(app
            .layer(middleware::from_fn(answer_options))
            .layer(DefaultBodyLimit::max(BODY_LIMIT))
            .layer(cors_layer())
            .layer(TraceLayer::new_for_http()))
    }

    /// Bind `host:port` and serve until `/__quit` or Ctrl-C.
    pub async fn start(self) -> ServeResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until `/__quit` or Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> ServeResult<()> {
        let app = self.build_app()?;
        let port = listener.local_addr()?.port();

        info!(
            addr = %listener.local_addr()?,
            "fngate API gateway simulator listening on http://localhost:{port}"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.quit))
            .await
            .map_err(ServeError::Io)?;

        info!("fngate API gateway simulator stopped");
        Ok(())
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("config", &self.config)
            .field("init_hook", &self.init_hook.is_some())
            .finish_non_exhaustive()
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::HEAD,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-amz-date"),
            HeaderName::from_static("x-amz-security-token"),
        ])
}

/// Answer every `OPTIONS` request that is not a CORS preflight.
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

async fn quit_handler(quit: Arc<Notify>) -> Json<Value> {
    info!("quit request received");
    quit.notify_one();
    Json(json!({ "ok": true }))
}

async fn shutdown_signal(quit: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = quit.notified() => {}
        _ = ctrl_c => info!("interrupt received"),
    }
}
