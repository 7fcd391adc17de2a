//! Handler invocation: resolve once, call, and await the single outcome.

use crate::router::RouteEntry;
use fngate_kernel::{
    Callback, FunctionHandler, HandlerResolver, InvocationContext, InvocationError,
    InvocationEvent,
};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Error value reported when a handler panics before completing.
pub const HANDLER_PANICKED: &str = "function handler panicked";

/// Runs function handlers for matched routes.
///
/// The first successful resolution for a route is stored on its
/// [`RouteEntry`]; failures are not remembered, so a later request retries.
pub struct HandlerInvoker {
    resolver: Arc<dyn HandlerResolver>,
}

impl HandlerInvoker {
    pub fn new(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self { resolver }
    }

    /// The route's handler, resolving and caching it on first use.
    pub fn handler_for(
        &self,
        route: &RouteEntry,
    ) -> Result<Arc<dyn FunctionHandler>, InvocationError> {
        if let Some(handler) = route.cached_handler() {
            return Ok(handler);
        }

        let handler_ref = &route.endpoint().handler;
        match self.resolver.resolve(handler_ref) {
            Ok(handler) => {
                debug!(handler = %handler_ref, "handler resolved");
                Ok(route.cache_handler(handler))
            }
            Err(e) => {
                error!(
                    function = %route.endpoint().function_name,
                    handler = %handler_ref,
                    error = %e,
                    "failed to load function handler"
                );
                Err(e.into())
            }
        }
    }

    /// Invoke the route's handler with `event` and wait for its outcome.
    ///
    /// A handler that drops its callback without reporting leaves this
    /// future pending until the client goes away. A handler that panics
    /// inside `call` before reporting fails the invocation instead.
    pub async fn invoke(
        &self,
        route: &RouteEntry,
        event: InvocationEvent,
        context: InvocationContext,
    ) -> Result<Value, InvocationError> {
        let handler = self.handler_for(route)?;
        let request_id = context.request_id.clone();

        let (callback, completion) = Callback::channel();
        let panicked =
            panic::catch_unwind(AssertUnwindSafe(|| handler.call(event, context, callback)))
                .is_err();
        if panicked {
            error!(
                request_id = %request_id,
                function = %route.endpoint().function_name,
                "function handler panicked"
            );
        }

        match completion.wait().await {
            Some(Ok(value)) => Ok(value),
            Some(Err(value)) => {
                error!(request_id = %request_id, error = %value, "function handler failed");
                Err(InvocationError::Handler(value))
            }
            None if panicked => Err(InvocationError::Handler(Value::String(
                HANDLER_PANICKED.to_string(),
            ))),
            None => {
                warn!(
                    request_id = %request_id,
                    function = %route.endpoint().function_name,
                    "handler dropped its callback without completing"
                );
                std::future::pending().await
            }
        }
    }
}

impl std::fmt::Debug for HandlerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerInvoker").finish_non_exhaustive()
    }
}
