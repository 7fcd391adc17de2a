//! Function-handler contracts and the callback → single-outcome bridge.
//!
//! Handlers follow the callback convention of serverless runtimes: they get
//! the event, a context and a completion [`Callback`], and report exactly
//! once with `(error, result)`.  A truthy `error` is a failure carrying that
//! value; anything else is a success carrying `result`.
//!
//! The bridge is a one-shot channel: [`Callback::channel`] returns the
//! handler-side [`Callback`] and the caller-side [`Completion`].

use crate::error::ResolveError;
use crate::types::{HandlerRef, InvocationContext, InvocationEvent, is_truthy};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Result of one handler invocation: success value or failure value.
pub type HandlerOutcome = Result<Value, Value>;

/// Completion callback handed to a handler.
///
/// Consumed on use, so a handler can report at most once.  Dropping it
/// without calling it leaves the waiting request pending.
#[derive(Debug)]
pub struct Callback {
    tx: oneshot::Sender<HandlerOutcome>,
}

/// Caller side of a [`Callback`].
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<HandlerOutcome>,
}

impl Callback {
    /// Create a connected callback/completion pair.
    pub fn channel() -> (Callback, Completion) {
        let (tx, rx) = oneshot::channel();
        (Callback { tx }, Completion { rx })
    }

    /// Report the outcome using the `(error, result)` convention.
    pub fn complete(self, error: Option<Value>, result: Option<Value>) {
        let outcome = match error {
            Some(err) if is_truthy(&err) => Err(err),
            _ => Ok(result.unwrap_or(Value::Null)),
        };
        // The receiver is gone only when the request itself was dropped.
        let _ = self.tx.send(outcome);
    }

    /// Shorthand for `complete(None, Some(result))`.
    pub fn succeed(self, result: impl Into<Value>) {
        self.complete(None, Some(result.into()));
    }

    /// Shorthand for `complete(Some(error), None)`.
    pub fn fail(self, error: impl Into<Value>) {
        self.complete(Some(error.into()), None);
    }
}

impl Completion {
    /// Wait for the handler to report.
    ///
    /// Returns `None` if the [`Callback`] was dropped without being called.
    pub async fn wait(self) -> Option<HandlerOutcome> {
        self.rx.await.ok()
    }
}

/// A resolved, callable function handler.
pub trait FunctionHandler: Send + Sync {
    /// Start one invocation.  The outcome is reported through `callback`,
    /// possibly after this method has returned.  The gateway treats a panic
    /// here, before `callback` is used, as a failed invocation.
    fn call(&self, event: InvocationEvent, context: InvocationContext, callback: Callback);
}

impl<F> FunctionHandler for F
where
    F: Fn(InvocationEvent, InvocationContext, Callback) + Send + Sync,
{
    fn call(&self, event: InvocationEvent, context: InvocationContext, callback: Callback) {
        self(event, context, callback)
    }
}

/// Loads function handlers from a module path and export name.
///
/// Implementations must be safe to call repeatedly for the same reference:
/// the invoker does not single-flight first resolutions.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn FunctionHandler>, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn truthy_error_is_a_failure() {
        let (cb, done) = Callback::channel();
        cb.complete(Some(json!("boom")), Some(json!("ignored")));
        assert_eq!(done.wait().await, Some(Err(json!("boom"))));
    }

    #[tokio::test]
    async fn falsy_error_is_a_success() {
        let (cb, done) = Callback::channel();
        cb.complete(Some(json!(null)), Some(json!({ "ok": true })));
        assert_eq!(done.wait().await, Some(Ok(json!({ "ok": true }))));

        let (cb, done) = Callback::channel();
        cb.complete(Some(json!("")), None);
        assert_eq!(done.wait().await, Some(Ok(Value::Null)));
    }

    #[tokio::test]
    async fn completion_may_arrive_from_another_task() {
        let (cb, done) = Callback::channel();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            cb.succeed(42);
        });
        assert_eq!(done.wait().await, Some(Ok(json!(42))));
    }

    #[tokio::test]
    async fn dropped_callback_yields_none() {
        let (cb, done) = Callback::channel();
        drop(cb);
        assert_eq!(done.wait().await, None);
    }

    #[test]
    fn closures_are_handlers() {
        let handler: Arc<dyn FunctionHandler> =
            Arc::new(|event: InvocationEvent, _ctx: InvocationContext, cb: Callback| {
                cb.succeed(Value::Object(event));
            });
        let (cb, mut done) = Callback::channel();
        handler.call(InvocationEvent::new(), InvocationContext::new("f", "r"), cb);
        assert_eq!(done.rx.try_recv().ok(), Some(Ok(json!({}))));
    }
}
