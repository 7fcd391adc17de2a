use fngate_kernel::{FunctionHandler, HandlerRef, HandlerResolver, ResolveError};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolver backed by an in-memory table of handlers.
///
/// Used by embedders and tests that supply handlers as Rust closures.
#[derive(Default)]
pub struct StaticResolver {
    handlers: HashMap<HandlerRef, Arc<dyn FunctionHandler>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `reference`, replacing any previous one.
    pub fn register(&mut self, reference: HandlerRef, handler: impl FunctionHandler + 'static) {
        self.handlers.insert(reference, Arc::new(handler));
    }

    pub fn with_handler(
        mut self,
        reference: HandlerRef,
        handler: impl FunctionHandler + 'static,
    ) -> Self {
        self.register(reference, handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerResolver for StaticResolver {
    fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn FunctionHandler>, ResolveError> {
        self.handlers
            .get(handler)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(handler.to_string()))
    }
}

impl std::fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("StaticResolver").field("handlers", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngate_kernel::{Callback, InvocationContext, InvocationEvent};

    #[test]
    fn unknown_reference_is_not_found() {
        let resolver = StaticResolver::new();
        let err = resolver.resolve(&HandlerRef::new("lib", "missing")).err().unwrap();
        assert!(matches!(err, ResolveError::NotFound(name) if name == "lib#missing"));
    }

    #[test]
    fn registered_reference_resolves() {
        let reference = HandlerRef::new("lib", "ok");
        let resolver = StaticResolver::new().with_handler(
            reference.clone(),
            |_e: InvocationEvent, _c: InvocationContext, cb: Callback| cb.succeed(true),
        );
        assert_eq!(resolver.len(), 1);
        assert!(resolver.resolve(&reference).is_ok());
    }
}
