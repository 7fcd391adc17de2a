//! [`HandlerResolver`](fngate_kernel::HandlerResolver) implementations.
//!
//! - [`StaticResolver`]: handlers registered in-process, keyed by reference.
//! - [`DylibResolver`]: handlers exported from native shared libraries.

mod dylib;
mod static_resolver;

pub use dylib::{DylibHandler, DylibResolver, NativeCompleteFn, NativeHandlerFn};
pub use static_resolver::StaticResolver;
