//! Native handlers loaded from shared libraries.
//!
//! A handler is an exported C-ABI function:
//!
//! ```c
//! void handler(const char *event_json,
//!              const char *context_json,
//!              void *token,
//!              void (*complete)(void *token, const char *error_json, const char *result_json));
//! ```
//!
//! The handler must call `complete` exactly once with the `token` it was
//! given, from any thread.  A null or falsy `error_json` reports success.
//! Strings that are not valid JSON are delivered as JSON strings.

use fngate_kernel::{
    Callback, FunctionHandler, HandlerRef, HandlerResolver, InvocationContext, InvocationEvent,
    ResolveError,
};
use libloading::{Library, Symbol};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_void};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// Completion function passed to native handlers.
pub type NativeCompleteFn =
    extern "C" fn(token: *mut c_void, error: *const c_char, result: *const c_char);

/// Signature of an exported native handler.
pub type NativeHandlerFn = unsafe extern "C" fn(
    event: *const c_char,
    context: *const c_char,
    token: *mut c_void,
    complete: NativeCompleteFn,
);

/// Resolves [`HandlerRef`]s by opening `module` as a shared library and
/// looking up `export`.
///
/// Opened libraries are kept for the life of the resolver.
#[derive(Default)]
pub struct DylibResolver {
    libraries: Mutex<HashMap<PathBuf, Arc<Library>>>,
}

impl DylibResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn library(&self, handler: &HandlerRef) -> Result<Arc<Library>, ResolveError> {
        let mut libraries = self.libraries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(library) = libraries.get(&handler.module) {
            return Ok(Arc::clone(library));
        }

        // SAFETY: loading a library runs its initialisers; the module path
        // comes from the operator's own project manifest.
        let library = unsafe { Library::new(&handler.module) }.map_err(|e| ResolveError::Load {
            path: handler.module.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %handler.module.display(), "shared library loaded");

        let library = Arc::new(library);
        libraries.insert(handler.module.clone(), Arc::clone(&library));
        Ok(library)
    }
}

impl HandlerResolver for DylibResolver {
    fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn FunctionHandler>, ResolveError> {
        let library = self.library(handler)?;
        Ok(Arc::new(DylibHandler::load(library, handler)?))
    }
}

impl std::fmt::Debug for DylibResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let libraries = self.libraries.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DylibResolver")
            .field("libraries", &libraries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A handler function exported from a loaded library.
pub struct DylibHandler {
    reference: HandlerRef,
    func: NativeHandlerFn,
    // Keeps `func` valid.
    library: Arc<Library>,
}

impl DylibHandler {
    /// Look up `handler.export` in an already opened `library`.
    pub fn load(library: Arc<Library>, handler: &HandlerRef) -> Result<Self, ResolveError> {
        // SAFETY: the exported symbol is required to have the
        // `NativeHandlerFn` signature; the pointer stays valid while
        // `library` is held.
        let func = unsafe {
            let symbol: Symbol<NativeHandlerFn> =
                library.get(handler.export.as_bytes()).map_err(|_| ResolveError::MissingExport {
                    path: handler.module.display().to_string(),
                    export: handler.export.clone(),
                })?;
            *symbol
        };

        Ok(Self {
            reference: handler.clone(),
            func,
            library,
        })
    }

    pub fn reference(&self) -> &HandlerRef {
        &self.reference
    }
}

impl FunctionHandler for DylibHandler {
    fn call(&self, event: InvocationEvent, context: InvocationContext, callback: Callback) {
        let (event, context) = match (to_c_json(&Value::Object(event)), to_c_json(&context)) {
            (Ok(event), Ok(context)) => (event, context),
            (Err(e), _) | (_, Err(e)) => {
                error!(handler = %self.reference, error = %e, "failed to encode invocation");
                callback.fail(e);
                return;
            }
        };

        let call = NativeCall {
            func: self.func,
            library: Arc::clone(&self.library),
            event,
            context,
            token: Token(Box::into_raw(Box::new(callback)).cast()),
        };

        // Native code may block; keep it off the async workers.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || call.run());
            }
            Err(_) => {
                std::thread::spawn(move || call.run());
            }
        }
    }
}

impl std::fmt::Debug for DylibHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibHandler").field("reference", &self.reference).finish()
    }
}

struct Token(*mut c_void);

// SAFETY: the token is an owned `Box<Callback>` and `Callback` is `Send`.
unsafe impl Send for Token {}

struct NativeCall {
    func: NativeHandlerFn,
    library: Arc<Library>,
    event: CString,
    context: CString,
    token: Token,
}

impl NativeCall {
    fn run(self) {
        // SAFETY: both strings outlive the call and `complete_trampoline`
        // matches `NativeCompleteFn`.
        unsafe {
            (self.func)(
                self.event.as_ptr(),
                self.context.as_ptr(),
                self.token.0,
                complete_trampoline,
            );
        }
        drop(self.library);
    }
}

extern "C" fn complete_trampoline(token: *mut c_void, error: *const c_char, result: *const c_char) {
    if token.is_null() {
        return;
    }
    // SAFETY: `token` was produced by `Box::into_raw` in `DylibHandler::call`
    // and handlers call `complete` once.
    let callback = unsafe { Box::from_raw(token.cast::<Callback>()) };
    let error = unsafe { read_json(error) };
    let result = unsafe { read_json(result) };
    callback.complete(error, result);
}

fn to_c_json<T: serde::Serialize>(value: &T) -> Result<CString, String> {
    let text = serde_json::to_string(value).map_err(|e| e.to_string())?;
    CString::new(text).map_err(|e| e.to_string())
}

/// Decode a nullable C string as JSON, falling back to a JSON string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn read_json(ptr: *const c_char) -> Option<Value> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy();
    Some(serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_library_is_a_load_error() {
        let resolver = DylibResolver::new();
        let err = resolver
            .resolve(&HandlerRef::new("/nonexistent/libnope.so", "handler"))
            .err()
            .unwrap();
        assert!(matches!(err, ResolveError::Load { path, .. } if path == "/nonexistent/libnope.so"));
    }

    #[test]
    fn read_json_decodes_or_wraps() {
        let json_text = CString::new(r#"{"ok":true}"#).unwrap();
        let plain = CString::new("not json").unwrap();
        unsafe {
            assert_eq!(read_json(std::ptr::null()), None);
            assert_eq!(read_json(json_text.as_ptr()), Some(json!({ "ok": true })));
            assert_eq!(read_json(plain.as_ptr()), Some(json!("not json")));
        }
    }

    #[tokio::test]
    async fn trampoline_completes_the_boxed_callback() {
        let (callback, completion) = Callback::channel();
        let token: *mut c_void = Box::into_raw(Box::new(callback)).cast();
        let error = CString::new(r#""boom""#).unwrap();

        complete_trampoline(token, error.as_ptr(), std::ptr::null());
        assert_eq!(completion.wait().await, Some(Err(json!("boom"))));
    }

    #[tokio::test]
    async fn trampoline_null_error_is_success() {
        let (callback, completion) = Callback::channel();
        let token: *mut c_void = Box::into_raw(Box::new(callback)).cast();
        let result = CString::new("[1,2]").unwrap();

        complete_trampoline(token, std::ptr::null(), result.as_ptr());
        assert_eq!(completion.wait().await, Some(Ok(json!([1, 2]))));
    }
}
