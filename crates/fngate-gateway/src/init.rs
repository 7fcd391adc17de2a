//! Startup init hooks.
//!
//! An [`InitHook`] runs once after all function routes are registered and
//! before the listener binds.  It receives the assembled [`Router`] together
//! with the [`HandlerTable`] and returns the router to serve, so it can add
//! its own routes or layers.

use crate::error::{ServeError, ServeResult};
use axum::Router;
use fngate_kernel::{EndpointDeclaration, HandlerRef};
use libloading::{Library, Symbol};
use std::collections::BTreeMap;
use std::ffi::c_int;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Symbol looked up by [`DylibInitHook`].
pub const INIT_SYMBOL: &str = "fngate_init";

/// Signature of the exported init function; non-zero means failure.
pub type NativeInitFn = unsafe extern "C" fn() -> c_int;

/// One declared function and where its handler lives.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerEntry {
    /// Function name, the table key.
    pub key: String,
    pub handler: HandlerRef,
    /// Endpoints bound to this function, in declaration order.
    pub endpoints: Vec<EndpointDeclaration>,
}

impl HandlerEntry {
    pub fn library_path(&self) -> &Path {
        &self.handler.module
    }

    pub fn export(&self) -> &str {
        &self.handler.export
    }
}

/// Declared functions keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerTable {
    entries: BTreeMap<String, HandlerEntry>,
}

impl HandlerTable {
    /// Group endpoint declarations by function name.
    pub fn from_endpoints<'a>(endpoints: impl IntoIterator<Item = &'a EndpointDeclaration>) -> Self {
        let mut entries: BTreeMap<String, HandlerEntry> = BTreeMap::new();
        for endpoint in endpoints {
            entries
                .entry(endpoint.function_name.clone())
                .or_insert_with(|| HandlerEntry {
                    key: endpoint.function_name.clone(),
                    handler: endpoint.handler.clone(),
                    endpoints: Vec::new(),
                })
                .endpoints
                .push(endpoint.clone());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&HandlerEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Customizes the application before it starts serving.
pub trait InitHook: Send + Sync {
    fn init(&self, app: Router, handlers: &HandlerTable) -> ServeResult<Router>;
}

impl<F> InitHook for F
where
    F: Fn(Router, &HandlerTable) -> ServeResult<Router> + Send + Sync,
{
    fn init(&self, app: Router, handlers: &HandlerTable) -> ServeResult<Router> {
        self(app, handlers)
    }
}

/// Init hook backed by a shared library exporting `fngate_init`.
///
/// The library stays loaded for the life of the hook so code it registered
/// (threads, callbacks) remains valid.
pub struct DylibInitHook {
    path: PathBuf,
    library: Library,
}

impl DylibInitHook {
    /// Open the library at `path`.
    pub fn load(path: impl Into<PathBuf>) -> ServeResult<Self> {
        let path = path.into();
        // SAFETY: the init library is named explicitly by the operator.
        let library = unsafe { Library::new(&path) }
            .map_err(|e| ServeError::Init(format!("unable to load {}: {e}", path.display())))?;
        Ok(Self { path, library })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InitHook for DylibInitHook {
    fn init(&self, app: Router, handlers: &HandlerTable) -> ServeResult<Router> {
        for entry in handlers.iter() {
            debug!(function = %entry.key, handler = %entry.handler, "handler available to init hook");
        }

        // SAFETY: `fngate_init` must have the `NativeInitFn` signature.
        let status = unsafe {
            let init: Symbol<NativeInitFn> =
                self.library.get(INIT_SYMBOL.as_bytes()).map_err(|_| {
                    ServeError::Init(format!(
                        "{} does not export '{INIT_SYMBOL}'",
                        self.path.display()
                    ))
                })?;
            init()
        };

        if status != 0 {
            return Err(ServeError::Init(format!(
                "{INIT_SYMBOL} in {} returned {status}",
                self.path.display()
            )));
        }

        info!(path = %self.path.display(), "init hook completed");
        Ok(app)
    }
}

impl std::fmt::Debug for DylibInitHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibInitHook").field("path", &self.path).finish()
    }
}
