//! Project manifest: the declared functions and their HTTP endpoints.
//!
//! ```yaml
//! functions:
//!   - name: hello
//!     runtime: native
//!     path: functions/hello
//!     handler: hello/index/handler.handler
//!     endpoints:
//!       - path: hello/{name}
//!         method: GET
//!         request_templates:
//!           application/json:
//!             greeting: "$input.params('name')"
//! ```
//!
//! A handler string `dir/file.export` names the shared library `file`
//! (platform naming, e.g. `libfile.so`) inside the function directory and
//! the symbol `export` within it.

use crate::error::GatewayError;
use crate::types::{EndpointDeclaration, HandlerRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use tracing::warn;

/// The only runtime the simulator can execute.
pub const NATIVE_RUNTIME: &str = "native";

fn default_runtime() -> String {
    NATIVE_RUNTIME.to_string()
}

/// Root of a project manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
}

/// One declared function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Function directory, relative to the manifest unless absolute.
    #[serde(default)]
    pub path: PathBuf,
    /// `dir/file.export`.
    pub handler: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// One HTTP endpoint of a function, as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub request_templates: Map<String, Value>,
}

impl FunctionDeclaration {
    /// Resolve the handler string against the function directory.
    pub fn handler_ref(&self, base_dir: &Path) -> Result<HandlerRef, GatewayError> {
        let invalid = || GatewayError::InvalidHandler(self.name.clone(), self.handler.clone());

        let last = self.handler.rsplit('/').next().unwrap_or_default();
        // `file.export`; anything after a second dot is ignored.
        let mut parts = last.split('.');
        let file = parts.next().unwrap_or_default();
        let export = parts.next().ok_or_else(invalid)?;
        if file.is_empty() || export.is_empty() {
            return Err(invalid());
        }

        let dir = if self.path.is_absolute() {
            self.path.clone()
        } else {
            base_dir.join(&self.path)
        };
        Ok(HandlerRef::new(
            dir.join(format!("{DLL_PREFIX}{file}{DLL_SUFFIX}")),
            export,
        ))
    }

    /// Endpoint declarations bound to this function's handler.
    pub fn endpoint_declarations(
        &self,
        base_dir: &Path,
    ) -> Result<Vec<EndpointDeclaration>, GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::EmptyFunctionName);
        }
        let handler = self.handler_ref(base_dir)?;
        Ok(self
            .endpoints
            .iter()
            .map(|ep| EndpointDeclaration {
                path: ep.path.clone(),
                method: ep.method.clone(),
                request_templates: ep.request_templates.clone(),
                handler: handler.clone(),
                function_name: self.name.clone(),
            })
            .collect())
    }
}

impl ProjectManifest {
    /// All endpoints of all native functions, in declaration order.
    ///
    /// Functions declared for other runtimes are skipped with a warning.
    pub fn endpoint_declarations(
        &self,
        base_dir: &Path,
    ) -> Result<Vec<EndpointDeclaration>, GatewayError> {
        let mut declarations = Vec::new();
        for function in &self.functions {
            if function.runtime != NATIVE_RUNTIME {
                warn!(
                    function = %function.name,
                    runtime = %function.runtime,
                    "skipping function with unsupported runtime"
                );
                continue;
            }
            declarations.extend(function.endpoint_declarations(base_dir)?);
        }
        Ok(declarations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn function(handler: &str) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "index".into(),
            runtime: NATIVE_RUNTIME.into(),
            path: PathBuf::from("homepage/index"),
            handler: handler.into(),
            endpoints: vec![EndpointConfig {
                path: "homepage/index".into(),
                method: "GET".into(),
                request_templates: Map::new(),
            }],
        }
    }

    #[test]
    fn handler_string_names_library_and_export() {
        let handler = function("homepage/index/handler.handler")
            .handler_ref(Path::new("/project"))
            .unwrap();
        assert_eq!(
            handler.module,
            PathBuf::from(format!("/project/homepage/index/{DLL_PREFIX}handler{DLL_SUFFIX}"))
        );
        assert_eq!(handler.export, "handler");
    }

    #[test]
    fn extra_dots_after_export_are_ignored() {
        let handler = function("dir/a.b.c").handler_ref(Path::new("/p")).unwrap();
        assert_eq!(
            handler.module,
            PathBuf::from(format!("/p/homepage/index/{DLL_PREFIX}a{DLL_SUFFIX}"))
        );
        assert_eq!(handler.export, "b");
    }

    #[test]
    fn handler_without_export_is_invalid() {
        assert_eq!(
            function("homepage/index/handler").handler_ref(Path::new("/")),
            Err(GatewayError::InvalidHandler(
                "index".into(),
                "homepage/index/handler".into()
            ))
        );
        assert!(function("dir/.x").handler_ref(Path::new("/")).is_err());
    }

    #[test]
    fn non_native_functions_are_skipped() {
        let mut node = function("a/b.c");
        node.runtime = "nodejs".into();
        let manifest = ProjectManifest {
            functions: vec![node, function("a/b.c")],
        };
        let endpoints = manifest.endpoint_declarations(Path::new("/p")).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].function_name, "index");
        assert_eq!(endpoints[0].method, "GET");
    }

    #[test]
    fn manifest_deserializes_with_defaults() {
        let manifest: ProjectManifest = serde_json::from_value(json!({
            "functions": [{
                "name": "hello",
                "handler": "hello/handler.run",
                "endpoints": [{ "path": "hello/{name}", "method": "get" }]
            }]
        }))
        .unwrap();
        let function = &manifest.functions[0];
        assert_eq!(function.runtime, NATIVE_RUNTIME);
        assert!(function.endpoints[0].request_templates.is_empty());
    }
}
