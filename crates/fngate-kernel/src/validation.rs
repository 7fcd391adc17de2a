//! Gateway configuration container and definition-time validation.
//!
//! [`GatewayConfig`] aggregates the listener settings and the declared
//! endpoints and exposes a single [`validate()`](GatewayConfig::validate)
//! that checks every structural invariant *before* a socket is bound.

use crate::error::GatewayError;
use crate::mapping::RequestMapping;
use crate::types::{EndpointDeclaration, HttpMethod};
use std::path::PathBuf;

/// Default listening port of the simulator.
pub const DEFAULT_PORT: u16 = 1465;

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Interface to bind.
    pub host: String,
    /// URL prefix prepended to every endpoint path.
    pub prefix: String,
    /// Optional initialization hook (shared library) run before listening.
    pub init: Option<PathBuf>,
    /// Every declared endpoint, in declaration order.
    pub endpoints: Vec<EndpointDeclaration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            prefix: String::new(),
            init: None,
            endpoints: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder: set the bind interface.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Builder: set the URL prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Builder: set the init hook library.
    pub fn with_init(mut self, init: impl Into<PathBuf>) -> Self {
        self.init = Some(init.into());
        self
    }

    /// Builder: add an endpoint.
    pub fn with_endpoint(mut self, endpoint: EndpointDeclaration) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Builder: add several endpoints.
    pub fn with_endpoints(mut self, endpoints: impl IntoIterator<Item = EndpointDeclaration>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// The prefix as it is joined onto endpoint paths: empty, or ending in
    /// exactly one `/`.
    pub fn normalized_prefix(&self) -> String {
        if self.prefix.is_empty() {
            return String::new();
        }
        format!("{}/", self.prefix.trim_end_matches('/'))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate all structural invariants of this configuration.
    ///
    /// Checks, in order:
    /// 1. `port` is non-zero.
    /// 2. Every endpoint belongs to a named function.
    /// 3. Every endpoint declares a supported HTTP method.
    /// 4. Every `application/json` request template parses.
    ///
    /// Duplicate routes are detected when the route table is built.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.port == 0 {
            return Err(GatewayError::InvalidPort);
        }

        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
        }

        Ok(())
    }
}

/// Checks shared by [`GatewayConfig::validate`] and route registration.
pub fn validate_endpoint(endpoint: &EndpointDeclaration) -> Result<HttpMethod, GatewayError> {
    if endpoint.function_name.trim().is_empty() {
        return Err(GatewayError::EmptyFunctionName);
    }
    let method = HttpMethod::from_str_ci(&endpoint.method).ok_or_else(|| {
        GatewayError::UnsupportedMethod(endpoint.function_name.clone(), endpoint.method.clone())
    })?;
    RequestMapping::from_templates(&endpoint.request_templates).map_err(|e| {
        GatewayError::InvalidRequestTemplate(endpoint.function_name.clone(), e.to_string())
    })?;
    Ok(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerRef;
    use serde_json::json;

    fn endpoint(method: &str) -> EndpointDeclaration {
        EndpointDeclaration::new("hello", method, "hello/{name}", HandlerRef::new("lib", "handler"))
    }

    #[test]
    fn defaults_match_the_simulator() {
        let cfg = GatewayConfig::new();
        assert_eq!(cfg.port, 1465);
        assert_eq!(cfg.prefix, "");
        assert!(cfg.init.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        assert_eq!(
            GatewayConfig::new().with_port(0).validate(),
            Err(GatewayError::InvalidPort)
        );
    }

    #[test]
    fn prefix_is_suffixed_with_one_separator() {
        assert_eq!(GatewayConfig::new().normalized_prefix(), "");
        assert_eq!(GatewayConfig::new().with_prefix("api").normalized_prefix(), "api/");
        assert_eq!(GatewayConfig::new().with_prefix("api//").normalized_prefix(), "api/");
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let cfg = GatewayConfig::new().with_endpoint(endpoint("TRACE"));
        assert_eq!(
            cfg.validate(),
            Err(GatewayError::UnsupportedMethod("hello".into(), "TRACE".into()))
        );
    }

    #[test]
    fn empty_function_name_is_rejected() {
        let mut ep = endpoint("GET");
        ep.function_name = "  ".into();
        assert_eq!(
            GatewayConfig::new().with_endpoint(ep).validate(),
            Err(GatewayError::EmptyFunctionName)
        );
    }

    #[test]
    fn broken_request_template_is_rejected() {
        let ep = endpoint("POST").with_request_template("application/json", json!("{ nope"));
        assert!(matches!(
            GatewayConfig::new().with_endpoint(ep).validate(),
            Err(GatewayError::InvalidRequestTemplate(name, _)) if name == "hello"
        ));
    }

    #[test]
    fn validate_endpoint_returns_parsed_method() {
        assert_eq!(validate_endpoint(&endpoint("post")), Ok(HttpMethod::Post));
    }
}
