//! Gateway runtime error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fngate_kernel::config::ConfigError;
use fngate_kernel::{GatewayError, InvocationError};
use thiserror::Error;

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] GatewayError),

    #[error("failed to load manifest: {0}")]
    Manifest(#[from] ConfigError),

    #[error("init hook failed: {0}")]
    Init(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServeResult<T> = Result<T, ServeError>;

/// Request-time failure rendered as a bare `500`.
///
/// The cause is logged server-side; clients never see it.
#[derive(Debug)]
pub struct InvocationFailure(pub InvocationError);

impl IntoResponse for InvocationFailure {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
