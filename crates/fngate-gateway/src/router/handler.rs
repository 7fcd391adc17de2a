//! Per-request dispatch: extract, map, invoke, render.

use crate::error::InvocationFailure;
use crate::invoker::HandlerInvoker;
use crate::router::RouteEntry;
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use fngate_kernel::{InboundRequest, InvocationContext};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// An HTTP request reduced to the parts the mapping language reads.
///
/// Path and query parameters that cannot be decoded are treated as absent.
/// A JSON body that does not parse is rejected with `400`.
#[derive(Debug)]
pub struct HttpRequest(pub InboundRequest);

impl<S> FromRequest<S> for HttpRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path_params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let query = Query::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Query(query)| query)
            .unwrap_or_default();
        let headers = header_map(&parts.headers);
        let is_json = is_json_content_type(&parts.headers);
        let path = parts.uri.path().to_owned();

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(IntoResponse::into_response)?;

        let body = if is_json && !bytes.is_empty() {
            serde_json::from_slice(&bytes).map_err(|e| {
                debug!(error = %e, "rejecting malformed JSON body");
                (StatusCode::BAD_REQUEST, "Bad Request").into_response()
            })?
        } else {
            Value::Object(Map::new())
        };

        Ok(Self(InboundRequest {
            id: Uuid::new_v4().to_string(),
            path,
            body,
            path_params,
            query,
            headers,
        }))
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}

/// `application/json` or any `+json` media type, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == fngate_kernel::mapping::JSON_CONTENT_TYPE || mime.ends_with("+json")
}

/// Serve one request for `route`.
pub(crate) async fn dispatch(
    route: Arc<RouteEntry>,
    invoker: Arc<HandlerInvoker>,
    method: Method,
    HttpRequest(request): HttpRequest,
) -> Response {
    info!(request_id = %request.id, "serving {} {}", method, request.path);

    let event = route.mapping().build_event(&request);
    let context = InvocationContext::new(&route.endpoint().function_name, &request.id);

    match invoker.invoke(&route, event, context).await {
        Ok(value) => render(value),
        Err(e) => InvocationFailure(e).into_response(),
    }
}

/// Success rendering: strings as HTML, `null` as an empty body, anything
/// else as JSON.
pub fn render(value: Value) -> Response {
    match value {
        Value::Null => StatusCode::OK.into_response(),
        Value::String(text) => Html(text).into_response(),
        other => Json(other).into_response(),
    }
}
