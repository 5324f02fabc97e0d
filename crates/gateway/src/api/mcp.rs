//! `POST /mcp` — the JSON-RPC 2.0 tool endpoint.
//!
//! With `Accept: text/event-stream` the response is a chunked SSE body
//! carrying the result as one event; otherwise a single JSON body.
//! `unauthorized` and `rate_limited` outcomes map onto 401/429 statuses
//! with the JSON-RPC error as the body.

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

use crate::auth::bearer_token;
use crate::dispatch::{dispatch, CallerInfo};
use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR};
use crate::state::AppState;

pub async fn mcp(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Refuse new work while draining.
    let Some(_guard) = state.drain.try_acquire() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "5")],
            axum::Json(serde_json::json!({ "error": "shutting down" })),
        )
            .into_response();
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            let code = if body.trim().is_empty() || serde_json::from_str::<serde_json::Value>(&body).is_err() {
                PARSE_ERROR
            } else {
                INVALID_REQUEST
            };
            let response = JsonRpcResponse::failure(
                serde_json::Value::Null,
                JsonRpcError::protocol(code, e.to_string()),
            );
            return (StatusCode::BAD_REQUEST, axum::Json(response)).into_response();
        }
    };

    let caller = CallerInfo {
        token: bearer_token(header_str(&headers, "authorization")).map(str::to_owned),
        remote_ip: addr.ip().to_string(),
        agent: header_str(&headers, "x-masc-agent").map(str::to_owned),
    };
    let wants_sse = header_str(&headers, "accept")
        .map(|accept| accept.contains("text/event-stream"))
        .unwrap_or(false);

    let Some(response) = dispatch(&state, request, caller).await else {
        // Notification: no body.
        return StatusCode::ACCEPTED.into_response();
    };

    let status = status_for(&response);
    if wants_sse {
        let payload = serde_json::to_string(&response).unwrap_or_default();
        let body = format!("event: message\ndata: {payload}\n\n");
        return Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }
    (status, axum::Json(response)).into_response()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// HTTP status for a JSON-RPC outcome: auth and throttling surface at the
/// transport layer too.
fn status_for(response: &JsonRpcResponse) -> StatusCode {
    let Some(error) = &response.error else {
        return StatusCode::OK;
    };
    match error
        .data
        .as_ref()
        .and_then(|d| d.get("kind"))
        .and_then(|k| k.as_str())
    {
        Some("unauthorized") => StatusCode::UNAUTHORIZED,
        Some("rate_limited") => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::OK,
    }
}
