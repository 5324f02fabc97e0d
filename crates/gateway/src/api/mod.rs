//! HTTP surface: the JSON-RPC tool endpoint, the SSE notification
//! stream, the read-only REST API, and the admin probes.

pub mod admin;
pub mod mcp;
pub mod rest;
pub mod sse;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_token;
use crate::state::AppState;

/// Build the full router.
///
/// `/mcp` and `/sse` do their own auth inside the pipeline (the dispatcher
/// needs the raw token for rate-limit keying; `/sse` accepts a `token`
/// query parameter).  The REST reads sit behind the bearer middleware;
/// probes and the agent card are public.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(admin::health))
        .route("/metrics", get(admin::metrics))
        .route("/.well-known/agent-card.json", get(admin::agent_card))
        .route("/mcp", post(mcp::mcp))
        .route("/sse", get(sse::stream));

    let protected = Router::new()
        .route("/api/v1/status", get(rest::status))
        .route("/api/v1/tasks", get(rest::tasks))
        .route("/api/v1/agents", get(rest::agents))
        .route("/api/v1/messages", get(rest::messages))
        .route("/api/v1/credits", get(rest::credits))
        .layer(middleware::from_fn_with_state(state, require_token));

    public.merge(protected)
}
