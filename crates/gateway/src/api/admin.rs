//! Probes and discovery: `/health`, `/metrics`, and the agent card.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};

use masc_domain::types::TaskStatus;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Response {
    let now = state.clock.now();
    Json(serde_json::json!({
        "status": if state.drain.is_draining() { "draining" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "room": state.store.room_id(),
        "cluster": state.store.cluster(),
        "uptime_secs": now - state.started_at,
        "in_flight": state.drain.in_flight(),
    }))
    .into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    // Gauges are sampled live at scrape time.
    let mut gauges: Vec<(&str, &str, f64)> = Vec::new();

    let agents = state.store.agents().await.map(|a| a.len()).unwrap_or(0);
    gauges.push(("masc_agents_present", "agents in the room", agents as f64));

    let pending = state
        .store
        .tasks(Some(TaskStatus::Pending))
        .await
        .map(|t| t.len())
        .unwrap_or(0);
    gauges.push(("masc_tasks_pending", "pending tasks", pending as f64));

    let tempo = state.store.tempo().await.unwrap_or(0.0);
    gauges.push(("masc_tempo_seconds", "supervisor interval", tempo));

    gauges.push((
        "masc_requests_in_flight",
        "requests currently executing",
        state.drain.in_flight() as f64,
    ));

    let body = state.metrics.render(&gauges);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

/// `/.well-known/agent-card.json` — capability discovery for A2A-style
/// clients.
pub async fn agent_card(State(state): State<AppState>) -> Response {
    let mode = state.store.mode().await.unwrap_or_default();
    let tools = state.registry.visible(|c| mode.enables(c));
    let skills: Vec<serde_json::Value> = tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "id": t["name"],
                "description": t["description"],
            })
        })
        .collect();

    Json(serde_json::json!({
        "name": "masc",
        "description": "Multi-agent streaming coordination server",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": {
            "streaming": true,
            "resumable_sse": true,
            "cancellation": true,
        },
        "bindings": [
            { "protocol": "json-rpc", "transport": "http", "path": "/mcp" },
            { "protocol": "sse", "transport": "http", "path": "/sse" },
            { "protocol": "rest", "transport": "http", "path": "/api/v1" },
        ],
        "skills": skills,
    }))
    .into_response()
}
