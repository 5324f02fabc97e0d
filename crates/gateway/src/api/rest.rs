//! `GET /api/v1/*` — read-only JSON surface for dashboards.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use masc_domain::types::TaskStatus;
use masc_domain::Error;

use crate::state::AppState;

/// Standardised JSON error body: `{ "error": ..., "kind": ... }`.
fn api_error(e: &Error) -> Response {
    let status = match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "error": e.to_string(), "kind": e.kind() })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub since_seq: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub agent: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Response {
    match state.store.status().await {
        Ok(status) => Json(serde_json::json!({ "status": status })).into_response(),
        Err(e) => api_error(&e),
    }
}

pub async fn tasks(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let status = match query.status.as_deref() {
        Some(raw) => match serde_json::from_value::<TaskStatus>(serde_json::json!(raw)) {
            Ok(status) => Some(status),
            Err(_) => {
                return api_error(&Error::InvalidArgument(format!(
                    "unknown task status {raw:?}"
                )))
            }
        },
        None => None,
    };
    match state.store.tasks(status).await {
        Ok(mut tasks) => {
            if let Some(agent) = &query.agent {
                tasks.retain(|t| t.claimed_by.as_deref() == Some(agent.as_str()));
            }
            let total = tasks.len();
            let offset = query.offset.unwrap_or(0);
            let limit = query.limit.unwrap_or(100) as usize;
            let page: Vec<_> = tasks.into_iter().skip(offset).take(limit).collect();
            Json(serde_json::json!({ "tasks": page, "total": total })).into_response()
        }
        Err(e) => api_error(&e),
    }
}

pub async fn agents(State(state): State<AppState>) -> Response {
    match state.store.agents().await {
        Ok(agents) => {
            let total = agents.len();
            Json(serde_json::json!({ "agents": agents, "total": total })).into_response()
        }
        Err(e) => api_error(&e),
    }
}

pub async fn messages(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let since_seq = query.since_seq.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    match state.store.messages(since_seq, limit).await {
        Ok(messages) => {
            let max_seq = messages.last().map(|m| m.seq).unwrap_or(since_seq);
            Json(serde_json::json!({ "messages": messages, "max_seq": max_seq })).into_response()
        }
        Err(e) => api_error(&e),
    }
}

pub async fn credits(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let mut credits = state.store.telemetry().credit_counters().await;
    if let Some(agent) = &query.agent {
        credits.retain(|k, _| k == agent);
    }
    Json(serde_json::json!({ "credits": credits })).into_response()
}
