//! `GET /sse` — the resumable notification stream.
//!
//! Reconnection contract: a client presenting `Last-Event-ID: N` gets
//! every buffered event with `seq > N` replayed before live events; if
//! `N` has fallen below the buffer floor it gets a single `resume_gap`
//! event and must refetch state.  A `: keepalive` comment goes out every
//! 15 seconds so intermediaries keep the connection open.

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::Stream;
use serde::Deserialize;

use masc_room::{Notification, ReplayOutcome};

use crate::auth::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SseQuery {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Comma-separated kind filter.
    #[serde(default)]
    pub kinds: Option<String>,
}

pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<SseQuery>,
    headers: HeaderMap,
) -> Response {
    // Token may arrive as a query parameter (EventSource cannot set
    // headers) or as a bearer header.
    let token = query.token.clone().or_else(|| {
        bearer_token(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok()),
        )
        .map(str::to_owned)
    });
    if let Err(e) = state.auth.verify(token.as_deref()) {
        return (
            axum::http::StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": e.to_string(), "kind": e.kind() })),
        )
            .into_response();
    }
    if state.drain.is_draining() {
        return (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            [(axum::http::header::RETRY_AFTER, "5")],
        )
            .into_response();
    }

    let last_event_id: Option<u64> = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let kinds = query.kinds.as_deref().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>()
    });
    // Subscriber ids must be unique per connection: an agent may hold two
    // streams (e.g. across a reconnect overlap) without them colliding.
    let subscriber_id = match &query.agent {
        Some(agent) => format!("{agent}:{}", uuid::Uuid::new_v4()),
        None => uuid::Uuid::new_v4().to_string(),
    };

    Sse::new(event_stream(state, subscriber_id, kinds, last_event_id))
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keepalive"),
        )
        .into_response()
}

fn event_stream(
    state: AppState,
    subscriber_id: String,
    kinds: Option<Vec<String>>,
    last_event_id: Option<u64>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        state.metrics.sse_connections.fetch_add(1, Ordering::Relaxed);
        let _connection = ConnectionGauge { state: state.clone() };

        // Subscribe before replaying so nothing published in between is
        // lost (it will sit in the ring until we drain it).
        let subscription = state.store.bus().subscribe(subscriber_id, kinds);

        // Everything at or below this seq has already been delivered, so
        // live events overlapping the replay are dropped, not duplicated.
        let mut delivered_floor = last_event_id.unwrap_or(0);

        if let Some(last_seen) = last_event_id {
            match state.store.bus().replay_from(last_seen) {
                ReplayOutcome::Replayed(events) => {
                    for event in events {
                        delivered_floor = delivered_floor.max(event.seq);
                        yield Ok(to_sse_event(&event));
                    }
                }
                ReplayOutcome::Gap => {
                    yield Ok(Event::default()
                        .event("resume_gap")
                        .data(serde_json::json!({ "requested": last_seen }).to_string()));
                }
            }
        }

        loop {
            match subscription.recv().await {
                Some(event) if event.seq != 0 && event.seq <= delivered_floor => {
                    // Already replayed above.
                    continue;
                }
                Some(event) => {
                    if event.kind == "lag" {
                        state
                            .metrics
                            .notifications_lagged_total
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    yield Ok(to_sse_event(&event));
                }
                None => {
                    // Bus closed: graceful shutdown.
                    yield Ok(Event::default().event("shutdown").data("{}"));
                    break;
                }
            }
        }
    }
}

fn to_sse_event(event: &Notification) -> Event {
    let data = serde_json::to_string(&event.data).unwrap_or_else(|_| "{}".into());
    let sse = Event::default().event(event.kind.clone()).data(data);
    if event.seq > 0 {
        sse.id(event.seq.to_string())
    } else {
        sse
    }
}

struct ConnectionGauge {
    state: AppState,
}

impl Drop for ConnectionGauge {
    fn drop(&mut self) {
        self.state
            .metrics
            .sse_connections
            .fetch_sub(1, Ordering::Relaxed);
    }
}
