//! The tool-dispatch pipeline.
//!
//! One request flows: method lookup → auth → rate limit → mode filter →
//! schema validation → cancellation registration → handler (with a
//! deadline) → telemetry.  Every failure becomes a JSON-RPC error with a
//! taxonomy `kind`; the HTTP layer maps `unauthorized` and `rate_limited`
//! kinds onto 401/429 statuses.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use masc_domain::trace::TraceEvent;
use masc_domain::types::TelemetryKind;
use masc_domain::{Error, Result};

use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND};
use crate::state::AppState;
use crate::tools::ToolContext;

/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Who is calling, as seen by the transport.
#[derive(Debug, Clone, Default)]
pub struct CallerInfo {
    pub token: Option<String>,
    pub remote_ip: String,
    pub agent: Option<String>,
}

impl CallerInfo {
    /// Rate-limit key: the bearer token when present, else the client IP.
    fn limit_key(&self) -> String {
        match &self.token {
            Some(token) => format!("token:{token}"),
            None => format!("ip:{}", self.remote_ip),
        }
    }
}

/// Dispatch one JSON-RPC request.  Returns `None` for notifications.
pub async fn dispatch(
    state: &AppState,
    request: JsonRpcRequest,
    caller: CallerInfo,
) -> Option<JsonRpcResponse> {
    state
        .metrics
        .requests_total
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    match request.method.as_str() {
        "$/cancelRequest" => {
            let target = request
                .params
                .as_ref()
                .and_then(|p| p.get("id"))
                .map(id_to_string);
            if let Some(target) = target {
                let found = state.cancels.cancel(&target);
                tracing::debug!(request_id = %target, found, "cancel requested");
            }
            None
        }
        "ping" => {
            let id = request.id.clone()?;
            Some(JsonRpcResponse::success(id, json!({ "pong": true })))
        }
        "tools/list" => {
            let id = request.id.clone()?;
            Some(match guarded_list(state, &caller).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => {
                    state.metrics.record_error(e.kind());
                    JsonRpcResponse::failure(id, JsonRpcError::from(&e))
                }
            })
        }
        "tools/call" => {
            let id = request.id.clone()?;
            // Unknown tools are the protocol-level -32601, checked before
            // the domain pipeline runs.
            if let Some(name) = request
                .params
                .as_ref()
                .and_then(|p| p.get("name"))
                .and_then(|n| n.as_str())
            {
                if state.registry.get(name).is_none() {
                    return Some(JsonRpcResponse::failure(
                        id,
                        JsonRpcError::protocol(
                            METHOD_NOT_FOUND,
                            format!("unknown tool {name:?}"),
                        ),
                    ));
                }
            }
            let response = match call_tool(state, &id, request.params, &caller).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => {
                    state.metrics.record_error(e.kind());
                    JsonRpcResponse::failure(id, JsonRpcError::from(&e))
                }
            };
            Some(response)
        }
        other => {
            let id = request.id.clone()?;
            Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::protocol(METHOD_NOT_FOUND, format!("unknown method {other:?}")),
            ))
        }
    }
}

async fn guarded_list(state: &AppState, caller: &CallerInfo) -> Result<Value> {
    state.auth.verify(caller.token.as_deref())?;
    state.limiter.check(&caller.limit_key())?;
    let mode = state.store.mode().await?;
    let tools = state.registry.visible(|c| mode.enables(c));
    Ok(json!({ "tools": tools }))
}

async fn call_tool(
    state: &AppState,
    request_id: &Value,
    params: Option<Value>,
    caller: &CallerInfo,
) -> Result<Value> {
    let params = params.ok_or_else(|| Error::InvalidArgument("params required".into()))?;
    let name = params
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| Error::InvalidArgument("params.name required".into()))?
        .to_owned();
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let def = state
        .registry
        .get(&name)
        .ok_or_else(|| Error::NotFound(format!("tool {name}")))?;

    // Auth, then rate limit, then the room's mode filter.
    state.auth.verify(caller.token.as_deref())?;
    state.limiter.check(&caller.limit_key())?;
    let mode = state.store.mode().await?;
    if !mode.enables(def.category) {
        return Err(Error::ToolDisabled(format!(
            "tool {name} (category {}) is not in mode {}",
            def.category.as_str(),
            mode.name
        )));
    }

    // Cancellation handle for the lifetime of this call.
    let rpc_id = id_to_string(request_id);
    let cancel = state.cancels.register(&rpc_id);
    let ctx = ToolContext {
        state: state.clone(),
        agent: caller.agent.clone(),
        cancel: cancel.clone(),
    };

    let started = Instant::now();
    let outcome = match tokio::time::timeout(
        REQUEST_TIMEOUT,
        state.registry.execute(&name, ctx, arguments),
    )
    .await
    {
        Ok(inner) => inner,
        Err(_) => Err(Error::Timeout(format!(
            "tool {name} exceeded {}s",
            REQUEST_TIMEOUT.as_secs()
        ))),
    };
    state.cancels.remove(&rpc_id);

    // A cancelled request reports `cancelled` even if the handler happened
    // to finish between the flag flip and this check.
    let outcome = if cancel.is_cancelled() {
        Err(Error::Cancelled(format!("tool {name} cancelled")))
    } else {
        outcome
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    let success = outcome.is_ok();
    state.metrics.record_tool_call(&name);
    TraceEvent::ToolCalled {
        tool: name.clone(),
        success,
        duration_ms,
    }
    .emit();
    state
        .store
        .telemetry()
        .record(
            TelemetryKind::ToolCalled,
            json!({
                "agent": caller.agent,
                "tool": name,
                "success": success,
                "duration_ms": duration_ms,
            }),
        )
        .await;
    if let Err(e) = &outcome {
        state
            .store
            .telemetry()
            .record(
                TelemetryKind::Error,
                json!({
                    "agent": caller.agent,
                    "tool": name,
                    "kind": e.kind(),
                }),
            )
            .await;
    }

    outcome.map(wrap_result)
}

/// Frame a handler result as MCP content blocks alongside the structured
/// value.
fn wrap_result(value: Value) -> Value {
    let text = serde_json::to_string(&value).unwrap_or_default();
    json!({
        "content": [{ "type": "text", "text": text }],
        "structured": value,
    })
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_key_prefers_token() {
        let with_token = CallerInfo {
            token: Some("abc".into()),
            remote_ip: "1.2.3.4".into(),
            agent: None,
        };
        assert_eq!(with_token.limit_key(), "token:abc");

        let anonymous = CallerInfo {
            token: None,
            remote_ip: "1.2.3.4".into(),
            agent: None,
        };
        assert_eq!(anonymous.limit_key(), "ip:1.2.3.4");
    }

    #[test]
    fn wrap_result_frames_content_blocks() {
        let wrapped = wrap_result(json!({ "status": "claimed" }));
        assert_eq!(wrapped["structured"]["status"], "claimed");
        assert_eq!(wrapped["content"][0]["type"], "text");
    }

    #[test]
    fn id_rendering() {
        assert_eq!(id_to_string(&json!("abc")), "abc");
        assert_eq!(id_to_string(&json!(7)), "7");
    }
}
