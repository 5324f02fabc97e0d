//! End-to-end dispatcher tests: the JSON-RPC pipeline over an in-memory
//! room, covering auth, rate limiting, the mode filter, and the concrete
//! tool scenarios.

use std::sync::Arc;

use serde_json::{json, Value};

use masc_backend::{Encryptor, MemoryBackend};
use masc_domain::clock::{Clock, ManualClock};
use masc_domain::config::{Config, RateLimitConfig, ServerConfig};
use masc_gateway::auth::AuthVerifier;
use masc_gateway::cancel::CancelMap;
use masc_gateway::dispatch::{dispatch, CallerInfo};
use masc_gateway::metrics::Metrics;
use masc_gateway::rate_limit::RateLimiter;
use masc_gateway::rpc::JsonRpcRequest;
use masc_gateway::shutdown::DrainTracker;
use masc_gateway::state::AppState;
use masc_gateway::tools::ToolRegistry;
use masc_room::RoomStore;

async fn app_state(config: Config) -> AppState {
    let clock = Arc::new(ManualClock::new(1_000_000.0));
    let store = RoomStore::open(
        Arc::new(MemoryBackend::new()),
        clock.clone(),
        Encryptor::default(),
        "test".into(),
        "main".into(),
        config.lifecycle.clone(),
    )
    .await
    .unwrap();
    let config = Arc::new(config);
    AppState {
        auth: Arc::new(AuthVerifier::from_config(&config.server).unwrap()),
        limiter: Arc::new(RateLimiter::new(config.limits.clone(), clock.clone())),
        config,
        clock: clock.clone(),
        store: Arc::new(store),
        registry: Arc::new(ToolRegistry::standard()),
        cancels: Arc::new(CancelMap::new()),
        drain: DrainTracker::new(),
        metrics: Arc::new(Metrics::new()),
        started_at: clock.now(),
    }
}

fn request(id: u64, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(json!(id)),
        method: method.into(),
        params: Some(params),
    }
}

fn call(id: u64, tool: &str, arguments: Value) -> JsonRpcRequest {
    request(id, "tools/call", json!({ "name": tool, "arguments": arguments }))
}

fn caller() -> CallerInfo {
    CallerInfo {
        token: None,
        remote_ip: "127.0.0.1".into(),
        agent: None,
    }
}

fn structured(response: &masc_gateway::rpc::JsonRpcResponse) -> &Value {
    &response.result.as_ref().unwrap()["structured"]
}

fn error_kind(response: &masc_gateway::rpc::JsonRpcResponse) -> &str {
    response.error.as_ref().unwrap().data.as_ref().unwrap()["kind"]
        .as_str()
        .unwrap()
}

#[tokio::test]
async fn join_claim_done_scenario() {
    let state = app_state(Config::default()).await;

    let joined = dispatch(
        &state,
        call(1, "masc_join", json!({ "agent_id": "claude", "capabilities": ["ts"] })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(structured(&joined)["status"], "active");

    let added = dispatch(
        &state,
        call(2, "masc_add_task", json!({ "id": "t1", "title": "X", "priority": 3 })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(structured(&added)["id"], "t1");

    let claimed = dispatch(
        &state,
        call(3, "masc_claim", json!({ "task_id": "t1", "agent_name": "claude" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(structured(&claimed)["status"], "claimed");
    assert_eq!(structured(&claimed)["claimed_by"], "claude");

    // A second agent's claim on the same task conflicts.
    dispatch(
        &state,
        call(4, "masc_join", json!({ "agent_id": "gemini" })),
        caller(),
    )
    .await
    .unwrap();
    let contested = dispatch(
        &state,
        call(5, "masc_claim", json!({ "task_id": "t1", "agent_name": "gemini" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(error_kind(&contested), "conflict");

    let done = dispatch(
        &state,
        call(6, "masc_done", json!({ "task_id": "t1", "agent_name": "claude" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(structured(&done)["status"], "done");
}

#[tokio::test]
async fn tools_list_respects_mode() {
    let state = app_state(Config::default()).await;

    let listed = dispatch(&state, request(1, "tools/list", json!({})), caller())
        .await
        .unwrap();
    let full_count = listed.result.as_ref().unwrap()["tools"]
        .as_array()
        .unwrap()
        .len();
    assert!(full_count > 30);

    dispatch(
        &state,
        call(2, "masc_mode_set", json!({ "mode": "minimal" })),
        caller(),
    )
    .await
    .unwrap();

    let minimal = dispatch(&state, request(3, "tools/list", json!({})), caller())
        .await
        .unwrap();
    let minimal_tools = minimal.result.as_ref().unwrap()["tools"].as_array().unwrap();
    assert!(minimal_tools.len() < full_count);
    assert!(!minimal_tools.iter().any(|t| t["name"] == "masc_vote_create"));

    // Invoking a filtered tool reports tool_disabled.
    let disabled = dispatch(
        &state,
        call(4, "masc_vote_create", json!({ "topic": "x", "options": ["a", "b"] })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(error_kind(&disabled), "tool_disabled");
}

#[tokio::test]
async fn unknown_tool_is_method_not_found() {
    let state = app_state(Config::default()).await;
    let response = dispatch(
        &state,
        call(1, "masc_frobnicate", json!({})),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(response.error.as_ref().unwrap().code, -32601);
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let state = app_state(Config::default()).await;
    let response = dispatch(&state, request(1, "tools/destroy", json!({})), caller())
        .await
        .unwrap();
    assert_eq!(response.error.as_ref().unwrap().code, -32601);
}

#[tokio::test]
async fn auth_gates_tool_calls() {
    let config = Config {
        server: ServerConfig {
            token: Some("sekrit".into()),
            ..ServerConfig::default()
        },
        ..Config::default()
    };
    let state = app_state(config).await;

    let denied = dispatch(
        &state,
        call(1, "masc_join", json!({ "agent_id": "a" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(error_kind(&denied), "unauthorized");

    let allowed = dispatch(
        &state,
        call(2, "masc_join", json!({ "agent_id": "a" })),
        CallerInfo {
            token: Some("sekrit".into()),
            remote_ip: "127.0.0.1".into(),
            agent: None,
        },
    )
    .await
    .unwrap();
    assert!(allowed.error.is_none());
}

#[tokio::test]
async fn rate_limit_exhaustion_surfaces() {
    let config = Config {
        limits: RateLimitConfig {
            enabled: true,
            capacity: 2,
            refill_per_sec: 0.001,
        },
        ..Config::default()
    };
    let state = app_state(config).await;

    for id in 1..=2 {
        let ok = dispatch(&state, request(id, "tools/list", json!({})), caller())
            .await
            .unwrap();
        assert!(ok.error.is_none());
    }
    let limited = dispatch(&state, request(3, "tools/list", json!({})), caller())
        .await
        .unwrap();
    assert_eq!(error_kind(&limited), "rate_limited");
}

#[tokio::test]
async fn missing_required_argument_is_invalid_params() {
    let state = app_state(Config::default()).await;
    let response = dispatch(&state, call(1, "masc_claim", json!({})), caller())
        .await
        .unwrap();
    let error = response.error.as_ref().unwrap();
    assert_eq!(error.code, -32602);
    assert_eq!(error_kind(&response), "invalid_argument");
}

#[tokio::test]
async fn cancel_request_is_a_notification() {
    let state = app_state(Config::default()).await;
    let token = state.cancels.register("42");
    let response = dispatch(
        &state,
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: None,
            method: "$/cancelRequest".into(),
            params: Some(json!({ "id": 42 })),
        },
        caller(),
    )
    .await;
    assert!(response.is_none());
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn drift_guard_scenario() {
    let state = app_state(Config::default()).await;
    let response = dispatch(
        &state,
        call(
            1,
            "masc_verify_handoff",
            json!({
                "original": "Implement JWT auth",
                "received": "Implement session cookie auth",
            }),
        ),
        caller(),
    )
    .await
    .unwrap();
    let report = structured(&response);
    assert_eq!(report["verified"], false);
    assert_eq!(report["kind"], "drift");
    assert_eq!(report["drift_type"], "semantic");
    assert!(report["similarity"].as_f64().unwrap() < 0.85);
}

#[tokio::test]
async fn handoff_scenario_over_tools() {
    let state = app_state(Config::default()).await;
    for agent in ["a", "b", "c"] {
        dispatch(
            &state,
            call(1, "masc_join", json!({ "agent_id": agent })),
            caller(),
        )
        .await
        .unwrap();
    }
    dispatch(
        &state,
        call(2, "masc_add_task", json!({ "id": "t1", "title": "x" })),
        caller(),
    )
    .await
    .unwrap();

    let created = dispatch(
        &state,
        call(
            3,
            "masc_handoff_create",
            json!({
                "from_agent": "a",
                "task_id": "t1",
                "goal": "finish it",
                "reason": "context_limit",
                "context_pct": 95.0,
            }),
        ),
        caller(),
    )
    .await
    .unwrap();
    let handoff_id = structured(&created)["id"].as_str().unwrap().to_owned();

    let first = dispatch(
        &state,
        call(4, "masc_handoff_claim", json!({ "handoff_id": handoff_id, "agent_name": "b" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(structured(&first)["status"], "claimed");
    assert_eq!(structured(&first)["to_agent"], "b");

    let second = dispatch(
        &state,
        call(5, "masc_handoff_claim", json!({ "handoff_id": handoff_id, "agent_name": "c" })),
        caller(),
    )
    .await
    .unwrap();
    assert_eq!(error_kind(&second), "conflict");

    let fetched = dispatch(
        &state,
        call(6, "masc_handoff_get", json!({ "handoff_id": handoff_id })),
        caller(),
    )
    .await
    .unwrap();
    let prompt = structured(&fetched)["prompt"].as_str().unwrap();
    assert!(prompt.contains("# Handoff from `a`"));
}

#[tokio::test]
async fn ping_answers_without_auth_checks() {
    let state = app_state(Config::default()).await;
    let response = dispatch(&state, request(1, "ping", json!({})), caller())
        .await
        .unwrap();
    assert_eq!(response.result.as_ref().unwrap()["pong"], true);
}
