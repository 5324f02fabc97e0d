//! Cellular-division tools: handoff capsules and the drift guard.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::{Handoff, HandoffReason, HandoffStatus, ToolCategory};
use masc_domain::{Error, Result};
use masc_selection::classify_drift;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct HandoffCreateArgs {
    #[serde(alias = "agent_name", alias = "agent_id")]
    from_agent: Option<String>,
    task_id: String,
    #[serde(default)]
    reason: Option<HandoffReason>,
    #[serde(default)]
    context_pct: f64,
    goal: String,
    #[serde(default)]
    progress_summary: String,
    #[serde(default)]
    completed_steps: Vec<String>,
    #[serde(default)]
    pending_steps: Vec<String>,
    #[serde(default)]
    key_decisions: Vec<String>,
    #[serde(default)]
    assumptions: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    unresolved_errors: Vec<String>,
    #[serde(default)]
    modified_files: Vec<String>,
}

#[derive(Deserialize)]
struct HandoffAgentArgs {
    handoff_id: String,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct HandoffIdArg {
    handoff_id: String,
}

#[derive(Deserialize)]
struct HandoffListArgs {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct VerifyHandoffArgs {
    original: String,
    received: String,
    #[serde(default)]
    threshold: Option<f64>,
}

fn parse_handoff_status(raw: &str) -> Result<HandoffStatus> {
    serde_json::from_value(Value::String(raw.to_owned()))
        .map_err(|_| Error::InvalidArgument(format!("unknown handoff status {raw:?}")))
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_handoff_create",
        ToolCategory::Cellular,
        "Persist a handoff capsule for a successor to claim.",
        schema(
            json!({
                "from_agent": { "type": "string" },
                "task_id": { "type": "string" },
                "reason": { "type": "string" },
                "context_pct": { "type": "number" },
                "goal": { "type": "string" },
                "progress_summary": { "type": "string" },
                "completed_steps": { "type": "array" },
                "pending_steps": { "type": "array" },
                "key_decisions": { "type": "array" },
                "assumptions": { "type": "array" },
                "warnings": { "type": "array" },
                "unresolved_errors": { "type": "array" },
                "modified_files": { "type": "array" },
            }),
            &["task_id", "goal"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: HandoffCreateArgs = parse_args(args)?;
            let from_agent = ctx.resolve_agent(args.from_agent)?;
            let capsule = ctx
                .state
                .store
                .handoff_create(Handoff {
                    id: String::new(),
                    from_agent,
                    to_agent: None,
                    task_id: args.task_id,
                    reason: args.reason.unwrap_or(HandoffReason::Explicit),
                    context_pct: args.context_pct,
                    goal: args.goal,
                    progress_summary: args.progress_summary,
                    completed_steps: args.completed_steps,
                    pending_steps: args.pending_steps,
                    key_decisions: args.key_decisions,
                    assumptions: args.assumptions,
                    warnings: args.warnings,
                    unresolved_errors: args.unresolved_errors,
                    modified_files: args.modified_files,
                    created_at: 0.0,
                    status: HandoffStatus::Pending,
                })
                .await?;
            Ok(serde_json::to_value(capsule)?)
        },
    ));

    registry.add(tool(
        "masc_handoff_claim",
        ToolCategory::Cellular,
        "Claim a pending capsule. Exactly one concurrent claimant wins.",
        schema(
            json!({
                "handoff_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["handoff_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: HandoffAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let capsule = ctx
                .state
                .store
                .handoff_claim(&args.handoff_id, &agent)
                .await?;
            Ok(serde_json::to_value(capsule)?)
        },
    ));

    registry.add(tool(
        "masc_handoff_get",
        ToolCategory::Cellular,
        "Fetch a capsule with its markdown resume prompt.",
        schema(json!({ "handoff_id": { "type": "string" } }), &["handoff_id"]),
        |ctx: ToolContext, args: Value| async move {
            let args: HandoffIdArg = parse_args(args)?;
            let (capsule, prompt) = ctx.state.store.handoff_get(&args.handoff_id).await?;
            Ok(json!({ "handoff": capsule, "prompt": prompt }))
        },
    ));

    registry.add(tool(
        "masc_handoff_complete",
        ToolCategory::Cellular,
        "Acknowledge a claimed capsule as consumed. This is what counts as handoff success.",
        schema(
            json!({
                "handoff_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["handoff_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: HandoffAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let capsule = ctx
                .state
                .store
                .handoff_complete(&args.handoff_id, &agent)
                .await?;
            Ok(serde_json::to_value(capsule)?)
        },
    ));

    registry.add(tool(
        "masc_handoff_list",
        ToolCategory::Cellular,
        "List capsules, optionally filtered by status.",
        schema(json!({ "status": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: HandoffListArgs = parse_args(args)?;
            let status = args
                .status
                .as_deref()
                .map(parse_handoff_status)
                .transpose()?;
            let handoffs = ctx.state.store.handoffs(status).await?;
            let count = handoffs.len();
            Ok(json!({ "handoffs": handoffs, "count": count }))
        },
    ));

    registry.add(tool(
        "masc_verify_handoff",
        ToolCategory::Cellular,
        "Drift guard: compare a received context against the original.",
        schema(
            json!({
                "original": { "type": "string" },
                "received": { "type": "string" },
                "threshold": { "type": "number" },
            }),
            &["original", "received"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: VerifyHandoffArgs = parse_args(args)?;
            let drift = &ctx.state.config.drift;
            let report = classify_drift(
                &args.original,
                &args.received,
                args.threshold.unwrap_or(drift.threshold),
                drift.jaccard_weight,
                drift.cosine_weight,
            );
            if !report.verified {
                masc_domain::trace::TraceEvent::DriftDetected {
                    similarity: report.similarity,
                    drift_type: report
                        .drift_type
                        .map(|t| format!("{t:?}").to_lowercase())
                        .unwrap_or_default(),
                }
                .emit();
                let mut value = serde_json::to_value(&report)?;
                value["kind"] = json!("drift");
                return Ok(value);
            }
            Ok(serde_json::to_value(&report)?)
        },
    ));
}
