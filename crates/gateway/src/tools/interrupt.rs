//! Interrupt tools: checkpoint save / interrupt / approve / reject /
//! branch / revert.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct SaveArgs {
    task_id: String,
    state: Value,
}

#[derive(Deserialize)]
struct CheckpointArgs {
    task_id: String,
    checkpoint_id: String,
}

#[derive(Deserialize)]
struct InterruptArgs {
    task_id: String,
    checkpoint_id: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RejectArgs {
    task_id: String,
    checkpoint_id: String,
    reason: String,
}

#[derive(Deserialize)]
struct BranchArgs {
    task_id: String,
    checkpoint_id: String,
    branch_name: String,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_checkpoint_save",
        ToolCategory::Interrupt,
        "Save the next workflow step; completes the previous in-progress step.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "state": {},
            }),
            &["task_id", "state"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: SaveArgs = parse_args(args)?;
            let checkpoint = ctx.state.store.checkpoint_save(&args.task_id, args.state).await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));

    registry.add(tool(
        "masc_checkpoint_get",
        ToolCategory::Interrupt,
        "Fetch one checkpoint (or list a task's steps when checkpoint_id is \"*\").",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
            }),
            &["task_id", "checkpoint_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: CheckpointArgs = parse_args(args)?;
            if args.checkpoint_id == "*" {
                let checkpoints = ctx.state.store.checkpoints(&args.task_id).await?;
                let count = checkpoints.len();
                return Ok(json!({ "checkpoints": checkpoints, "count": count }));
            }
            let checkpoint = ctx
                .state
                .store
                .checkpoint_get(&args.task_id, &args.checkpoint_id)
                .await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));

    registry.add(tool(
        "masc_interrupt",
        ToolCategory::Interrupt,
        "Pause an in-progress checkpoint for review.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
                "message": { "type": "string" },
            }),
            &["task_id", "checkpoint_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: InterruptArgs = parse_args(args)?;
            let checkpoint = ctx
                .state
                .store
                .checkpoint_interrupt(&args.task_id, &args.checkpoint_id, args.message)
                .await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));

    registry.add(tool(
        "masc_approve",
        ToolCategory::Interrupt,
        "Approve an interrupted checkpoint.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
            }),
            &["task_id", "checkpoint_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: CheckpointArgs = parse_args(args)?;
            let checkpoint = ctx
                .state
                .store
                .checkpoint_approve(&args.task_id, &args.checkpoint_id)
                .await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));

    registry.add(tool(
        "masc_reject",
        ToolCategory::Interrupt,
        "Reject an interrupted checkpoint with a reason.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
                "reason": { "type": "string" },
            }),
            &["task_id", "checkpoint_id", "reason"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: RejectArgs = parse_args(args)?;
            let checkpoint = ctx
                .state
                .store
                .checkpoint_reject(&args.task_id, &args.checkpoint_id, args.reason)
                .await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));

    registry.add(tool(
        "masc_branch",
        ToolCategory::Interrupt,
        "Fork an interrupted checkpoint into a named branch.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
                "branch_name": { "type": "string" },
            }),
            &["task_id", "checkpoint_id", "branch_name"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: BranchArgs = parse_args(args)?;
            let (parent, child) = ctx
                .state
                .store
                .checkpoint_branch(&args.task_id, &args.checkpoint_id, args.branch_name)
                .await?;
            Ok(json!({ "parent": parent, "child": child }))
        },
    ));

    registry.add(tool(
        "masc_revert",
        ToolCategory::Interrupt,
        "Time travel: mark a non-terminal checkpoint reverted.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "checkpoint_id": { "type": "string" },
            }),
            &["task_id", "checkpoint_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: CheckpointArgs = parse_args(args)?;
            let checkpoint = ctx
                .state
                .store
                .checkpoint_revert(&args.task_id, &args.checkpoint_id)
                .await?;
            Ok(serde_json::to_value(checkpoint)?)
        },
    ));
}
