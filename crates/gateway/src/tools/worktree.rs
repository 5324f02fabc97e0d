//! Worktree tools: advisory file locks.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct LockArgs {
    file_path: String,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_lock",
        ToolCategory::Worktree,
        "Acquire an advisory lock on a file path. Re-lock extends the expiry.",
        schema(
            json!({
                "file_path": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["file_path"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: LockArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let lock = ctx.state.store.lock_file(&agent, &args.file_path).await?;
            Ok(serde_json::to_value(lock)?)
        },
    ));

    registry.add(tool(
        "masc_unlock",
        ToolCategory::Worktree,
        "Release a lock you hold. Non-holders are refused.",
        schema(
            json!({
                "file_path": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["file_path"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: LockArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            ctx.state.store.unlock_file(&agent, &args.file_path).await?;
            Ok(json!({ "unlocked": args.file_path }))
        },
    ));

    registry.add(tool(
        "masc_locks",
        ToolCategory::Worktree,
        "List currently held file locks.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let locks = ctx.state.store.locks().await?;
            let count = locks.len();
            Ok(json!({ "locks": locks, "count": count }))
        },
    ));
}
