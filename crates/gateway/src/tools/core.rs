//! Core tools: membership, tasks, and the room status snapshot.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::{TaskStatus, ToolCategory};
use masc_domain::{Error, Result};

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct JoinArgs {
    #[serde(alias = "agent_name")]
    agent_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
struct AgentArg {
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct AddTaskArgs {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    required_capabilities: Vec<String>,
    #[serde(default)]
    source: Option<String>,
}

fn default_priority() -> u8 {
    3
}

#[derive(Deserialize)]
struct TaskAgentArgs {
    task_id: String,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct ClaimNextArgs {
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
    /// Restrict to tasks whose required capabilities the agent covers.
    #[serde(default)]
    filter_capabilities: bool,
}

#[derive(Deserialize)]
struct TaskIdArg {
    task_id: String,
}

#[derive(Deserialize)]
struct TasksArgs {
    #[serde(default)]
    status: Option<String>,
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    serde_json::from_value(Value::String(raw.to_owned()))
        .map_err(|_| Error::InvalidArgument(format!("unknown task status {raw:?}")))
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_join",
        ToolCategory::Core,
        "Join the room (or revive a previous identity) with a set of capabilities.",
        schema(
            json!({
                "agent_id": { "type": "string" },
                "display_name": { "type": "string" },
                "capabilities": { "type": "array" },
                "role": { "type": "string" },
            }),
            &["agent_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: JoinArgs = parse_args(args)?;
            let agent = ctx
                .state
                .store
                .join(&args.agent_id, args.display_name, args.capabilities, args.role)
                .await?;
            Ok(serde_json::to_value(agent)?)
        },
    ));

    registry.add(tool(
        "masc_leave",
        ToolCategory::Core,
        "Leave the room, releasing claimed tasks and held locks.",
        schema(json!({ "agent_name": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: AgentArg = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let record = ctx.state.store.leave(&agent).await?;
            Ok(serde_json::to_value(record)?)
        },
    ));

    registry.add(tool(
        "masc_heartbeat",
        ToolCategory::Core,
        "Refresh the agent's heartbeat; revives a zombie that was not yet collected.",
        schema(json!({ "agent_name": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: AgentArg = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            match ctx.state.store.heartbeat(&agent).await? {
                Some(record) => Ok(serde_json::to_value(record)?),
                None => Ok(json!({ "known": false })),
            }
        },
    ));

    registry.add(tool(
        "masc_agents",
        ToolCategory::Core,
        "List agents currently present in the room.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let agents = ctx.state.store.agents().await?;
            let count = agents.len();
            Ok(json!({ "agents": agents, "count": count }))
        },
    ));

    registry.add(tool(
        "masc_add_task",
        ToolCategory::Core,
        "Add a pending task to the queue. Priority 1 (highest) to 5.",
        schema(
            json!({
                "id": { "type": "string" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "priority": { "type": "integer" },
                "payload": { "type": "object" },
                "required_capabilities": { "type": "array" },
                "source": { "type": "string" },
            }),
            &["title"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: AddTaskArgs = parse_args(args)?;
            let task = ctx
                .state
                .store
                .add_task(
                    args.id,
                    args.title,
                    args.description,
                    args.priority,
                    args.payload,
                    args.required_capabilities,
                    args.source,
                )
                .await?;
            Ok(serde_json::to_value(task)?)
        },
    ));

    registry.add(tool(
        "masc_claim",
        ToolCategory::Core,
        "Claim a specific pending task. Exactly one concurrent claimant wins.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["task_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: TaskAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let task = ctx.state.store.claim(&args.task_id, &agent).await?;
            Ok(serde_json::to_value(task)?)
        },
    ));

    registry.add(tool(
        "masc_claim_next",
        ToolCategory::Core,
        "Claim the highest-priority pending task (oldest wins ties).",
        schema(
            json!({
                "agent_name": { "type": "string" },
                "filter_capabilities": { "type": "boolean" },
            }),
            &[],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: ClaimNextArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            match ctx
                .state
                .store
                .claim_next(&agent, args.filter_capabilities)
                .await?
            {
                Some(task) => Ok(serde_json::to_value(task)?),
                None => Ok(json!({ "task": null, "reason": "queue empty" })),
            }
        },
    ));

    registry.add(tool(
        "masc_start_task",
        ToolCategory::Core,
        "Mark a claimed task as in progress.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["task_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: TaskAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let task = ctx.state.store.start_task(&args.task_id, &agent).await?;
            Ok(serde_json::to_value(task)?)
        },
    ));

    registry.add(tool(
        "masc_done",
        ToolCategory::Core,
        "Complete a task you claimed; releases your file locks.",
        schema(
            json!({
                "task_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["task_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: TaskAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let task = ctx.state.store.done(&args.task_id, &agent).await?;
            Ok(serde_json::to_value(task)?)
        },
    ));

    registry.add(tool(
        "masc_cancel_task",
        ToolCategory::Core,
        "Cancel a task from any non-terminal state.",
        schema(json!({ "task_id": { "type": "string" } }), &["task_id"]),
        |ctx: ToolContext, args: Value| async move {
            let args: TaskIdArg = parse_args(args)?;
            let task = ctx.state.store.cancel_task(&args.task_id).await?;
            Ok(serde_json::to_value(task)?)
        },
    ));

    registry.add(tool(
        "masc_tasks",
        ToolCategory::Core,
        "List tasks, optionally filtered by status.",
        schema(json!({ "status": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: TasksArgs = parse_args(args)?;
            let status = args.status.as_deref().map(parse_status).transpose()?;
            let tasks = ctx.state.store.tasks(status).await?;
            let count = tasks.len();
            Ok(json!({ "tasks": tasks, "count": count }))
        },
    ));

    registry.add(tool(
        "masc_pause",
        ToolCategory::Core,
        "Pause the room: surfaced in status so agents back off new work.",
        schema(json!({ "reason": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            #[derive(Deserialize)]
            struct PauseArgs {
                #[serde(default)]
                reason: Option<String>,
            }
            let args: PauseArgs = parse_args(args)?;
            let room = ctx.state.store.pause(args.reason).await?;
            Ok(serde_json::to_value(room)?)
        },
    ));

    registry.add(tool(
        "masc_resume",
        ToolCategory::Core,
        "Resume a paused room.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let room = ctx.state.store.resume().await?;
            Ok(serde_json::to_value(room)?)
        },
    ));

    registry.add(tool(
        "masc_status",
        ToolCategory::Core,
        "One-call room overview: agents, tasks, votes, locks, tempo, mode.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let status = ctx.state.store.status().await?;
            Ok(serde_json::to_value(status)?)
        },
    ));
}
