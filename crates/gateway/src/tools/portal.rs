//! Portal tools: private agent-to-agent channels.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct PortalOpenArgs {
    #[serde(alias = "agent_a", alias = "agent_name")]
    from: Option<String>,
    #[serde(alias = "agent_b")]
    peer: String,
}

#[derive(Deserialize)]
struct PortalSendArgs {
    portal_id: String,
    payload: Value,
    #[serde(alias = "agent_name", alias = "agent_id")]
    from: Option<String>,
}

#[derive(Deserialize)]
struct PortalAgentArgs {
    portal_id: String,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_portal_open",
        ToolCategory::Portal,
        "Open (or reuse) a private channel to another agent.",
        schema(
            json!({
                "peer": { "type": "string" },
                "from": { "type": "string" },
            }),
            &["peer"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: PortalOpenArgs = parse_args(args)?;
            let from = ctx.resolve_agent(args.from)?;
            let portal = ctx.state.store.portal_open(&from, &args.peer).await?;
            Ok(serde_json::to_value(portal)?)
        },
    ));

    registry.add(tool(
        "masc_portal_send",
        ToolCategory::Portal,
        "Send a payload into the peer's inbox (bounded; oldest dropped on overflow).",
        schema(
            json!({
                "portal_id": { "type": "string" },
                "payload": {},
                "from": { "type": "string" },
            }),
            &["portal_id", "payload"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: PortalSendArgs = parse_args(args)?;
            let from = ctx.resolve_agent(args.from)?;
            ctx.state
                .store
                .portal_send(&args.portal_id, &from, args.payload)
                .await?;
            Ok(json!({ "sent": true }))
        },
    ));

    registry.add(tool(
        "masc_portal_recv",
        ToolCategory::Portal,
        "Drain your inbox on a portal.",
        schema(
            json!({
                "portal_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["portal_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: PortalAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let messages = ctx.state.store.portal_recv(&args.portal_id, &agent).await?;
            let count = messages.len();
            Ok(json!({ "messages": messages, "count": count }))
        },
    ));

    registry.add(tool(
        "masc_portal_close",
        ToolCategory::Portal,
        "Close a portal; further sends are refused.",
        schema(
            json!({
                "portal_id": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["portal_id"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: PortalAgentArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let portal = ctx.state.store.portal_close(&args.portal_id, &agent).await?;
            Ok(serde_json::to_value(portal)?)
        },
    ));
}
