//! Comm tools: broadcast and paginated message reads.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::{MessageKind, MessagePriority, ToolCategory};

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct BroadcastArgs {
    #[serde(alias = "agent_name", alias = "agent_id")]
    sender: Option<String>,
    body: Value,
    #[serde(default)]
    priority: Option<MessagePriority>,
    #[serde(default)]
    kind: Option<MessageKind>,
}

#[derive(Deserialize)]
struct MessagesArgs {
    #[serde(default)]
    since_seq: u64,
    #[serde(default)]
    limit: u64,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_broadcast",
        ToolCategory::Comm,
        "Append a message to the room log and notify subscribers.",
        schema(
            json!({
                "sender": { "type": "string" },
                "body": {},
                "priority": { "type": "string" },
                "kind": { "type": "string" },
            }),
            &["body"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: BroadcastArgs = parse_args(args)?;
            let sender = ctx.resolve_agent(args.sender)?;
            let message = ctx
                .state
                .store
                .broadcast(
                    &sender,
                    args.kind.unwrap_or(MessageKind::Broadcast),
                    args.body,
                    args.priority.unwrap_or_default(),
                )
                .await?;
            ctx.state
                .metrics
                .messages_total
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Ok(serde_json::to_value(message)?)
        },
    ));

    registry.add(tool(
        "masc_messages",
        ToolCategory::Comm,
        "Read messages with seq greater than since_seq, oldest first.",
        schema(
            json!({
                "since_seq": { "type": "integer" },
                "limit": { "type": "integer" },
            }),
            &[],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: MessagesArgs = parse_args(args)?;
            let messages = ctx.state.store.messages(args.since_seq, args.limit).await?;
            let max_seq = messages.last().map(|m| m.seq).unwrap_or(args.since_seq);
            Ok(json!({ "messages": messages, "max_seq": max_seq }))
        },
    ));
}
