//! Discovery tools: modes and the tool-surface filter.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::{Mode, ToolCategory};

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct ModeSetArgs {
    mode: String,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_modes",
        ToolCategory::Discovery,
        "List mode presets and the currently active one.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let current = ctx.state.store.mode().await?;
            let presets: Vec<Value> = ["full", "minimal", "coordination"]
                .iter()
                .filter_map(|name| Mode::preset(name))
                .map(|m| json!({ "name": m.name, "categories": m.categories }))
                .collect();
            Ok(json!({ "current": current, "presets": presets }))
        },
    ));

    registry.add(tool(
        "masc_mode_set",
        ToolCategory::Discovery,
        "Switch the room's tool-surface mode.",
        schema(json!({ "mode": { "type": "string" } }), &["mode"]),
        |ctx: ToolContext, args: Value| async move {
            let args: ModeSetArgs = parse_args(args)?;
            let mode = ctx.state.store.set_mode(&args.mode).await?;
            Ok(serde_json::to_value(mode)?)
        },
    ));
}
