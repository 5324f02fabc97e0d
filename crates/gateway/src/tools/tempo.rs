//! Tempo tools: inspect and pin the background-loop interval.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct TempoSetArgs {
    interval_secs: f64,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_tempo_get",
        ToolCategory::Tempo,
        "Current supervisor interval in seconds.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let tempo = ctx.state.store.tempo().await?;
            Ok(json!({ "tempo": tempo }))
        },
    ));

    registry.add(tool(
        "masc_tempo_set",
        ToolCategory::Tempo,
        "Set the supervisor interval (clamped to configured bounds).",
        schema(
            json!({ "interval_secs": { "type": "number" } }),
            &["interval_secs"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: TempoSetArgs = parse_args(args)?;
            let tempo = ctx.state.store.set_tempo(args.interval_secs).await?;
            Ok(json!({ "tempo": tempo }))
        },
    ));
}
