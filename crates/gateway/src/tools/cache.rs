//! Cache tools: room-scoped key/value with TTL.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct CacheSetArgs {
    key: String,
    value: String,
    #[serde(default)]
    ttl_secs: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct CacheKeyArg {
    key: String,
}

#[derive(Deserialize)]
struct CacheListArgs {
    #[serde(default)]
    tag: Option<String>,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_cache_set",
        ToolCategory::Cache,
        "Store a value with an optional TTL and tags. Keys are sanitised.",
        schema(
            json!({
                "key": { "type": "string" },
                "value": { "type": "string" },
                "ttl_secs": { "type": "number" },
                "tags": { "type": "array" },
            }),
            &["key", "value"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: CacheSetArgs = parse_args(args)?;
            let entry = ctx
                .state
                .store
                .cache_set(&args.key, args.value, args.ttl_secs, args.tags)
                .await?;
            Ok(serde_json::to_value(entry)?)
        },
    ));

    registry.add(tool(
        "masc_cache_get",
        ToolCategory::Cache,
        "Fetch a cache entry; expired entries are deleted and reported absent.",
        schema(json!({ "key": { "type": "string" } }), &["key"]),
        |ctx: ToolContext, args: Value| async move {
            let args: CacheKeyArg = parse_args(args)?;
            match ctx.state.store.cache_get(&args.key).await? {
                Some(entry) => Ok(serde_json::to_value(entry)?),
                None => Ok(json!({ "found": false })),
            }
        },
    ));

    registry.add(tool(
        "masc_cache_delete",
        ToolCategory::Cache,
        "Delete a cache entry.",
        schema(json!({ "key": { "type": "string" } }), &["key"]),
        |ctx: ToolContext, args: Value| async move {
            let args: CacheKeyArg = parse_args(args)?;
            let existed = ctx.state.store.cache_delete(&args.key).await?;
            Ok(json!({ "deleted": existed }))
        },
    ));

    registry.add(tool(
        "masc_cache_list",
        ToolCategory::Cache,
        "List live cache entries, optionally filtered by tag.",
        schema(json!({ "tag": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: CacheListArgs = parse_args(args)?;
            let entries = ctx.state.store.cache_list(args.tag.as_deref()).await?;
            let count = entries.len();
            Ok(json!({ "entries": entries, "count": count }))
        },
    ));
}
