//! The dynamic tool registry.
//!
//! Tools register under a category at startup; the room's mode decides
//! which categories are visible.  Each tool carries a JSON schema for
//! `tools/list` and a boxed async handler.  Names follow
//! `masc_<verb>[_noun]`.

mod cache;
mod cellular;
mod comm;
mod core;
mod discovery;
mod health;
mod interrupt;
mod portal;
mod tempo;
mod voting;
mod worktree;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use masc_domain::types::ToolCategory;
use masc_domain::{Error, Result};

use crate::cancel::CancelToken;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool definition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a handler gets to work with.
#[derive(Clone)]
pub struct ToolContext {
    pub state: AppState,
    /// Caller identity from the `X-MASC-Agent` header, if present.
    pub agent: Option<String>,
    pub cancel: CancelToken,
}

impl ToolContext {
    /// Emit a progress notification for long-running handlers.
    pub fn progress(&self, message: &str, pct: Option<f64>) {
        self.state.store.publish_event(
            "progress",
            serde_json::json!({
                "agent": self.agent,
                "message": message,
                "pct": pct,
            }),
        );
    }

    /// Resolve the acting agent: explicit argument wins, header is the
    /// fallback.
    pub fn resolve_agent(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .filter(|a| !a.is_empty())
            .or_else(|| self.agent.clone())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "agent_name argument or X-MASC-Agent header required".into(),
                )
            })
    }
}

type BoxedHandler = Arc<
    dyn Fn(ToolContext, Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        + Send
        + Sync,
>;

pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    pub input_schema: Value,
    handler: BoxedHandler,
}

/// Wrap an async closure into a [`ToolDef`].
fn tool<F, Fut>(
    name: &'static str,
    category: ToolCategory,
    description: &'static str,
    input_schema: Value,
    f: F,
) -> ToolDef
where
    F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    ToolDef {
        name,
        description,
        category,
        input_schema,
        handler: Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
    }
}

/// Deserialize tool arguments, surfacing failures as `invalid_argument`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::InvalidArgument(e.to_string()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolDef>,
}

impl ToolRegistry {
    /// Build the full registry with every category's tools.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        core::register(&mut registry);
        comm::register(&mut registry);
        worktree::register(&mut registry);
        voting::register(&mut registry);
        portal::register(&mut registry);
        cellular::register(&mut registry);
        interrupt::register(&mut registry);
        cache::register(&mut registry);
        tempo::register(&mut registry);
        health::register(&mut registry);
        discovery::register(&mut registry);
        registry
    }

    pub(crate) fn add(&mut self, def: ToolDef) {
        debug_assert!(
            !self.tools.contains_key(def.name),
            "duplicate tool {}",
            def.name
        );
        self.tools.insert(def.name, def);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    /// Definitions visible under the given category set, for `tools/list`.
    pub fn visible(&self, enabled: impl Fn(ToolCategory) -> bool) -> Vec<Value> {
        let mut defs: Vec<&ToolDef> = self
            .tools
            .values()
            .filter(|d| enabled(d.category))
            .collect();
        defs.sort_by_key(|d| d.name);
        defs.iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "inputSchema": d.input_schema,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, args: Value) -> Result<Value> {
        let def = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("tool {name}")))?;
        validate_against_schema(&def.input_schema, &args)?;
        (def.handler)(ctx, args).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Schema validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Check arguments against the subset of JSON Schema the tool surface
/// uses: an object with `required` fields and per-property `type`.
/// Handlers re-validate values via serde; this pass produces the friendly
/// protocol-level errors.
fn validate_against_schema(schema: &Value, args: &Value) -> Result<()> {
    let Some(object) = args.as_object() else {
        return Err(Error::InvalidArgument("arguments must be an object".into()));
    };
    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field in required.iter().filter_map(|f| f.as_str()) {
            if !object.contains_key(field) {
                return Err(Error::InvalidArgument(format!(
                    "missing required argument {field:?}"
                )));
            }
        }
    }
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in object {
            let Some(expected) = props.get(key).and_then(|p| p.get("type")) else {
                continue;
            };
            let Some(expected) = expected.as_str() else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok && !value.is_null() {
                return Err(Error::InvalidArgument(format!(
                    "argument {key:?} must be a {expected}"
                )));
            }
        }
    }
    Ok(())
}

/// Shorthand for the `{type: object, properties, required}` schemas every
/// tool declares.
pub(crate) fn schema(properties: Value, required: &[&str]) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_the_full_surface() {
        let registry = ToolRegistry::standard();
        for name in [
            "masc_join",
            "masc_claim",
            "masc_claim_next",
            "masc_done",
            "masc_broadcast",
            "masc_lock",
            "masc_vote_create",
            "masc_portal_open",
            "masc_handoff_create",
            "masc_handoff_claim",
            "masc_verify_handoff",
            "masc_checkpoint_save",
            "masc_cache_set",
            "masc_tempo_get",
            "masc_ping",
            "masc_modes",
        ] {
            assert!(registry.get(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn visibility_respects_category_filter() {
        let registry = ToolRegistry::standard();
        let core_only = registry.visible(|c| c == ToolCategory::Core);
        assert!(core_only.iter().any(|d| d["name"] == "masc_join"));
        assert!(!core_only.iter().any(|d| d["name"] == "masc_vote_create"));
    }

    #[test]
    fn schema_validation_catches_missing_and_mistyped() {
        let s = schema(
            serde_json::json!({
                "task_id": { "type": "string" },
                "priority": { "type": "integer" },
            }),
            &["task_id"],
        );
        assert!(validate_against_schema(&s, &serde_json::json!({ "task_id": "t1" })).is_ok());
        assert!(validate_against_schema(&s, &serde_json::json!({})).is_err());
        assert!(
            validate_against_schema(&s, &serde_json::json!({ "task_id": 42 })).is_err()
        );
        assert!(validate_against_schema(
            &s,
            &serde_json::json!({ "task_id": "t1", "priority": "high" })
        )
        .is_err());
    }
}
