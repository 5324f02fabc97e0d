//! Health tools: ping, fitness scores, agent selection.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;
use masc_selection::{fitness_score, select_agent, Candidate, SelectionStrategy};

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct FitnessArgs {
    #[serde(default, alias = "agent_id")]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct SelectArgs {
    #[serde(default)]
    strategy: Option<SelectionStrategy>,
    #[serde(default)]
    required_capabilities: Vec<String>,
    /// Seed for deterministic draws (tests).
    #[serde(default)]
    seed: Option<u64>,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_ping",
        ToolCategory::Health,
        "Liveness probe; echoes the server clock and uptime.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let now = ctx.state.clock.now();
            Ok(json!({
                "pong": true,
                "now": now,
                "uptime_secs": now - ctx.state.started_at,
            }))
        },
    ));

    registry.add(tool(
        "masc_fitness",
        ToolCategory::Health,
        "Fitness breakdown for one agent, or the whole room.",
        schema(json!({ "agent_name": { "type": "string" } }), &[]),
        |ctx: ToolContext, args: Value| async move {
            let args: FitnessArgs = parse_args(args)?;
            let metrics = ctx.state.store.telemetry().agent_metrics().await;
            match args.agent_name {
                Some(agent) => {
                    let agent_metrics = metrics.get(&agent).cloned().unwrap_or_default();
                    let score = fitness_score(&agent_metrics);
                    Ok(json!({ "agent": agent, "fitness": score }))
                }
                None => {
                    let scores: serde_json::Map<String, Value> = metrics
                        .iter()
                        .map(|(agent, m)| {
                            (agent.clone(), serde_json::to_value(fitness_score(m)).unwrap_or(Value::Null))
                        })
                        .collect();
                    Ok(Value::Object(scores))
                }
            }
        },
    ));

    registry.add(tool(
        "masc_synapses",
        ToolCategory::Health,
        "The Hebbian collaboration graph: directed edges with weights.",
        schema(json!({}), &[]),
        |ctx: ToolContext, _args: Value| async move {
            let graph = ctx.state.store.synapses().await?;
            let count = graph.len();
            Ok(json!({ "synapses": graph, "count": count }))
        },
    ));

    registry.add(tool(
        "masc_select_agent",
        ToolCategory::Health,
        "Pick an agent by fitness: roulette, elite_top_k, capability_first, or random.",
        schema(
            json!({
                "strategy": { "type": "string" },
                "required_capabilities": { "type": "array" },
                "seed": { "type": "integer" },
            }),
            &[],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: SelectArgs = parse_args(args)?;
            let metrics = ctx.state.store.telemetry().agent_metrics().await;
            let candidates: Vec<Candidate> = ctx
                .state
                .store
                .agents()
                .await?
                .into_iter()
                .map(|agent| {
                    let agent_metrics = metrics.get(&agent.id).cloned().unwrap_or_default();
                    Candidate {
                        score: fitness_score(&agent_metrics).score,
                        agent_id: agent.id,
                        capabilities: agent.capabilities,
                    }
                })
                .collect();

            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let picked = select_agent(
                args.strategy.unwrap_or_default(),
                &candidates,
                &args.required_capabilities,
                &mut rng,
            );
            Ok(json!({ "selected": picked, "pool_size": candidates.len() }))
        },
    ));
}
