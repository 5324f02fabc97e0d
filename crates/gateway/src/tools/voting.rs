//! Voting tools.

use serde::Deserialize;
use serde_json::{json, Value};

use masc_domain::types::ToolCategory;

use super::{parse_args, schema, tool, ToolContext, ToolRegistry};

#[derive(Deserialize)]
struct VoteCreateArgs {
    topic: String,
    options: Vec<String>,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
    #[serde(default)]
    closes_in_secs: Option<f64>,
}

#[derive(Deserialize)]
struct VoteCastArgs {
    vote_id: String,
    option: String,
    #[serde(alias = "agent_id")]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct VoteIdArg {
    vote_id: String,
}

pub fn register(registry: &mut ToolRegistry) {
    registry.add(tool(
        "masc_vote_create",
        ToolCategory::Voting,
        "Open a vote on a topic with at least two options.",
        schema(
            json!({
                "topic": { "type": "string" },
                "options": { "type": "array" },
                "agent_name": { "type": "string" },
                "closes_in_secs": { "type": "number" },
            }),
            &["topic", "options"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: VoteCreateArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let vote = ctx
                .state
                .store
                .vote_create(args.topic, args.options, &agent, args.closes_in_secs)
                .await?;
            Ok(serde_json::to_value(vote)?)
        },
    ));

    registry.add(tool(
        "masc_vote_cast",
        ToolCategory::Voting,
        "Cast (or change) your ballot. One ballot per agent.",
        schema(
            json!({
                "vote_id": { "type": "string" },
                "option": { "type": "string" },
                "agent_name": { "type": "string" },
            }),
            &["vote_id", "option"],
        ),
        |ctx: ToolContext, args: Value| async move {
            let args: VoteCastArgs = parse_args(args)?;
            let agent = ctx.resolve_agent(args.agent_name)?;
            let vote = ctx
                .state
                .store
                .vote_cast(&args.vote_id, &agent, &args.option)
                .await?;
            Ok(json!({ "vote_id": vote.id, "ballots": vote.ballots.len() }))
        },
    ));

    registry.add(tool(
        "masc_vote_status",
        ToolCategory::Voting,
        "Current ballots and tally for a vote.",
        schema(json!({ "vote_id": { "type": "string" } }), &["vote_id"]),
        |ctx: ToolContext, args: Value| async move {
            let args: VoteIdArg = parse_args(args)?;
            let (vote, tally) = ctx.state.store.vote_status(&args.vote_id).await?;
            Ok(json!({ "vote": vote, "tally": tally }))
        },
    ));

    registry.add(tool(
        "masc_vote_close",
        ToolCategory::Voting,
        "Close a vote and freeze its ballots.",
        schema(json!({ "vote_id": { "type": "string" } }), &["vote_id"]),
        |ctx: ToolContext, args: Value| async move {
            let args: VoteIdArg = parse_args(args)?;
            let (vote, tally) = ctx.state.store.vote_close(&args.vote_id).await?;
            Ok(json!({ "vote": vote, "tally": tally }))
        },
    ));
}
