//! Canonical logical schema, shared by every backend.
//!
//! The filesystem backend maps these keys directly to paths under
//! `.masc/`; Redis and Postgres treat them as opaque strings.  Keeping
//! the schema in one place means a room persisted by one backend reads
//! identically through another.

/// Per-entity JSON documents.
pub fn agent(room: &str, id: &str) -> String {
    format!("rooms/{room}/agents/{id}.json")
}

pub fn task(room: &str, id: &str) -> String {
    format!("rooms/{room}/tasks/{id}.json")
}

pub fn lock_entry(room: &str, file_path: &str) -> String {
    format!("rooms/{room}/locks/{}.json", sanitize_component(file_path))
}

pub fn vote(room: &str, id: &str) -> String {
    format!("rooms/{room}/votes/{id}.json")
}

pub fn portal(room: &str, id: &str) -> String {
    format!("rooms/{room}/portals/{id}.json")
}

pub fn handoff(room: &str, id: &str) -> String {
    format!("rooms/{room}/handovers/{id}.json")
}

pub fn checkpoint(room: &str, task_id: &str, id: &str) -> String {
    format!(
        "rooms/{room}/checkpoints/{}/{id}.json",
        sanitize_component(task_id)
    )
}

pub fn cache_entry(room: &str, key: &str) -> String {
    format!("rooms/{room}/cache/{key}.json")
}

pub fn room_meta(room: &str) -> String {
    format!("rooms/{room}/room.json")
}

pub fn message_seq(room: &str) -> String {
    format!("rooms/{room}/message_seq.json")
}

pub fn synapse_graph(room: &str) -> String {
    format!("rooms/{room}/synapses/graph.json")
}

/// Append-only logs.
pub fn messages_log(room: &str) -> String {
    format!("rooms/{room}/messages.jsonl")
}

pub fn telemetry_log(room: &str) -> String {
    format!("rooms/{room}/telemetry.jsonl")
}

pub fn telemetry_archive(room: &str, date: &str) -> String {
    format!("rooms/{room}/telemetry-{date}.jsonl")
}

/// Prefixes for listing.
pub fn agents_prefix(room: &str) -> String {
    format!("rooms/{room}/agents/")
}

pub fn tasks_prefix(room: &str) -> String {
    format!("rooms/{room}/tasks/")
}

pub fn locks_prefix(room: &str) -> String {
    format!("rooms/{room}/locks/")
}

pub fn votes_prefix(room: &str) -> String {
    format!("rooms/{room}/votes/")
}

pub fn portals_prefix(room: &str) -> String {
    format!("rooms/{room}/portals/")
}

pub fn handoffs_prefix(room: &str) -> String {
    format!("rooms/{room}/handovers/")
}

pub fn checkpoints_prefix(room: &str, task_id: &str) -> String {
    format!("rooms/{room}/checkpoints/{}/", sanitize_component(task_id))
}

pub fn cache_prefix(room: &str) -> String {
    format!("rooms/{room}/cache/")
}

/// Flatten an arbitrary string into one safe path component.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
