//! Room Store integration tests over the in-memory backend with a manual
//! clock, covering the coordination invariants end to end.

use std::sync::Arc;

use masc_backend::{Encryptor, MemoryBackend};
use masc_domain::clock::ManualClock;
use masc_domain::config::LifecycleConfig;
use masc_domain::types::{
    Handoff, HandoffReason, HandoffStatus, MessageKind, MessagePriority, TaskStatus,
};
use masc_domain::Error;
use masc_room::RoomStore;

struct Fixture {
    store: Arc<RoomStore>,
    clock: Arc<ManualClock>,
}

async fn fixture() -> Fixture {
    fixture_with(LifecycleConfig::default()).await
}

async fn fixture_with(lifecycle: LifecycleConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(1_000_000.0));
    let store = RoomStore::open(
        Arc::new(MemoryBackend::new()),
        clock.clone(),
        Encryptor::default(),
        "test-cluster".into(),
        "main".into(),
        lifecycle,
    )
    .await
    .unwrap();
    Fixture {
        store: Arc::new(store),
        clock,
    }
}

async fn join(store: &RoomStore, id: &str) {
    store
        .join(id, None, vec!["ts".into()], None)
        .await
        .unwrap();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tasks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn join_claim_done_happy_path() {
    let f = fixture().await;
    join(&f.store, "claude").await;

    let task = f
        .store
        .add_task(Some("t1".into()), "X".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let claimed = f.store.claim("t1", "claude").await.unwrap();
    assert_eq!(claimed.status, TaskStatus::Claimed);
    assert_eq!(claimed.claimed_by.as_deref(), Some("claude"));

    let done = f.store.done("t1", "claude").await.unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let f = fixture().await;
    for agent in ["a", "b", "c", "d"] {
        join(&f.store, agent).await;
    }
    f.store
        .add_task(Some("t1".into()), "race".into(), None, 1, None, vec![], None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for agent in ["a", "b", "c", "d"] {
        let store = f.store.clone();
        handles.push(tokio::spawn(async move {
            store.claim("t1", agent).await
        }));
    }
    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(Error::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 3);
}

#[tokio::test]
async fn reclaim_by_holder_is_idempotent() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "a").await.unwrap();
    let again = f.store.claim("t1", "a").await.unwrap();
    assert_eq!(again.claimed_by.as_deref(), Some("a"));
}

#[tokio::test]
async fn done_by_non_claimant_is_forbidden() {
    let f = fixture().await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "a").await.unwrap();
    assert!(matches!(
        f.store.done("t1", "b").await,
        Err(Error::Forbidden(_))
    ));
}

#[tokio::test]
async fn claim_next_picks_priority_then_age() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("low".into()), "low".into(), None, 5, None, vec![], None)
        .await
        .unwrap();
    f.clock.advance(1.0);
    f.store
        .add_task(Some("hi-new".into()), "hi".into(), None, 1, None, vec![], None)
        .await
        .unwrap();
    f.clock.advance(1.0);
    // Same priority, added later: loses the age tie-break.
    f.store
        .add_task(Some("hi-newer".into()), "hi2".into(), None, 1, None, vec![], None)
        .await
        .unwrap();

    let first = f.store.claim_next("a", false).await.unwrap().unwrap();
    assert_eq!(first.id, "hi-new");
}

#[tokio::test]
async fn claim_next_respects_capability_filter() {
    let f = fixture().await;
    join(&f.store, "a").await; // capabilities: ["ts"]
    f.store
        .add_task(
            Some("needs-go".into()),
            "x".into(),
            None,
            1,
            None,
            vec!["go".into()],
            None,
        )
        .await
        .unwrap();
    f.store
        .add_task(
            Some("needs-ts".into()),
            "y".into(),
            None,
            2,
            None,
            vec!["ts".into()],
            None,
        )
        .await
        .unwrap();

    let picked = f.store.claim_next("a", true).await.unwrap().unwrap();
    assert_eq!(picked.id, "needs-ts");
}

#[tokio::test]
async fn cancel_from_any_non_terminal_state() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "a").await.unwrap();
    let cancelled = f.store.cancel_task("t1").await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.claimed_by.is_none());

    assert!(matches!(
        f.store.cancel_task("t1").await,
        Err(Error::Conflict(_))
    ));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn message_seq_is_gapless_and_reads_are_stable_prefixes() {
    let f = fixture().await;
    join(&f.store, "a").await;

    for n in 1..=5 {
        let msg = f
            .store
            .broadcast(
                "a",
                MessageKind::Broadcast,
                serde_json::json!({ "n": n }),
                MessagePriority::Normal,
            )
            .await
            .unwrap();
        assert_eq!(msg.seq, n);
    }

    let r1 = f.store.messages(0, 0).await.unwrap();
    f.store
        .broadcast(
            "a",
            MessageKind::Broadcast,
            serde_json::json!({ "n": 6 }),
            MessagePriority::Normal,
        )
        .await
        .unwrap();
    let r2 = f.store.messages(0, 0).await.unwrap();

    // Prefix property: r2 up to r1's max seq is identical to r1.
    let r1_json: Vec<String> = r1.iter().map(|m| serde_json::to_string(m).unwrap()).collect();
    let r2_prefix: Vec<String> = r2[..r1.len()]
        .iter()
        .map(|m| serde_json::to_string(m).unwrap())
        .collect();
    assert_eq!(r1_json, r2_prefix);

    // since_seq pagination.
    let tail = f.store.messages(4, 0).await.unwrap();
    let seqs: Vec<u64> = tail.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![5, 6]);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Locks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn lock_contention_and_handover() {
    let f = fixture().await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;

    f.store.lock_file("a", "src/main.ts").await.unwrap();
    assert!(matches!(
        f.store.lock_file("b", "src/main.ts").await,
        Err(Error::Conflict(_))
    ));

    // Unlock by a non-holder is forbidden.
    assert!(matches!(
        f.store.unlock_file("b", "src/main.ts").await,
        Err(Error::Forbidden(_))
    ));

    f.store.unlock_file("a", "src/main.ts").await.unwrap();
    f.store.lock_file("b", "src/main.ts").await.unwrap();
}

#[tokio::test]
async fn relock_by_holder_extends_expiry() {
    let f = fixture().await;
    join(&f.store, "a").await;
    let first = f.store.lock_file("a", "x.rs").await.unwrap();
    f.clock.advance(100.0);
    let second = f.store.lock_file("a", "x.rs").await.unwrap();
    assert!(second.expires_at.unwrap() > first.expires_at.unwrap());
}

#[tokio::test]
async fn expired_locks_fall_to_new_claimants_and_sweep() {
    let mut lifecycle = LifecycleConfig::default();
    lifecycle.lock_ttl = 10.0;
    let f = fixture_with(lifecycle).await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;

    f.store.lock_file("a", "x.rs").await.unwrap();
    f.clock.advance(11.0);
    // Expired: b may take it over.
    let lock = f.store.lock_file("b", "x.rs").await.unwrap();
    assert_eq!(lock.holder, "b");
}

#[tokio::test]
async fn done_releases_the_claimants_locks() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "a").await.unwrap();
    f.store.lock_file("a", "src/lib.rs").await.unwrap();

    f.store.done("t1", "a").await.unwrap();
    assert!(f.store.locks().await.unwrap().is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handoffs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn capsule(from: &str, task: &str) -> Handoff {
    Handoff {
        id: String::new(),
        from_agent: from.into(),
        to_agent: None,
        task_id: task.into(),
        reason: HandoffReason::ContextLimit,
        context_pct: 91.0,
        goal: "finish the migration".into(),
        progress_summary: "halfway".into(),
        completed_steps: vec![],
        pending_steps: vec![],
        key_decisions: vec![],
        assumptions: vec![],
        warnings: vec![],
        unresolved_errors: vec![],
        modified_files: vec![],
        created_at: 0.0,
        status: HandoffStatus::Pending,
    }
}

#[tokio::test]
async fn handoff_claim_race_has_one_winner() {
    let f = fixture().await;
    for agent in ["a", "b", "c"] {
        join(&f.store, agent).await;
    }
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    let created = f.store.handoff_create(capsule("a", "t1")).await.unwrap();

    let mut handles = Vec::new();
    for agent in ["b", "c"] {
        let store = f.store.clone();
        let id = created.id.clone();
        handles.push(tokio::spawn(async move {
            store.handoff_claim(&id, agent).await
        }));
    }
    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(capsule) => winners.push(capsule.to_agent.unwrap()),
            Err(Error::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn handoff_lifecycle_and_expiry() {
    let f = fixture().await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();

    let created = f.store.handoff_create(capsule("a", "t1")).await.unwrap();
    let claimed = f.store.handoff_claim(&created.id, "b").await.unwrap();
    assert_eq!(claimed.status, HandoffStatus::Claimed);

    // Completing from the wrong agent is forbidden.
    assert!(matches!(
        f.store.handoff_complete(&created.id, "a").await,
        Err(Error::Forbidden(_))
    ));
    let consumed = f.store.handoff_complete(&created.id, "b").await.unwrap();
    assert_eq!(consumed.status, HandoffStatus::Consumed);

    // A consumed capsule cannot be claimed again.
    assert!(matches!(
        f.store.handoff_claim(&created.id, "a").await,
        Err(Error::Conflict(_))
    ));

    // A second pending capsule expires after the TTL.
    let other = f.store.handoff_create(capsule("a", "t1")).await.unwrap();
    f.clock.advance(f.store.lifecycle().handoff_ttl + 1.0);
    f.store.supervisor_pass().await.unwrap();
    assert!(matches!(
        f.store.handoff_claim(&other.id, "b").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn claimed_but_unconsumed_capsule_returns_to_pool() {
    let f = fixture().await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    let created = f.store.handoff_create(capsule("a", "t1")).await.unwrap();
    f.store.handoff_claim(&created.id, "b").await.unwrap();

    f.clock
        .advance(f.store.lifecycle().handoff_consume_ttl + 1.0);
    f.store.supervisor_pass().await.unwrap();

    let (reloaded, _) = f.store.handoff_get(&created.id).await.unwrap();
    assert_eq!(reloaded.status, HandoffStatus::Pending);
    assert_eq!(reloaded.to_agent, None);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Zombie sweep
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn zombie_sweep_releases_work_and_collects() {
    let f = fixture().await;
    join(&f.store, "g").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "g").await.unwrap();
    f.store.lock_file("g", "src/a.rs").await.unwrap();

    // Lapse the heartbeat: next pass zombifies and releases everything.
    f.clock.advance(f.store.lifecycle().heartbeat_ttl + 1.0);
    let stats = f.store.sweep_agents().await.unwrap();
    assert_eq!(stats.zombied, 1);
    assert_eq!(stats.tasks_released, 1);
    assert_eq!(stats.locks_released, 1);
    assert_eq!(stats.capsules_created, 1);

    let task = f.store.get_task("t1").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.claimed_by.is_none());

    // After the zombie TTL the agent is collected.
    f.clock.advance(f.store.lifecycle().zombie_ttl + 1.0);
    let stats = f.store.sweep_agents().await.unwrap();
    assert_eq!(stats.collected, 1);
    assert!(f.store.agents().await.unwrap().is_empty());
}

#[tokio::test]
async fn heartbeat_revives_a_zombie() {
    let f = fixture().await;
    join(&f.store, "g").await;
    f.clock.advance(f.store.lifecycle().heartbeat_ttl + 1.0);
    f.store.sweep_agents().await.unwrap();

    f.store.heartbeat("g").await.unwrap();
    let agent = f.store.get_agent("g").await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(agent.status).unwrap().as_str().unwrap(),
        "active"
    );
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache & checkpoints
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn cache_ttl_expires_lazily() {
    let f = fixture().await;
    f.store
        .cache_set("build:output", "ok".into(), Some(60.0), vec![])
        .await
        .unwrap();
    assert!(f.store.cache_get("build:output").await.unwrap().is_some());

    f.clock.advance(61.0);
    assert!(f.store.cache_get("build:output").await.unwrap().is_none());
    // Lazy deletion removed the entry entirely.
    assert!(f.store.cache_list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn checkpoint_interrupt_approve_branch_flow() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();

    let cp1 = f
        .store
        .checkpoint_save("t1", serde_json::json!({ "cursor": 1 }))
        .await
        .unwrap();
    assert_eq!(cp1.step, 1);

    // Saving the next step completes the previous one.
    let cp2 = f
        .store
        .checkpoint_save("t1", serde_json::json!({ "cursor": 2 }))
        .await
        .unwrap();
    assert_eq!(cp2.step, 2);
    let reloaded1 = f.store.checkpoint_get("t1", &cp1.id).await.unwrap();
    assert_eq!(
        serde_json::to_value(reloaded1.status).unwrap(),
        serde_json::json!("completed")
    );

    let interrupted = f
        .store
        .checkpoint_interrupt("t1", &cp2.id, Some("hold on".into()))
        .await
        .unwrap();
    assert_eq!(interrupted.interrupt_message.as_deref(), Some("hold on"));

    // Approving a non-interrupted checkpoint conflicts.
    assert!(matches!(
        f.store.checkpoint_approve("t1", &cp1.id).await,
        Err(Error::Conflict(_))
    ));

    let (parent, child) = f
        .store
        .checkpoint_branch("t1", &cp2.id, "alt-route".into())
        .await
        .unwrap();
    assert_eq!(child.step, parent.step + 1);
    assert_eq!(child.state, parent.state);
    assert_eq!(child.parent_checkpoint_id.as_deref(), Some(parent.id.as_str()));
}

#[tokio::test]
async fn interrupted_checkpoints_time_out_to_rejected() {
    let f = fixture().await;
    join(&f.store, "a").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    let cp = f
        .store
        .checkpoint_save("t1", serde_json::json!({}))
        .await
        .unwrap();
    f.store
        .checkpoint_interrupt("t1", &cp.id, None)
        .await
        .unwrap();

    f.clock.advance(f.store.lifecycle().interrupt_ttl + 1.0);
    f.store.supervisor_pass().await.unwrap();

    let reloaded = f.store.checkpoint_get("t1", &cp.id).await.unwrap();
    assert_eq!(
        serde_json::to_value(reloaded.status).unwrap(),
        serde_json::json!("rejected")
    );
    assert_eq!(reloaded.reject_reason.as_deref(), Some("timeout"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Votes & portals
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn vote_flow_with_ballot_overwrite() {
    let f = fixture().await;
    for agent in ["a", "b", "c"] {
        join(&f.store, agent).await;
    }
    let vote = f
        .store
        .vote_create("merge?".into(), vec!["yes".into(), "no".into()], "a", None)
        .await
        .unwrap();

    f.store.vote_cast(&vote.id, "a", "no").await.unwrap();
    f.store.vote_cast(&vote.id, "b", "yes").await.unwrap();
    f.store.vote_cast(&vote.id, "c", "yes").await.unwrap();
    // One ballot per voter: "a" changes its mind.
    f.store.vote_cast(&vote.id, "a", "yes").await.unwrap();

    let (closed, tally) = f.store.vote_close(&vote.id).await.unwrap();
    assert_eq!(tally.winner.as_deref(), Some("yes"));
    assert_eq!(tally.counts["yes"], 3);

    // Ballots are frozen after close.
    assert!(matches!(
        f.store.vote_cast(&closed.id, "b", "no").await,
        Err(Error::Conflict(_))
    ));
}

#[tokio::test]
async fn portal_roundtrip_is_idempotent_and_private() {
    let f = fixture().await;
    for agent in ["a", "b", "c"] {
        join(&f.store, agent).await;
    }
    let portal = f.store.portal_open("a", "b").await.unwrap();
    let again = f.store.portal_open("b", "a").await.unwrap();
    assert_eq!(portal.id, again.id);

    f.store
        .portal_send(&portal.id, "a", serde_json::json!({ "hi": 1 }))
        .await
        .unwrap();

    // Non-members may neither send nor drain.
    assert!(matches!(
        f.store
            .portal_send(&portal.id, "c", serde_json::json!({})).await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        f.store.portal_recv(&portal.id, "c").await,
        Err(Error::Forbidden(_))
    ));

    let inbox = f.store.portal_recv(&portal.id, "b").await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].payload["hi"], 1);
    // Drained.
    assert!(f.store.portal_recv(&portal.id, "b").await.unwrap().is_empty());

    f.store.portal_close(&portal.id, "a").await.unwrap();
    assert!(matches!(
        f.store
            .portal_send(&portal.id, "a", serde_json::json!({})).await,
        Err(Error::Conflict(_))
    ));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status snapshot & restart behaviour
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn status_snapshot_counts() {
    let f = fixture().await;
    join(&f.store, "a").await;
    join(&f.store, "b").await;
    f.store
        .add_task(Some("t1".into()), "x".into(), None, 3, None, vec![], None)
        .await
        .unwrap();
    f.store.claim("t1", "a").await.unwrap();
    f.store.lock_file("a", "x.rs").await.unwrap();

    let status = f.store.status().await.unwrap();
    assert_eq!(status.agents_by_status["active"], 2);
    assert_eq!(status.tasks_by_status["claimed"], 1);
    assert_eq!(status.held_locks, 1);
    assert!(!status.paused);
}

#[tokio::test]
async fn message_seq_continues_after_reopen() {
    let clock = Arc::new(ManualClock::new(1_000_000.0));
    let backend = Arc::new(MemoryBackend::new());

    let store = RoomStore::open(
        backend.clone(),
        clock.clone(),
        Encryptor::default(),
        "c".into(),
        "main".into(),
        LifecycleConfig::default(),
    )
    .await
    .unwrap();
    store.join("a", None, vec![], None).await.unwrap();
    for _ in 0..3 {
        store
            .broadcast(
                "a",
                MessageKind::Broadcast,
                serde_json::json!({}),
                MessagePriority::Normal,
            )
            .await
            .unwrap();
    }
    drop(store);

    let reopened = RoomStore::open(
        backend,
        clock,
        Encryptor::default(),
        "c".into(),
        "main".into(),
        LifecycleConfig::default(),
    )
    .await
    .unwrap();
    let msg = reopened
        .broadcast(
            "a",
            MessageKind::Broadcast,
            serde_json::json!({}),
            MessagePriority::Normal,
        )
        .await
        .unwrap();
    assert_eq!(msg.seq, 4);
}
