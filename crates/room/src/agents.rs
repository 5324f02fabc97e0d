//! Agent lifecycle: join, leave, heartbeat, and the zombie sweep.

use masc_backend::keys;
use masc_domain::trace::TraceEvent;
use masc_domain::types::{
    Agent, AgentStatus, FileLock, Handoff, HandoffReason, HandoffStatus, Task, TaskStatus,
    TelemetryKind,
};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

/// Outcome of one supervisor sweep over the agent set.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SweepStats {
    pub zombied: usize,
    pub collected: usize,
    pub tasks_released: usize,
    pub locks_released: usize,
    pub capsules_created: usize,
}

impl RoomStore {
    /// Create or revive an agent.  Idempotent: joining an already-active
    /// agent returns the existing record.
    pub async fn join(
        &self,
        agent_id: &str,
        display_name: Option<String>,
        capabilities: Vec<String>,
        role: Option<String>,
    ) -> Result<Agent> {
        if agent_id.is_empty() {
            return Err(Error::InvalidArgument("agent_id must not be empty".into()));
        }
        let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;

        let key = keys::agent(&self.room, agent_id);
        let now = self.now();
        let (agent, revived) = match self.read_json::<Agent>(&key).await? {
            Some(mut existing) if existing.status != AgentStatus::Left => {
                existing.last_heartbeat = now;
                (existing, false)
            }
            Some(mut departed) => {
                departed.status = AgentStatus::Active;
                departed.joined_at = now;
                departed.last_heartbeat = now;
                departed.capabilities = capabilities;
                departed.current_task_id = None;
                if let Some(name) = display_name {
                    departed.display_name = name;
                }
                if role.is_some() {
                    departed.role = role;
                }
                (departed, true)
            }
            None => {
                let mut agent = Agent::new(agent_id, capabilities, now);
                if let Some(name) = display_name {
                    agent.display_name = name;
                }
                agent.role = role;
                (agent, false)
            }
        };
        self.write_json(&key, &agent).await?;

        TraceEvent::AgentJoined {
            agent: agent_id.to_owned(),
            revived,
        }
        .emit();
        self.telemetry
            .record(
                TelemetryKind::AgentJoined,
                serde_json::json!({ "agent": agent_id }),
            )
            .await;
        self.notify(
            "agent_joined",
            serde_json::json!({ "agent_id": agent_id, "revived": revived }),
        );
        Ok(agent)
    }

    /// Explicit departure: flip to left and release everything held.
    pub async fn leave(&self, agent_id: &str) -> Result<Agent> {
        let key = keys::agent(&self.room, agent_id);
        let mut agent = {
            let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;
            let mut agent: Agent = self
                .read_json(&key)
                .await?
                .ok_or_else(|| Error::NotFound(format!("agent {agent_id}")))?;
            agent.status = AgentStatus::Left;
            agent.current_task_id = None;
            self.write_json(&key, &agent).await?;
            agent
        };

        let (tasks_released, locks_released) = self.release_agent_resources(agent_id).await?;
        agent.current_task_id = None;

        TraceEvent::AgentLeft {
            agent: agent_id.to_owned(),
            released_tasks: tasks_released,
            released_locks: locks_released,
        }
        .emit();
        self.telemetry
            .record(
                TelemetryKind::AgentLeft,
                serde_json::json!({ "agent": agent_id }),
            )
            .await;
        self.notify(
            "agent_left",
            serde_json::json!({
                "agent_id": agent_id,
                "tasks_released": tasks_released,
                "locks_released": locks_released,
            }),
        );
        Ok(agent)
    }

    /// Touch the heartbeat.  Unknown agents are a no-op; a zombie that
    /// heartbeats before collection revives to active.
    pub async fn heartbeat(&self, agent_id: &str) -> Result<Option<Agent>> {
        let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;
        let key = keys::agent(&self.room, agent_id);
        let Some(mut agent) = self.read_json::<Agent>(&key).await? else {
            return Ok(None);
        };
        if agent.status == AgentStatus::Left {
            return Ok(None);
        }
        agent.last_heartbeat = self.now();
        if agent.status == AgentStatus::Zombie {
            agent.status = AgentStatus::Active;
        }
        self.write_json(&key, &agent).await?;
        Ok(Some(agent))
    }

    /// All agents still present in the room (left agents excluded).
    pub async fn agents(&self) -> Result<Vec<Agent>> {
        let mut agents = Vec::new();
        for key in self.list_keys(&keys::agents_prefix(&self.room)).await? {
            if let Some(agent) = self.read_json::<Agent>(&key).await? {
                if agent.status.is_present() {
                    agents.push(agent);
                }
            }
        }
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        self.read_json(&keys::agent(&self.room, agent_id)).await
    }

    /// Require a present (non-left) agent.
    pub(crate) async fn require_agent(&self, agent_id: &str) -> Result<Agent> {
        match self.get_agent(agent_id).await? {
            Some(agent) if agent.status.is_present() => Ok(agent),
            _ => Err(Error::NotFound(format!("agent {agent_id} not in room"))),
        }
    }

    // ── Zombie sweep ────────────────────────────────────────────────

    /// One supervisor pass: lapse active agents to zombie, collect stale
    /// zombies to left, releasing their work and leaving handoff capsules
    /// behind.
    pub async fn sweep_agents(&self) -> Result<SweepStats> {
        let heartbeat_ttl = self.lifecycle.heartbeat_ttl;
        let zombie_ttl = self.lifecycle.zombie_ttl;
        let now = self.now();
        let mut stats = SweepStats::default();

        for key in self.list_keys(&keys::agents_prefix(&self.room)).await? {
            let Some(agent) = self.read_json::<Agent>(&key).await? else {
                continue;
            };
            match agent.status {
                AgentStatus::Active | AgentStatus::Idle | AgentStatus::Busy
                    if agent.heartbeat_lapsed(now, heartbeat_ttl) =>
                {
                    self.zombify(&agent, &mut stats).await?;
                }
                AgentStatus::Zombie if now - agent.last_heartbeat > heartbeat_ttl + zombie_ttl => {
                    self.collect_zombie(&agent, &mut stats).await?;
                }
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn zombify(&self, agent: &Agent, stats: &mut SweepStats) -> Result<()> {
        let agent_id = agent.id.clone();
        {
            let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;
            let key = keys::agent(&self.room, &agent_id);
            // Re-read under the lock: a heartbeat may have raced the sweep.
            let Some(mut fresh) = self.read_json::<Agent>(&key).await? else {
                return Ok(());
            };
            if !fresh.heartbeat_lapsed(self.now(), self.lifecycle.heartbeat_ttl) {
                return Ok(());
            }
            fresh.status = AgentStatus::Zombie;
            self.write_json(&key, &fresh).await?;
        }

        // Leave a capsule for whatever the agent was working on, then
        // release its claims.
        if let Some(task_id) = &agent.current_task_id {
            if let Some(task) = self.get_task(task_id).await? {
                if !task.status.is_terminal() {
                    let capsule = self
                        .handoff_create(Handoff {
                            id: String::new(),
                            from_agent: agent_id.clone(),
                            to_agent: None,
                            task_id: task_id.clone(),
                            reason: HandoffReason::Timeout,
                            context_pct: 0.0,
                            goal: task.title.clone(),
                            progress_summary: format!(
                                "agent {agent_id} went silent while holding this task"
                            ),
                            completed_steps: vec![],
                            pending_steps: vec![],
                            key_decisions: vec![],
                            assumptions: vec![],
                            warnings: vec!["capsule generated by zombie sweep".into()],
                            unresolved_errors: vec![],
                            modified_files: vec![],
                            created_at: 0.0,
                            status: HandoffStatus::Pending,
                        })
                        .await?;
                    stats.capsules_created += 1;
                    tracing::debug!(handoff = %capsule.id, agent = %agent_id, "zombie capsule created");
                }
            }
        }

        let (tasks, locks) = self.release_agent_resources(&agent_id).await?;
        stats.zombied += 1;
        stats.tasks_released += tasks;
        stats.locks_released += locks;

        TraceEvent::AgentZombied {
            agent: agent_id.clone(),
            last_heartbeat: agent.last_heartbeat,
        }
        .emit();
        self.notify(
            "agent_zombied",
            serde_json::json!({ "agent_id": agent_id }),
        );
        Ok(())
    }

    async fn collect_zombie(&self, agent: &Agent, stats: &mut SweepStats) -> Result<()> {
        let _scope = self.backend.lock(&format!("agent:{}", agent.id)).await?;
        let key = keys::agent(&self.room, &agent.id);
        let Some(mut fresh) = self.read_json::<Agent>(&key).await? else {
            return Ok(());
        };
        if fresh.status != AgentStatus::Zombie {
            return Ok(());
        }
        fresh.status = AgentStatus::Left;
        self.write_json(&key, &fresh).await?;
        stats.collected += 1;
        self.telemetry
            .record(
                TelemetryKind::AgentLeft,
                serde_json::json!({ "agent": agent.id, "reason": "zombie_gc" }),
            )
            .await;
        self.notify(
            "agent_left",
            serde_json::json!({ "agent_id": agent.id, "reason": "zombie_gc" }),
        );
        Ok(())
    }

    /// Return every non-terminal task claimed by `agent_id` to pending and
    /// drop every file lock it holds.
    pub(crate) async fn release_agent_resources(&self, agent_id: &str) -> Result<(usize, usize)> {
        let mut tasks_released = 0;
        for key in self.list_keys(&keys::tasks_prefix(&self.room)).await? {
            let Some(mut task) = self.read_json::<Task>(&key).await? else {
                continue;
            };
            if task.claimed_by.as_deref() == Some(agent_id) && !task.status.is_terminal() {
                let _scope = self.backend.lock(&format!("task:{}", task.id)).await?;
                task.status = TaskStatus::Pending;
                task.claimed_by = None;
                task.claimed_at = None;
                self.write_json(&key, &task).await?;
                tasks_released += 1;
                self.notify(
                    "task_released",
                    serde_json::json!({ "task_id": task.id, "agent_id": agent_id }),
                );
            }
        }

        let mut locks_released = 0;
        for key in self.list_keys(&keys::locks_prefix(&self.room)).await? {
            let Some(lock) = self.read_json::<FileLock>(&key).await? else {
                continue;
            };
            if lock.holder == agent_id {
                self.delete_key(&key).await?;
                locks_released += 1;
                self.notify(
                    "lock_released",
                    serde_json::json!({ "file_path": lock.file_path, "agent_id": agent_id }),
                );
            }
        }
        Ok((tasks_released, locks_released))
    }
}
