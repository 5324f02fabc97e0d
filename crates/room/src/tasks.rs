//! Task queue: add, claim, claim-next, complete, cancel.
//!
//! Claims go through backend CAS so exactly one of any set of concurrent
//! claimants wins, across processes as well as within one.

use masc_backend::keys;
use masc_domain::trace::TraceEvent;
use masc_domain::types::{Agent, Task, TaskStatus, TelemetryKind};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

/// Bounded retries for the claim-next CAS loop.
const CLAIM_NEXT_PASSES: usize = 3;

impl RoomStore {
    /// Register a new pending task.  Generates an id when absent;
    /// duplicate ids are a conflict.
    pub async fn add_task(
        &self,
        id: Option<String>,
        title: String,
        description: Option<String>,
        priority: u8,
        payload: Option<serde_json::Value>,
        required_capabilities: Vec<String>,
        source: Option<String>,
    ) -> Result<Task> {
        if title.is_empty() {
            return Err(Error::InvalidArgument("title must not be empty".into()));
        }
        if !(1..=5).contains(&priority) {
            return Err(Error::InvalidArgument(format!(
                "priority must be 1..=5, got {priority}"
            )));
        }
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let mut task = Task::new(&id, title, priority, self.now());
        task.description = description;
        task.payload = payload;
        task.required_capabilities = required_capabilities;
        task.source = source;

        let raw = serde_json::to_string(&task)?;
        let key = keys::task(&self.room, &id);
        if !self.cas_raw(&key, None, &raw).await? {
            return Err(Error::Conflict(format!("task {id} already exists")));
        }

        self.notify(
            "task_added",
            serde_json::json!({ "task_id": id, "priority": priority }),
        );
        Ok(task)
    }

    /// Claim a specific pending task.  Idempotent for the current holder;
    /// a task claimed by someone else is a conflict.
    pub async fn claim(&self, task_id: &str, agent_id: &str) -> Result<Task> {
        self.require_agent(agent_id).await?;
        let key = keys::task(&self.room, task_id);

        let raw = self
            .read_raw(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        let task: Task = serde_json::from_str(&raw)
            .map_err(|e| Error::Internal(format!("corrupt task {task_id}: {e}")))?;

        match task.status {
            TaskStatus::Pending => {}
            TaskStatus::Claimed | TaskStatus::InProgress
                if task.claimed_by.as_deref() == Some(agent_id) =>
            {
                return Ok(task);
            }
            TaskStatus::Claimed | TaskStatus::InProgress => {
                return Err(Error::Conflict(format!(
                    "task {task_id} already claimed by {}",
                    task.claimed_by.as_deref().unwrap_or("?")
                )));
            }
            terminal => {
                return Err(Error::Conflict(format!(
                    "task {task_id} is {}",
                    serde_json::to_value(terminal)?.as_str().unwrap_or("terminal")
                )));
            }
        }

        let mut claimed = task;
        claimed.status = TaskStatus::Claimed;
        claimed.claimed_by = Some(agent_id.to_owned());
        claimed.claimed_at = Some(self.now());
        let new_raw = serde_json::to_string(&claimed)?;

        if !self.cas_raw(&key, Some(&raw), &new_raw).await? {
            // Someone else won the race between our read and the swap.
            return Err(Error::Conflict(format!("task {task_id} claim lost")));
        }

        self.on_claimed(&claimed, agent_id).await?;
        Ok(claimed)
    }

    /// Claim the highest-priority pending task the agent qualifies for.
    /// Ties break on oldest `created_at`.  Returns `None` when the queue
    /// has nothing eligible.
    pub async fn claim_next(
        &self,
        agent_id: &str,
        capability_filter: bool,
    ) -> Result<Option<Task>> {
        let agent = self.require_agent(agent_id).await?;

        for _ in 0..CLAIM_NEXT_PASSES {
            let mut pending = self.pending_tasks(&agent, capability_filter).await?;
            if pending.is_empty() {
                return Ok(None);
            }
            pending.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(a.created_at.partial_cmp(&b.created_at).unwrap_or(std::cmp::Ordering::Equal))
            });

            for candidate in pending {
                match self.claim(&candidate.id, agent_id).await {
                    Ok(task) => return Ok(Some(task)),
                    Err(Error::Conflict(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
            // Every candidate was snatched mid-pass; rescan.
        }
        Ok(None)
    }

    async fn pending_tasks(&self, agent: &Agent, capability_filter: bool) -> Result<Vec<Task>> {
        let mut pending = Vec::new();
        for key in self.list_keys(&keys::tasks_prefix(&self.room)).await? {
            let Some(task) = self.read_json::<Task>(&key).await? else {
                continue;
            };
            if task.status != TaskStatus::Pending {
                continue;
            }
            if capability_filter && !agent.covers(&task.required_capabilities) {
                continue;
            }
            pending.push(task);
        }
        Ok(pending)
    }

    async fn on_claimed(&self, task: &Task, agent_id: &str) -> Result<()> {
        // Point the agent at its new work.
        {
            let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;
            let agent_key = keys::agent(&self.room, agent_id);
            if let Some(mut agent) = self.read_json::<Agent>(&agent_key).await? {
                agent.current_task_id = Some(task.id.clone());
                self.write_json(&agent_key, &agent).await?;
            }
        }

        TraceEvent::TaskClaimed {
            task_id: task.id.clone(),
            agent: agent_id.to_owned(),
        }
        .emit();
        self.telemetry
            .record(
                TelemetryKind::TaskStarted,
                serde_json::json!({ "agent": agent_id, "task_id": task.id }),
            )
            .await;
        self.notify(
            "task_claimed",
            serde_json::json!({ "task_id": task.id, "agent_id": agent_id }),
        );
        Ok(())
    }

    /// Mark a claimed task as actively being worked.
    pub async fn start_task(&self, task_id: &str, agent_id: &str) -> Result<Task> {
        let _scope = self.backend.lock(&format!("task:{task_id}")).await?;
        let key = keys::task(&self.room, task_id);
        let mut task: Task = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        if task.claimed_by.as_deref() != Some(agent_id) {
            return Err(Error::Forbidden(format!(
                "task {task_id} is not claimed by {agent_id}"
            )));
        }
        if task.status == TaskStatus::InProgress {
            return Ok(task);
        }
        if !task.status.can_transition_to(TaskStatus::InProgress) {
            return Err(Error::Conflict(format!(
                "task {task_id} cannot start from its current state"
            )));
        }
        task.status = TaskStatus::InProgress;
        self.write_json(&key, &task).await?;
        self.notify(
            "task_started",
            serde_json::json!({ "task_id": task_id, "agent_id": agent_id }),
        );
        Ok(task)
    }

    /// Complete a task.  Only its claimant may finish it; the agent's
    /// file locks are released with it.
    pub async fn done(&self, task_id: &str, agent_id: &str) -> Result<Task> {
        let task = {
            let _scope = self.backend.lock(&format!("task:{task_id}")).await?;
            let key = keys::task(&self.room, task_id);
            let mut task: Task = self
                .read_json(&key)
                .await?
                .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
            if task.status == TaskStatus::Done && task.claimed_by.as_deref() == Some(agent_id) {
                return Ok(task);
            }
            if task.claimed_by.as_deref() != Some(agent_id) {
                return Err(Error::Forbidden(format!(
                    "task {task_id} is not claimed by {agent_id}"
                )));
            }
            if !task.status.can_transition_to(TaskStatus::Done) {
                return Err(Error::Conflict(format!(
                    "task {task_id} cannot complete from its current state"
                )));
            }
            task.status = TaskStatus::Done;
            task.completed_at = Some(self.now());
            self.write_json(&key, &task).await?;
            task
        };

        // Clear the agent's current task and drop its locks.
        {
            let _scope = self.backend.lock(&format!("agent:{agent_id}")).await?;
            let agent_key = keys::agent(&self.room, agent_id);
            if let Some(mut agent) = self.read_json::<Agent>(&agent_key).await? {
                if agent.current_task_id.as_deref() == Some(task_id) {
                    agent.current_task_id = None;
                    self.write_json(&agent_key, &agent).await?;
                }
            }
        }
        self.release_agent_locks(agent_id).await?;

        let duration = task
            .completed_at
            .zip(task.claimed_at)
            .map(|(done, claimed)| (done - claimed).max(0.0))
            .unwrap_or(0.0);
        TraceEvent::TaskCompleted {
            task_id: task_id.to_owned(),
            agent: agent_id.to_owned(),
            duration_secs: duration,
        }
        .emit();
        self.telemetry
            .record(
                TelemetryKind::TaskCompleted,
                serde_json::json!({
                    "agent": agent_id,
                    "task_id": task_id,
                    "duration_secs": duration,
                }),
            )
            .await;
        self.notify(
            "task_done",
            serde_json::json!({ "task_id": task_id, "agent_id": agent_id }),
        );
        Ok(task)
    }

    /// Cancel from any non-terminal state.
    pub async fn cancel_task(&self, task_id: &str) -> Result<Task> {
        let _scope = self.backend.lock(&format!("task:{task_id}")).await?;
        let key = keys::task(&self.room, task_id);
        let mut task: Task = self
            .read_json(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        if !task.status.can_transition_to(TaskStatus::Cancelled) {
            return Err(Error::Conflict(format!(
                "task {task_id} is already terminal"
            )));
        }
        task.status = TaskStatus::Cancelled;
        task.claimed_by = None;
        task.claimed_at = None;
        self.write_json(&key, &task).await?;
        self.notify("task_cancelled", serde_json::json!({ "task_id": task_id }));
        Ok(task)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.read_json(&keys::task(&self.room, task_id)).await
    }

    /// List tasks, optionally filtered by status, newest first.
    pub async fn tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for key in self.list_keys(&keys::tasks_prefix(&self.room)).await? {
            let Some(task) = self.read_json::<Task>(&key).await? else {
                continue;
            };
            if status.map_or(true, |s| task.status == s) {
                tasks.push(task);
            }
        }
        tasks.sort_by(|a, b| {
            b.created_at
                .partial_cmp(&a.created_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(tasks)
    }
}
