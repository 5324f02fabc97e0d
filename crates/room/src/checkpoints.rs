//! Checkpoints — durable workflow steps with human-in-the-loop control.
//!
//! Saving a new step auto-completes the task's previous in-progress
//! checkpoint, so the happy path needs no extra calls; interrupt /
//! approve / reject / branch / revert cover the rest.  Illegal
//! transitions are conflicts.  Checkpoint state is a sealed family.

use masc_backend::keys;
use masc_domain::types::{Checkpoint, CheckpointStatus};
use masc_domain::{Error, Result};

use crate::store::RoomStore;

impl RoomStore {
    /// Persist the next workflow step for a task.
    pub async fn checkpoint_save(
        &self,
        task_id: &str,
        state: serde_json::Value,
    ) -> Result<Checkpoint> {
        if self.get_task(task_id).await?.is_none() {
            return Err(Error::NotFound(format!("task {task_id}")));
        }
        let _scope = self
            .backend
            .lock(&format!("checkpoints:{task_id}"))
            .await?;

        // Complete the previous in-progress step, if any.
        let mut latest_step = 0;
        for existing in self.checkpoints(task_id).await? {
            latest_step = latest_step.max(existing.step);
            if existing.status == CheckpointStatus::InProgress {
                let mut done = existing;
                done.status = CheckpointStatus::Completed;
                done.resolved_at = Some(self.now());
                self.write_sealed(&keys::checkpoint(&self.room, task_id, &done.id), &done)
                    .await?;
            }
        }

        let checkpoint = Checkpoint {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_owned(),
            step: latest_step + 1,
            state,
            status: CheckpointStatus::InProgress,
            interrupt_message: None,
            interrupted_at: None,
            reject_reason: None,
            parent_checkpoint_id: None,
            branch_name: None,
            created_at: self.now(),
            resolved_at: None,
        };
        self.write_sealed(
            &keys::checkpoint(&self.room, task_id, &checkpoint.id),
            &checkpoint,
        )
        .await?;
        self.notify(
            "checkpoint_saved",
            serde_json::json!({
                "checkpoint_id": checkpoint.id,
                "task_id": task_id,
                "step": checkpoint.step,
            }),
        );
        Ok(checkpoint)
    }

    pub async fn checkpoint_get(&self, task_id: &str, checkpoint_id: &str) -> Result<Checkpoint> {
        self.read_sealed(&keys::checkpoint(&self.room, task_id, checkpoint_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("checkpoint {checkpoint_id}")))
    }

    /// All checkpoints for a task, oldest step first.
    pub async fn checkpoints(&self, task_id: &str) -> Result<Vec<Checkpoint>> {
        let mut out = Vec::new();
        for key in self
            .list_keys(&keys::checkpoints_prefix(&self.room, task_id))
            .await?
        {
            if let Some(cp) = self.read_sealed::<Checkpoint>(&key).await? {
                out.push(cp);
            }
        }
        out.sort_by_key(|cp| cp.step);
        Ok(out)
    }

    /// Pause an in-progress step for review.
    pub async fn checkpoint_interrupt(
        &self,
        task_id: &str,
        checkpoint_id: &str,
        message: Option<String>,
    ) -> Result<Checkpoint> {
        self.transition_checkpoint(task_id, checkpoint_id, CheckpointStatus::Interrupted, |cp| {
            cp.interrupt_message = message.clone();
        })
        .await
    }

    /// Approve an interrupted step.
    pub async fn checkpoint_approve(
        &self,
        task_id: &str,
        checkpoint_id: &str,
    ) -> Result<Checkpoint> {
        self.transition_checkpoint(task_id, checkpoint_id, CheckpointStatus::Completed, |_| {})
            .await
    }

    /// Reject an interrupted step with a reason.
    pub async fn checkpoint_reject(
        &self,
        task_id: &str,
        checkpoint_id: &str,
        reason: String,
    ) -> Result<Checkpoint> {
        self.transition_checkpoint(task_id, checkpoint_id, CheckpointStatus::Rejected, |cp| {
            cp.reject_reason = Some(reason.clone());
        })
        .await
    }

    /// Fork an interrupted step into a named branch.  The parent becomes
    /// `branched`; the child clones its state at `step + 1`.
    pub async fn checkpoint_branch(
        &self,
        task_id: &str,
        checkpoint_id: &str,
        branch_name: String,
    ) -> Result<(Checkpoint, Checkpoint)> {
        let parent = self
            .transition_checkpoint(task_id, checkpoint_id, CheckpointStatus::Branched, |_| {})
            .await?;
        let child = parent.branch_child(uuid::Uuid::new_v4().to_string(), branch_name, self.now());
        self.write_sealed(&keys::checkpoint(&self.room, task_id, &child.id), &child)
            .await?;
        self.notify(
            "checkpoint_branched",
            serde_json::json!({
                "parent_id": parent.id,
                "child_id": child.id,
                "branch": child.branch_name,
            }),
        );
        Ok((parent, child))
    }

    /// Time travel: mark any non-terminal step reverted.
    pub async fn checkpoint_revert(
        &self,
        task_id: &str,
        checkpoint_id: &str,
    ) -> Result<Checkpoint> {
        self.transition_checkpoint(task_id, checkpoint_id, CheckpointStatus::Reverted, |_| {})
            .await
    }

    async fn transition_checkpoint(
        &self,
        task_id: &str,
        checkpoint_id: &str,
        next: CheckpointStatus,
        mutate: impl Fn(&mut Checkpoint),
    ) -> Result<Checkpoint> {
        let _scope = self
            .backend
            .lock(&format!("checkpoints:{task_id}"))
            .await?;
        let key = keys::checkpoint(&self.room, task_id, checkpoint_id);
        let mut checkpoint: Checkpoint = self
            .read_sealed(&key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("checkpoint {checkpoint_id}")))?;

        if !checkpoint.status.can_transition_to(next) {
            return Err(Error::Conflict(format!(
                "checkpoint {checkpoint_id} cannot move from {:?} to {next:?}",
                checkpoint.status
            )));
        }
        checkpoint.status = next;
        mutate(&mut checkpoint);
        let now = self.now();
        match next {
            CheckpointStatus::Interrupted => checkpoint.interrupted_at = Some(now),
            s if s.is_terminal() => checkpoint.resolved_at = Some(now),
            _ => {}
        }
        self.write_sealed(&key, &checkpoint).await?;
        self.notify(
            "checkpoint_updated",
            serde_json::json!({
                "checkpoint_id": checkpoint_id,
                "task_id": task_id,
                "status": checkpoint.status,
            }),
        );
        Ok(checkpoint)
    }

    /// Supervisor sweep: interrupted steps past the interrupt TTL are
    /// rejected with reason `timeout`.
    pub(crate) async fn sweep_interrupted_checkpoints(&self) -> Result<usize> {
        let now = self.now();
        let ttl = self.lifecycle.interrupt_ttl;
        let mut rejected = 0;

        let prefix = format!("rooms/{}/checkpoints/", self.room);
        for key in self.list_keys(&prefix).await? {
            let Some(cp) = self.read_sealed::<Checkpoint>(&key).await? else {
                continue;
            };
            if cp.status != CheckpointStatus::Interrupted {
                continue;
            }
            let since = cp.interrupted_at.unwrap_or(cp.created_at);
            if now - since > ttl {
                self.checkpoint_reject(&cp.task_id, &cp.id, "timeout".into())
                    .await?;
                rejected += 1;
            }
        }
        Ok(rejected)
    }
}
