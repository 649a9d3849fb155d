//! Optimistic sync between the local task list and a `TaskStore`.
//!
//! Every mutation follows the same shape: change the local list, persist
//! through the store, and on any failure record a dismissible error and
//! re-fetch the authoritative list. Moves persist the moved task first and
//! then each displaced sibling in order; there is no retry and sibling
//! updates are not atomic as a group.

use planpilot_common::{
    Board, ColumnSort, CompactionPolicy, DropTarget, NewTask, Reconciliation, Task, TaskFilter,
    TaskId, TaskPatch, reconcile,
};

use super::TaskStore;
use crate::errors::ClientError;

/// Result of applying a reconciled move.
#[derive(Debug)]
pub enum MoveOutcome {
    /// Nothing to do; the store was not called.
    Unchanged,
    /// Moved task and every displaced sibling were persisted.
    Persisted { updated: usize },
    /// A store call failed; local state was replaced by a re-fetch.
    RolledBack { error: ClientError },
}

pub struct SyncController<S: TaskStore> {
    store: S,
    tasks: Vec<Task>,
    error: Option<String>,
    policy: CompactionPolicy,
}

impl<S: TaskStore> SyncController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
            error: None,
            policy: CompactionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CompactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The current user-visible error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn board(&self, filter: &TaskFilter, sort: ColumnSort) -> Board<'_> {
        Board::build(&self.tasks, filter, sort)
    }

    /// Replace the local list with the store's.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        match self.store.list().await {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("Failed to load tasks: {}", e));
                Err(e)
            }
        }
    }

    pub fn plan_move(&self, moved: TaskId, target: &DropTarget) -> Reconciliation {
        reconcile(&self.tasks, moved, target, self.policy)
    }

    /// Reconcile a drop against the local list and sync the result.
    pub async fn move_task(&mut self, moved: TaskId, target: &DropTarget) -> MoveOutcome {
        let plan = self.plan_move(moved, target);
        self.apply_move(plan).await
    }

    pub async fn apply_move(&mut self, result: Reconciliation) -> MoveOutcome {
        let plan = match result {
            Reconciliation::NoChange => return MoveOutcome::Unchanged,
            Reconciliation::Move(plan) => plan,
        };

        let snapshot = self.tasks.clone();
        plan.apply_to(&mut self.tasks);

        let Some(moved) = self.task(plan.moved.task_id) else {
            // A plan for a task we do not hold; nothing was changed locally.
            self.tasks = snapshot;
            return MoveOutcome::Unchanged;
        };
        let record = moved.record_patch();

        tracing::debug!(
            task_id = %plan.moved.task_id,
            status = %plan.moved.status,
            position = plan.moved.position,
            displaced = plan.displaced.len(),
            "persisting move"
        );

        match self.store.update(plan.moved.task_id, &record).await {
            Ok(saved) => self.replace(saved),
            Err(e) => return self.rollback(snapshot, e).await,
        }

        for shift in &plan.displaced {
            let Some(before) = snapshot.iter().find(|t| t.id == shift.task_id) else {
                continue;
            };
            let mut patch = before.record_patch();
            patch.status = Some(shift.status);
            patch.position = Some(shift.to);
            match self.store.update(shift.task_id, &patch).await {
                Ok(saved) => self.replace(saved),
                Err(e) => return self.rollback(snapshot, e).await,
            }
        }

        MoveOutcome::Persisted {
            updated: 1 + plan.displaced.len(),
        }
    }

    pub async fn create_task(&mut self, new: NewTask) -> Result<Task, ClientError> {
        match self.store.create(&new).await {
            Ok(task) => {
                self.tasks.push(task.clone());
                Ok(task)
            }
            Err(e) => Err(self.recover("Failed to create task", e).await),
        }
    }

    pub async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task, ClientError> {
        match self.store.update(id, &patch).await {
            Ok(task) => {
                self.replace(task.clone());
                Ok(task)
            }
            Err(e) => Err(self.recover("Failed to update task", e).await),
        }
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<(), ClientError> {
        match self.store.delete(id).await {
            Ok(()) => {
                self.tasks.retain(|t| t.id != id);
                Ok(())
            }
            Err(e) => Err(self.recover("Failed to delete task", e).await),
        }
    }

    fn replace(&mut self, saved: Task) {
        match self.tasks.iter_mut().find(|t| t.id == saved.id) {
            Some(slot) => *slot = saved,
            None => self.tasks.push(saved),
        }
    }

    /// Surface the error and re-fetch. If the re-fetch also fails, the
    /// pre-move snapshot is restored so no optimistic state survives.
    async fn rollback(&mut self, snapshot: Vec<Task>, error: ClientError) -> MoveOutcome {
        tracing::warn!(error = %error, "move failed, re-fetching tasks");
        self.error = Some(format!("Failed to update task position: {}", error));
        match self.store.list().await {
            Ok(tasks) => self.tasks = tasks,
            Err(refetch) => {
                tracing::warn!(error = %refetch, "re-fetch failed, restoring pre-move state");
                self.tasks = snapshot;
            }
        }
        MoveOutcome::RolledBack { error }
    }

    async fn recover(&mut self, context: &str, error: ClientError) -> ClientError {
        tracing::warn!(error = %error, "{}", context);
        self.error = Some(format!("{}: {}", context, error));
        if let Ok(tasks) = self.store.list().await {
            self.tasks = tasks;
        }
        error
    }
}
