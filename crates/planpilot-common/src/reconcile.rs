//! Drag-and-drop position reconciliation.
//!
//! [`reconcile`] maps a drop event onto the new `(status, position)` of the
//! moved task plus the position shifts of every sibling it displaces. It is a
//! pure function over the caller's in-memory task list; applying and
//! persisting the result is the sync layer's job.
//!
//! Positions are only ever opened up in the destination column. Whether the
//! origin column is renumbered afterwards is governed by
//! [`CompactionPolicy`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;
use crate::task::{Task, TaskId, TaskStatus};

/// Where a dragged task was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// The empty area of a column: append to its end.
    Column(TaskStatus),
    /// Another task card: take that card's slot.
    Task(TaskId),
}

impl FromStr for DropTarget {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(status) = s.parse::<TaskStatus>() {
            return Ok(Self::Column(status));
        }
        Uuid::parse_str(s.trim())
            .map(Self::Task)
            .map_err(|_| ParseError::InvalidDropTarget(s.to_string()))
    }
}

/// What happens to the column a task leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Only the destination column is renumbered; the origin keeps a gap.
    #[default]
    Gapped,
    /// Origin and destination columns are renumbered `0..n` in display order.
    Compact,
}

impl CompactionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gapped => "gapped",
            Self::Compact => "compact",
        }
    }
}

impl FromStr for CompactionPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gapped" => Ok(Self::Gapped),
            "compact" => Ok(Self::Compact),
            _ => Err(ParseError::InvalidPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub position: u32,
}

/// A sibling whose position changes as a side effect of the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionShift {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    pub moved: Placement,
    pub from_status: TaskStatus,
    pub from_position: u32,
    pub displaced: Vec<PositionShift>,
}

impl MovePlan {
    pub fn is_cross_column(&self) -> bool {
        self.from_status != self.moved.status
    }

    /// Apply the plan to a task list in place (the optimistic local update).
    pub fn apply_to(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            if task.id == self.moved.task_id {
                task.status = self.moved.status;
                task.position = self.moved.position;
            } else if let Some(shift) = self.displaced.iter().find(|s| s.task_id == task.id) {
                task.status = shift.status;
                task.position = shift.to;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    NoChange,
    Move(MovePlan),
}

impl Reconciliation {
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}

/// Tasks of one column in display order, optionally leaving one task out.
pub fn column_order(tasks: &[Task], status: TaskStatus, excluding: Option<TaskId>) -> Vec<&Task> {
    let mut column: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == status && Some(t.id) != excluding)
        .collect();
    column.sort_by_key(|t| t.position);
    column
}

/// Compute the placement for `moved_id` dropped on `target`.
///
/// Returns [`Reconciliation::NoChange`] when either task is unknown or the
/// drop resolves to the task's current status and position.
pub fn reconcile(
    tasks: &[Task],
    moved_id: TaskId,
    target: &DropTarget,
    policy: CompactionPolicy,
) -> Reconciliation {
    let Some(moved) = tasks.iter().find(|t| t.id == moved_id) else {
        return Reconciliation::NoChange;
    };
    let Some((target_status, target_index)) = resolve_target(tasks, moved, target) else {
        return Reconciliation::NoChange;
    };
    if target_status == moved.status && target_index == moved.position {
        return Reconciliation::NoChange;
    }

    let mut displaced: Vec<PositionShift> = tasks
        .iter()
        .filter(|t| t.id != moved.id && t.status == target_status && t.position >= target_index)
        .map(|t| PositionShift {
            task_id: t.id,
            status: t.status,
            from: t.position,
            to: t.position + 1,
        })
        .collect();
    displaced.sort_by_key(|s| s.from);

    let mut plan = MovePlan {
        moved: Placement {
            task_id: moved.id,
            status: target_status,
            position: target_index,
        },
        from_status: moved.status,
        from_position: moved.position,
        displaced,
    };

    if policy == CompactionPolicy::Compact {
        compact(tasks, &mut plan);
    }

    Reconciliation::Move(plan)
}

fn resolve_target(tasks: &[Task], moved: &Task, target: &DropTarget) -> Option<(TaskStatus, u32)> {
    match target {
        DropTarget::Column(status) => {
            let count = column_order(tasks, *status, Some(moved.id)).len();
            Some((*status, ordinal(count)))
        }
        DropTarget::Task(over_id) => {
            let over = tasks.iter().find(|t| t.id == *over_id)?;
            let siblings = column_order(tasks, over.status, Some(moved.id));
            let index = siblings
                .iter()
                .position(|t| t.id == over.id)
                .unwrap_or(siblings.len());
            Some((over.status, ordinal(index)))
        }
    }
}

/// Renumber the columns touched by `plan` to `0..n`, replacing its shifts.
fn compact(tasks: &[Task], plan: &mut MovePlan) {
    let mut columns = vec![plan.moved.status];
    if plan.is_cross_column() {
        columns.push(plan.from_status);
    }

    let after_move = |task: &Task| -> (TaskStatus, u32) {
        if task.id == plan.moved.task_id {
            (plan.moved.status, plan.moved.position)
        } else if let Some(shift) = plan.displaced.iter().find(|s| s.task_id == task.id) {
            (shift.status, shift.to)
        } else {
            (task.status, task.position)
        }
    };

    let mut moved_position = plan.moved.position;
    let mut shifts = Vec::new();
    for status in columns {
        let mut members: Vec<(&Task, u32)> = tasks
            .iter()
            .filter_map(|t| {
                let (s, p) = after_move(t);
                (s == status).then_some((t, p))
            })
            .collect();
        members.sort_by_key(|(_, p)| *p);

        for (index, (task, _)) in members.into_iter().enumerate() {
            let index = ordinal(index);
            if task.id == plan.moved.task_id {
                moved_position = index;
            } else if task.position != index {
                shifts.push(PositionShift {
                    task_id: task.id,
                    status,
                    from: task.position,
                    to: index,
                });
            }
        }
    }

    plan.moved.position = moved_position;
    plan.displaced = shifts;
}

fn ordinal(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
