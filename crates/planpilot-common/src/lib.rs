//! Shared domain types for PlanPilot.
//!
//! Everything in this crate is pure: the task model, the drag-and-drop
//! position reconciler and the board/filter helpers are used by both the
//! REST server and the sync client.

pub mod board;
pub mod reconcile;
pub mod task;

pub use board::{Board, ColumnSort, ColumnView, TaskFilter};
pub use reconcile::{
    CompactionPolicy, DropTarget, MovePlan, Placement, PositionShift, Reconciliation, reconcile,
};
pub use task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus, UserId};

/// Errors produced when parsing user-supplied values into domain types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid status '{0}': expected one of To Do, In Progress, Done")]
    InvalidStatus(String),

    #[error("Invalid priority '{0}': expected one of Low, Medium, High")]
    InvalidPriority(String),

    #[error("Invalid drop target '{0}': expected a column name or a task id")]
    InvalidDropTarget(String),

    #[error("Invalid compaction policy '{0}': expected gapped or compact")]
    InvalidPolicy(String),

    #[error("Invalid sort order '{0}': expected position or priority")]
    InvalidSort(String),
}
