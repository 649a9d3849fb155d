//! Board client: the `TaskStore` contract, its HTTP implementation, the
//! saved login session and the optimistic sync controller.
//!
//! | Module    | Responsibility                                          |
//! |-----------|---------------------------------------------------------|
//! | `http`    | `ApiClient`: reqwest client for the REST surface       |
//! | `session` | `Session` / `SessionStore`: token persisted as TOML    |
//! | `sync`    | `SyncController`: optimistic moves with refetch rollback |

use async_trait::async_trait;

use planpilot_common::{NewTask, Task, TaskId, TaskPatch};

use crate::errors::ClientError;

pub mod http;
pub mod session;
pub mod sync;

pub use http::ApiClient;
pub use session::{Session, SessionStore};
pub use sync::{MoveOutcome, SyncController};

/// Authoritative task list for one authenticated owner.
/// Real implementation: `ApiClient`. Test double: an in-memory fake.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, newest created first.
    async fn list(&self) -> Result<Vec<Task>, ClientError>;

    /// Create a task; the store assigns id and position.
    async fn create(&self, new: &NewTask) -> Result<Task, ClientError>;

    /// Apply a partial update. Unknown or foreign ids are `NotFound`.
    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError>;

    async fn delete(&self, id: TaskId) -> Result<(), ClientError>;
}
