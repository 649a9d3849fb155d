//! Board commands: `list`, `add`, `edit`, `move`, `delete`.
//!
//! Every command loads the board through a [`SyncController`] so edits and
//! moves go through the same optimistic path a drag-and-drop front end uses.

use anyhow::{Context, Result, bail};
use console::style;

use planpilot::client::{ApiClient, MoveOutcome, SessionStore, SyncController};
use planpilot::config::ClientConfig;
use planpilot::errors::ClientError;
use planpilot::ui::{icons, render_board, render_task_line};
use planpilot_common::{
    ColumnSort, CompactionPolicy, DropTarget, NewTask, Priority, Task, TaskFilter, TaskId,
    TaskPatch,
};

/// A loaded board plus the session it was loaded with.
struct OpenBoard {
    sync: SyncController<ApiClient>,
    sessions: SessionStore,
}

impl OpenBoard {
    async fn open(config: &ClientConfig, policy: CompactionPolicy) -> Result<Self> {
        let sessions = SessionStore::new(&config.session_path);
        let session = sessions.require()?;
        let client = ApiClient::from_session(&session, config.timeout)?;
        let mut board = Self {
            sync: SyncController::new(client).with_policy(policy),
            sessions,
        };
        if let Err(e) = board.sync.load().await {
            return Err(board.fail(e));
        }
        Ok(board)
    }

    /// Turn a client error into a command error, dropping a session the
    /// server no longer accepts.
    fn fail(&self, error: ClientError) -> anyhow::Error {
        if error.requires_login() {
            if let Err(e) = self.sessions.clear() {
                tracing::warn!(error = %e, "failed to remove rejected session");
            }
            return anyhow::Error::new(error).context("Please log in again with `planpilot login`");
        }
        error.into()
    }

    fn resolve(&self, raw: &str) -> Result<TaskId> {
        resolve_task_id(self.sync.tasks(), raw)
    }
}

/// Accept a full task id or an unambiguous prefix of one.
fn resolve_task_id(tasks: &[Task], raw: &str) -> Result<TaskId> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        bail!("Task id must not be empty");
    }
    if let Ok(id) = uuid::Uuid::parse_str(&needle) {
        return Ok(id);
    }
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id),
        [] => bail!("No task matches '{}'", raw),
        many => bail!(
            "'{}' is ambiguous: it matches {} tasks, use more characters",
            raw,
            many.len()
        ),
    }
}

/// A column name or full task id parses directly; anything else is tried as
/// an id prefix. A column name wins over a prefix that happens to spell one.
fn resolve_target(tasks: &[Task], raw: &str) -> Result<DropTarget> {
    if let Ok(target) = raw.parse::<DropTarget>() {
        return Ok(target);
    }
    resolve_task_id(tasks, raw)
        .map(DropTarget::Task)
        .with_context(|| format!("'{}' is neither a column nor a task", raw))
}

pub async fn cmd_list(
    config: &ClientConfig,
    search: Option<String>,
    priority: Option<Priority>,
    sort: ColumnSort,
    json: bool,
) -> Result<()> {
    let board = OpenBoard::open(config, CompactionPolicy::default()).await?;
    let filter = TaskFilter { search, priority };

    if json {
        let tasks: Vec<&Task> = board
            .sync
            .tasks()
            .iter()
            .filter(|t| filter.matches(t))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    let view = board.sync.board(&filter, sort);
    print!("{}", render_board(&view));
    if view.is_empty() && board.sync.tasks().is_empty() {
        println!();
        println!("Add one with `planpilot add <title>`.");
    }
    Ok(())
}

pub async fn cmd_add(config: &ClientConfig, new: NewTask) -> Result<()> {
    let mut board = OpenBoard::open(config, CompactionPolicy::default()).await?;
    let task = match board.sync.create_task(new).await {
        Ok(task) => task,
        Err(e) => return Err(board.fail(e)),
    };
    println!("{} Added to {}", icons::SPARKLE, style(task.status).bold());
    println!("  {}", render_task_line(&task));
    Ok(())
}

pub async fn cmd_edit(config: &ClientConfig, id: &str, patch: TaskPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to change: pass at least one of --title, --description, --due, --status, --priority");
    }
    let mut board = OpenBoard::open(config, CompactionPolicy::default()).await?;
    let id = board.resolve(id)?;
    let task = match board.sync.update_task(id, patch).await {
        Ok(task) => task,
        Err(e) => return Err(board.fail(e)),
    };
    println!("{} Updated", icons::CHECK);
    println!("  {}", render_task_line(&task));
    Ok(())
}

pub async fn cmd_move(
    config: &ClientConfig,
    task: &str,
    target: &str,
    policy: CompactionPolicy,
) -> Result<()> {
    let mut board = OpenBoard::open(config, policy).await?;
    let moved = board.resolve(task)?;
    if board.sync.task(moved).is_none() {
        bail!("No task matches '{}'", task);
    }
    let target = resolve_target(board.sync.tasks(), target)?;

    match board.sync.move_task(moved, &target).await {
        MoveOutcome::Unchanged => {
            println!("Task is already there, nothing to do.");
        }
        MoveOutcome::Persisted { updated } => {
            if let Some(task) = board.sync.task(moved) {
                println!(
                    "{} Moved to {} at position {} ({} task{} updated)",
                    icons::CHECK,
                    style(task.status).bold(),
                    task.position,
                    updated,
                    if updated == 1 { "" } else { "s" }
                );
                println!("  {}", render_task_line(task));
            }
        }
        MoveOutcome::RolledBack { error } => {
            eprintln!(
                "{} {}",
                icons::CROSS,
                style(board.sync.error().unwrap_or("Move failed")).red()
            );
            return Err(board.fail(error));
        }
    }
    Ok(())
}

pub async fn cmd_delete(config: &ClientConfig, id: &str) -> Result<()> {
    let mut board = OpenBoard::open(config, CompactionPolicy::default()).await?;
    let id = board.resolve(id)?;
    let title = board.sync.task(id).map(|t| t.title.clone());
    if let Err(e) = board.sync.delete_task(id).await {
        return Err(board.fail(e));
    }
    match title {
        Some(title) => println!("{} Deleted {}", icons::CHECK, style(title).bold()),
        None => println!("{} Deleted {}", icons::CHECK, id),
    }
    Ok(())
}
