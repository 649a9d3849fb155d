use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use uuid::Uuid;

use planpilot_common::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus, UserId};

use super::models::User;
use crate::errors::BoardError;

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "id, owner_id, title, description, due_date, status, priority, position, created_at, updated_at";

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT,
                    due_date TEXT,
                    status TEXT NOT NULL DEFAULT 'To Do',
                    priority TEXT NOT NULL DEFAULT 'Low',
                    position INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_partition ON tasks(owner_id, status, position);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Insert a user. Fails with `BoardError::EmailTaken` if the email is
    /// already registered (case-insensitive).
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now(),
        };
        let inserted = self.conn.execute(
            "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                timestamp(&user.created_at)
            ],
        );
        match inserted {
            Ok(_) => Ok(user),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(BoardError::EmailTaken.into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user")),
        }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("WHERE email = ?1", email)
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.query_user("WHERE id = ?1", &id.to_string())
    }

    fn query_user(&self, clause: &str, arg: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, email, password_hash, created_at FROM users {}",
            clause
        );
        let row = self
            .conn
            .query_row(&sql, params![arg], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()
            .context("Failed to query user")?;
        row.map(UserRow::into_user).transpose()
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    /// All of an owner's tasks, newest first.
    pub fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            TASK_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map(params![owner.to_string()], TaskRow::from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            let r = row.context("Failed to read task row")?;
            tasks.push(r.into_task()?);
        }
        Ok(tasks)
    }

    /// Fetch a task, scoped to its owner. Another user's task reads as absent.
    pub fn get_task(&self, owner: UserId, id: TaskId) -> Result<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = ?1 AND owner_id = ?2",
            TASK_COLUMNS
        );
        let row = self
            .conn
            .query_row(
                &sql,
                params![id.to_string(), owner.to_string()],
                TaskRow::from_row,
            )
            .optional()
            .context("Failed to query task")?;
        row.map(TaskRow::into_task).transpose()
    }

    /// Insert a task at the end of its column: one past the highest position
    /// among the owner's tasks with the same status, or 0 for an empty column.
    pub fn create_task(&self, owner: UserId, new: &NewTask) -> Result<Task> {
        let max_pos: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(position) FROM tasks WHERE owner_id = ?1 AND status = ?2",
                params![owner.to_string(), new.status.as_str()],
                |row| row.get(0),
            )
            .context("Failed to get max position")?;
        let position = match max_pos {
            Some(p) => u32::try_from(p + 1).context("Task position out of range")?,
            None => 0,
        };

        let now = now();
        let task = Task {
            id: Uuid::new_v4(),
            owner,
            title: new.title.clone(),
            description: new.description.clone(),
            due_date: new.due_date,
            status: new.status,
            priority: new.priority,
            position,
            created_at: now,
            updated_at: now,
        };
        self.conn
            .execute(
                &format!(
                    "INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    TASK_COLUMNS
                ),
                params![
                    task.id.to_string(),
                    owner.to_string(),
                    task.title,
                    task.description,
                    task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.position,
                    timestamp(&task.created_at),
                    timestamp(&task.updated_at),
                ],
            )
            .context("Failed to insert task")?;
        Ok(task)
    }

    /// Apply a partial update to an owner's task. Returns `None` when the
    /// task does not exist or belongs to someone else.
    pub fn update_task(&self, owner: UserId, id: TaskId, patch: &TaskPatch) -> Result<Option<Task>> {
        let Some(mut task) = self.get_task(owner, id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut task);
        task.updated_at = now();

        self.conn
            .execute(
                "UPDATE tasks SET title = ?1, description = ?2, due_date = ?3, status = ?4,
                     priority = ?5, position = ?6, updated_at = ?7
                 WHERE id = ?8 AND owner_id = ?9",
                params![
                    task.title,
                    task.description.as_deref().filter(|d| !d.is_empty()),
                    task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.position,
                    timestamp(&task.updated_at),
                    id.to_string(),
                    owner.to_string(),
                ],
            )
            .context("Failed to update task")?;
        if task.description.as_deref() == Some("") {
            task.description = None;
        }
        Ok(Some(task))
    }

    pub fn delete_task(&self, owner: UserId, id: TaskId) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
                params![id.to_string(), owner.to_string()],
            )
            .context("Failed to delete task")?;
        Ok(count > 0)
    }
}

/// Current time at the precision the database stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp in database: {}", raw))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid id in database: {}", raw))
}

struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Intermediate row struct for reading tasks from SQLite before converting
/// the status / priority / date strings into typed values.
struct TaskRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    due_date: Option<String>,
    status: String,
    priority: String,
    position: i64,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(TaskRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            due_date: row.get(4)?,
            status: row.get(5)?,
            priority: row.get(6)?,
            position: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        let status = TaskStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task status")?;
        let priority = Priority::from_str(&self.priority)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task priority")?;
        let due_date = self
            .due_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT))
            .transpose()
            .context("Failed to parse task due date")?;

        Ok(Task {
            id: parse_uuid(&self.id)?,
            owner: parse_uuid(&self.owner_id)?,
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            due_date,
            status,
            priority,
            position: u32::try_from(self.position).context("Negative task position")?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(title: &str, status: TaskStatus) -> NewTask {
        NewTask {
            title: title.into(),
            status,
            ..Default::default()
        }
    }

    fn user(db: &BoardDb, email: &str) -> Result<User> {
        db.create_user("tester", email, "$argon2id$fake")
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = BoardDb::new_in_memory()?;

        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('users', 'tasks')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 2, "Expected 2 tables to exist");

        let index_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name = 'idx_tasks_partition'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(index_count, 1);

        Ok(())
    }

    #[test]
    fn test_file_database_creates_parent_dirs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("board.db");
        let db = BoardDb::new(&path)?;
        user(&db, "a@b.com")?;
        drop(db);

        // Reopening runs migrations again without error and keeps data
        let db = BoardDb::new(&path)?;
        assert!(db.find_user_by_email("a@b.com")?.is_some());
        Ok(())
    }

    #[test]
    fn test_create_user_rejects_duplicate_email() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let created = user(&db, "alice@example.com")?;

        let err = user(&db, "ALICE@example.com").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::EmailTaken)
        ));

        let found = db.find_user_by_email("Alice@Example.com")?.expect("user");
        assert_eq!(found.id, created.id);
        assert_eq!(db.get_user(created.id)?.expect("user").email, "alice@example.com");
        Ok(())
    }

    #[test]
    fn test_create_task_appends_to_column() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let owner = user(&db, "a@b.com")?.id;

        let first = db.create_task(owner, &new_task("one", TaskStatus::ToDo))?;
        let second = db.create_task(owner, &new_task("two", TaskStatus::ToDo))?;
        let other_column = db.create_task(owner, &new_task("three", TaskStatus::Done))?;

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(other_column.position, 0);
        Ok(())
    }

    #[test]
    fn test_create_task_positions_are_per_owner() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let alice = user(&db, "alice@b.com")?.id;
        let bob = user(&db, "bob@b.com")?.id;

        db.create_task(alice, &new_task("a1", TaskStatus::ToDo))?;
        db.create_task(alice, &new_task("a2", TaskStatus::ToDo))?;
        let b1 = db.create_task(bob, &new_task("b1", TaskStatus::ToDo))?;
        assert_eq!(b1.position, 0);
        Ok(())
    }

    #[test]
    fn test_create_task_after_gap_uses_max() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let owner = user(&db, "a@b.com")?.id;

        let t = db.create_task(owner, &new_task("one", TaskStatus::ToDo))?;
        db.update_task(
            owner,
            t.id,
            &TaskPatch {
                position: Some(7),
                ..Default::default()
            },
        )?;
        let next = db.create_task(owner, &new_task("two", TaskStatus::ToDo))?;
        assert_eq!(next.position, 8);
        Ok(())
    }

    #[test]
    fn test_list_tasks_newest_first_and_scoped() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let alice = user(&db, "alice@b.com")?.id;
        let bob = user(&db, "bob@b.com")?.id;

        db.create_task(alice, &new_task("first", TaskStatus::ToDo))?;
        db.create_task(alice, &new_task("second", TaskStatus::InProgress))?;
        db.create_task(bob, &new_task("bob's", TaskStatus::ToDo))?;

        let tasks = db.list_tasks(alice)?;
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert!(tasks.iter().all(|t| t.owner == alice));
        Ok(())
    }

    #[test]
    fn test_task_fields_round_trip() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let owner = user(&db, "a@b.com")?.id;

        let created = db.create_task(
            owner,
            &NewTask {
                title: "Ship".into(),
                description: Some("v1".into()),
                due_date: NaiveDate::from_ymd_opt(2025, 6, 1),
                status: TaskStatus::InProgress,
                priority: Priority::High,
            },
        )?;
        let fetched = db.get_task(owner, created.id)?.expect("task");
        assert_eq!(fetched, created);
        Ok(())
    }

    #[test]
    fn test_update_task_applies_patch() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let owner = user(&db, "a@b.com")?.id;
        let created = db.create_task(owner, &new_task("draft", TaskStatus::ToDo))?;

        let updated = db
            .update_task(
                owner,
                created.id,
                &TaskPatch {
                    title: Some("final".into()),
                    status: Some(TaskStatus::Done),
                    position: Some(3),
                    ..Default::default()
                },
            )?
            .expect("task");
        assert_eq!(updated.title, "final");
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.position, 3);
        assert!(updated.updated_at >= created.updated_at);

        let fetched = db.get_task(owner, created.id)?.expect("task");
        assert_eq!(fetched.title, "final");
        assert_eq!(fetched.priority, Priority::Low);
        Ok(())
    }

    #[test]
    fn test_update_and_delete_are_owner_scoped() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let alice = user(&db, "alice@b.com")?.id;
        let bob = user(&db, "bob@b.com")?.id;
        let task = db.create_task(alice, &new_task("mine", TaskStatus::ToDo))?;

        let patch = TaskPatch {
            title: Some("stolen".into()),
            ..Default::default()
        };
        assert!(db.update_task(bob, task.id, &patch)?.is_none());
        assert!(db.get_task(bob, task.id)?.is_none());
        assert!(!db.delete_task(bob, task.id)?);

        assert_eq!(db.get_task(alice, task.id)?.expect("task").title, "mine");
        assert!(db.delete_task(alice, task.id)?);
        assert!(db.get_task(alice, task.id)?.is_none());
        assert!(!db.delete_task(alice, task.id)?);
        Ok(())
    }

    #[test]
    fn test_clearing_description_reads_back_as_none() -> Result<()> {
        let db = BoardDb::new_in_memory()?;
        let owner = user(&db, "a@b.com")?.id;
        let mut new = new_task("t", TaskStatus::ToDo);
        new.description = Some("something".into());
        let task = db.create_task(owner, &new)?;

        let updated = db
            .update_task(
                owner,
                task.id,
                &TaskPatch {
                    description: Some(String::new()),
                    ..Default::default()
                },
            )?
            .expect("task");
        assert_eq!(updated.description, None);
        assert_eq!(db.get_task(owner, task.id)?.expect("task").description, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_runs_on_blocking_pool() -> Result<()> {
        let handle = DbHandle::new(BoardDb::new_in_memory()?);
        let user = handle
            .call(|db| db.create_user("tester", "a@b.com", "hash"))
            .await?;
        let owner = user.id;
        let task = handle
            .call(move |db| db.create_task(owner, &new_task("async", TaskStatus::ToDo)))
            .await?;
        let tasks = handle.call(move |db| db.list_tasks(owner)).await?;
        assert_eq!(tasks, vec![task]);
        Ok(())
    }
}
