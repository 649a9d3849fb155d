use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use planpilot_common::{NewTask, Priority, TaskPatch, TaskStatus};

use crate::errors::BoardError;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+@.+\..+$").expect("email regex is valid"));

const MIN_USERNAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

/// Stored account. The password is only ever held as a PHC hash string.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public projection of a user, safe to return over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// ── Request / response payloads ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupRequest {
    /// Trim and validate, returning the normalized request.
    pub fn validate(self) -> Result<Self, BoardError> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(BoardError::Validation(format!(
                "Username must be at least {} characters.",
                MIN_USERNAME_LEN
            )));
        }
        if !EMAIL_REGEX.is_match(&email) {
            return Err(BoardError::Validation("Invalid email format".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BoardError::Validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(Self {
            username,
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `POST /api/tasks`. The title is optional here so a missing title
/// gets a descriptive 400 rather than a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

impl CreateTaskRequest {
    pub fn validate(self) -> Result<NewTask, BoardError> {
        let title = normalize_title(self.title.as_deref())
            .ok_or_else(|| BoardError::Validation("Task title is required.".into()))?;
        let due_date = match self.due_date {
            Some(raw) => parse_due_date(&raw)?,
            None => None,
        };
        Ok(NewTask {
            title,
            description: normalize_description(self.description),
            due_date,
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
        })
    }
}

/// Trim a task patch and reject blank titles.
pub fn validate_patch(mut patch: TaskPatch) -> Result<TaskPatch, BoardError> {
    if patch.title.is_some() {
        patch.title = Some(
            normalize_title(patch.title.as_deref())
                .ok_or_else(|| BoardError::Validation("Task title cannot be empty.".into()))?,
        );
    }
    patch.description = patch.description.map(|d| d.trim().to_string());
    Ok(patch)
}

fn normalize_title(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn parse_due_date(raw: &str) -> Result<Option<chrono::NaiveDate>, BoardError> {
    // Reuse the shared lenient date format by round-tripping through a patch.
    let patch: TaskPatch = serde_json::from_value(serde_json::json!({ "due_date": raw }))
        .map_err(|e| BoardError::Validation(format!("Invalid due date: {}", e)))?;
    Ok(patch.due_date)
}
