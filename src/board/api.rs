use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use uuid::Uuid;

use planpilot_common::{TaskId, TaskPatch};

use super::auth::{self, AuthConfig, AuthUser};
use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::{
    CreateTaskRequest, LoginRequest, LoginResponse, MessageResponse, SignupRequest,
    validate_patch,
};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub auth: AuthConfig,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::TaskNotFound { .. } => ApiError::NotFound("Task not found.".into()),
            BoardError::EmailTaken
            | BoardError::InvalidCredentials
            | BoardError::Validation(_) => ApiError::BadRequest(err.to_string()),
            BoardError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            BoardError::LockPoisoned | BoardError::Other(_) => {
                ApiError::Internal(format!("{:#}", anyhow::Error::from(err)))
            }
        }
    }
}

/// Database calls return `anyhow::Error`; typed board errors raised inside
/// them keep their status mapping.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BoardError>() {
            Ok(board) => board.into(),
            Err(other) => ApiError::Internal(format!("{:#}", other)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/task/{id}", put(update_task).delete(delete_task))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Malformed ids can never name a task, so they read as not found.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Task not found.".into()))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn signup(
    State(state): State<SharedState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let req = req.validate()?;
    let password_hash = auth::hash_password(&req.password)?;
    let user = state
        .db
        .call(move |db| db.create_user(&req.username, &req.email, &password_hash))
        .await?;
    tracing::info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(user.view())))
}

async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_string();
    let user = state
        .db
        .call(move |db| db.find_user_by_email(&email))
        .await?;

    let user = match user {
        Some(user) if auth::verify_password(&req.password, &user.password_hash) => user,
        _ => return Err(BoardError::InvalidCredentials.into()),
    };
    let token = auth::issue_token(&state.auth, user.id)?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        user: user.view(),
    }))
}

async fn list_tasks(
    State(state): State<SharedState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let owner = caller.user_id;
    let tasks = state.db.call(move |db| db.list_tasks(owner)).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<SharedState>,
    caller: AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let new = req.validate()?;
    let owner = caller.user_id;
    let task = state
        .db
        .call(move |db| db.create_task(owner, &new))
        .await?;
    tracing::debug!(task_id = %task.id, status = %task.status, position = task.position, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<SharedState>,
    caller: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_task_id(&id)?;
    let Json(patch) = payload?;
    let patch = validate_patch(patch)?;
    let owner = caller.user_id;
    let task = state
        .db
        .call(move |db| db.update_task(owner, id, &patch))
        .await?;
    match task {
        Some(task) => {
            tracing::debug!(task_id = %task.id, status = %task.status, position = task.position, "task updated");
            Ok(Json(task))
        }
        None => Err(BoardError::TaskNotFound { id }.into()),
    }
}

async fn delete_task(
    State(state): State<SharedState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_task_id(&id)?;
    let owner = caller.user_id;
    let deleted = state
        .db
        .call(move |db| db.delete_task(owner, id))
        .await?;
    match deleted {
        true => {
            tracing::debug!(task_id = %id, "task deleted");
            Ok(Json(MessageResponse {
                message: "Task deleted successfully".into(),
            }))
        }
        false => Err(BoardError::TaskNotFound { id }.into()),
    }
}
