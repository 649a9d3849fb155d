use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use planpilot_common::{NewTask, Task, TaskId, TaskPatch};

use super::TaskStore;
use super::session::Session;
use crate::board::models::{LoginResponse, MessageResponse, UserView};
use crate::errors::ClientError;

/// reqwest client for the board REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client authenticated as the session's user, against the session's server.
    pub fn from_session(session: &Session, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self::new(&session.server, timeout)?.with_token(session.token.clone()))
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserView, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/signup"))
            .json(&json!({"username": username, "email": email, "password": password}))
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        read_json(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(req.bearer_auth(token))
    }
}

#[async_trait]
impl TaskStore for ApiClient {
    async fn list(&self) -> Result<Vec<Task>, ClientError> {
        let resp = self.authed(self.http.get(self.url("/api/tasks")))?.send().await?;
        read_json(resp).await
    }

    async fn create(&self, new: &NewTask) -> Result<Task, ClientError> {
        let resp = self
            .authed(self.http.post(self.url("/api/tasks")))?
            .json(new)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        let resp = self
            .authed(self.http.put(self.url(&format!("/api/task/{}", id))))?
            .json(patch)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), ClientError> {
        let resp = self
            .authed(self.http.delete(self.url(&format!("/api/task/{}", id))))?
            .send()
            .await?;
        let _: MessageResponse = read_json(resp).await?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(error_for_status(status, &body))
}

/// Map a non-success response onto the client error taxonomy, preferring the
/// server's `{"message": ...}` body over the raw text.
fn error_for_status(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<MessageResponse>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                trimmed.to_string()
            }
        });
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
