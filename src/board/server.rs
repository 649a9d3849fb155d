use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::auth::AuthConfig;
use super::db::{BoardDb, DbHandle};
use super::models::MessageResponse;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Built front end to serve, with `index.html` fallback for client routes.
    pub static_dir: Option<PathBuf>,
    pub dev_mode: bool,
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            db_path: PathBuf::from(".planpilot/planpilot.db"),
            static_dir: None,
            dev_mode: false,
            auth: AuthConfig {
                jwt_secret: String::new(),
                token_ttl: Duration::from_secs(24 * 60 * 60),
            },
        }
    }
}

impl ServerConfig {
    /// Address to bind. Dev mode listens on every interface.
    pub fn bind_addr(&self) -> String {
        let host = if self.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
        format!("{}:{}", host, self.port)
    }
}

/// Build the full application router: API routes, request tracing and,
/// when configured, the static front end.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut app = api::api_router().with_state(state);

    app = match config.static_dir.as_ref().filter(|dir| dir.is_dir()) {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            app.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => {
            if let Some(dir) = &config.static_dir {
                tracing::warn!(path = %dir.display(), "static directory not found, front end disabled");
            }
            app.fallback(not_found)
        }
    };

    app = app.layer(TraceLayer::new_for_http());
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: "Not found.".into(),
        }),
    )
}

/// Open the database named by `config` and build the router around it.
pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let db = BoardDb::new(&config.db_path).with_context(|| {
        format!(
            "Failed to initialize board database at {}",
            config.db_path.display()
        )
    })?;
    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        auth: config.auth.clone(),
    });
    Ok(build_router(state, config))
}

/// Serve `app` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = build_app(&config)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        addr = %local_addr,
        db = %config.db_path.display(),
        dev_mode = config.dev_mode,
        "PlanPilot server listening"
    );

    serve(listener, app, shutdown_signal()).await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
