use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::db::{BoardDb, DbHandle};
use crate::config::TaskboardConfig;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Permissive CORS so a front end on another origin can call the API.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            db_path: PathBuf::from(".taskboard/boards.db"),
            cors: true,
        }
    }
}

impl From<&TaskboardConfig> for ServerConfig {
    fn from(config: &TaskboardConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            db_path: config.storage.db_path.clone(),
            cors: config.server.cors,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>, cors: bool) -> Router {
    let mut app = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Open the store at `db_path`, creating its parent directory.
pub fn open_store(db_path: &std::path::Path) -> Result<BoardDb> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }
    BoardDb::new(db_path).context("Failed to initialize board database")
}

/// Bind the listener and serve until `shutdown` resolves.
pub async fn serve_on<F>(listener: tokio::net::TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

/// Start the board server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let db = open_store(&config.db_path)?;
    let state = Arc::new(AppState {
        db: DbHandle::new(db),
    });
    let app = build_router(state, config.cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr: SocketAddr = listener.local_addr()?;
    tracing::info!(%local_addr, db_path = %config.db_path.display(), "taskboard server running");

    serve_on(listener, app, shutdown_signal()).await?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router(cors: bool) -> Router {
        let db = BoardDb::new_in_memory().unwrap();
        let state = Arc::new(AppState {
            db: DbHandle::new(db),
        });
        build_router(state, cors)
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router(true);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_headers_present_when_enabled() {
        let app = test_router(true);
        let req = Request::builder()
            .uri("/boards")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(
            resp.headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn test_cors_headers_absent_when_disabled() {
        let app = test_router(false);
        let req = Request::builder()
            .uri("/boards")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(
            !resp
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_router(true);
        let req = Request::builder()
            .uri("/some/client/route")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_create_board_via_full_router() {
        let app = test_router(true);
        let req = Request::builder()
            .method("POST")
            .uri("/boards")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"id": "server-test", "boardName": "Server"}).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let board: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(board["boardName"], "Server");
    }

    #[test]
    fn test_open_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/boards.db");
        open_store(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path, PathBuf::from(".taskboard/boards.db"));
        assert!(config.cors);
    }
}
