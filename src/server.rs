/// Server setup and initialization
///
/// Wires together the shared node database, session manager, UI app registry,
/// and the MCP HTTP endpoint. Shutdown closes every session before tearing the
/// shared database down.

use crate::{
    config::Config,
    database::{SharedDatabase, SqliteNodeConnector},
    mcp::{
        handler::{
            initialize_result, JsonRpcRequest, JsonRpcResponse, McpHandler, INTERNAL_ERROR,
            PARSE_ERROR, SESSION_NOT_FOUND,
        },
        session::SessionManager,
    },
    ui::{default_app_configs, DistDirSource, UiAppRegistry},
};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Header carrying the session id on every request after `initialize`
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Process-wide node database shared by all sessions
    pub shared: Arc<SharedDatabase>,
    /// Open MCP sessions
    pub sessions: Arc<SessionManager>,
    /// JSON-RPC method dispatch
    pub handler: Arc<McpHandler>,
}

/// Build application state from configuration
///
/// Loads the UI app registry once. The node database itself is opened lazily by
/// the first session.
pub fn build_state(config: &Config) -> AppState {
    let shared = Arc::new(
        SharedDatabase::new(SqliteNodeConnector).with_init_timeout(config.database.init_timeout()),
    );

    tracing::info!("🎨 Loading UI apps from {}", config.ui.dist_dir);
    let registry = Arc::new(UiAppRegistry::new(
        default_app_configs(),
        Arc::new(DistDirSource::new(&config.ui.dist_dir)),
    ));
    registry.load();

    AppState {
        sessions: Arc::new(SessionManager::new(Arc::clone(&shared), &config.database.path)),
        handler: Arc::new(McpHandler::new(registry)),
        shared,
    }
}

/// Create the main Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/mcp", post(handle_mcp_post).delete(handle_mcp_delete))
        .with_state(state)
}

/// Start the HTTP server with the given configuration
///
/// Serves until ctrl-c (or SIGTERM on unix), then releases all sessions and
/// force-closes the shared database.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting nodegate server...");

    let state = build_state(&config);
    let app = create_app(state.clone());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let closed = state.sessions.close_all().await;
    tracing::info!(sessions = closed, "🛑 Shutting down, closing shared database");
    state.shared.force_close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("❌ Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("❌ Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal");
}

/// Handle one JSON-RPC message
///
/// POST /mcp
/// `initialize` opens a session and returns its id in the `mcp-session-id`
/// header. Every other message must carry a known session id. Notifications are
/// acknowledged with 202 and no body.
async fn handle_mcp_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Rejecting malformed JSON-RPC body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))),
            )
                .into_response();
        }
    };

    if request.method == "initialize" {
        return initialize(&state, request).await;
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    let session_id = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let session = match session_id {
        Some(session_id) => state.sessions.get_session(session_id).await,
        None => None,
    };
    let Some(session) = session else {
        return (
            StatusCode::NOT_FOUND,
            Json(JsonRpcResponse::failure(id, SESSION_NOT_FOUND, "Session not found")),
        )
            .into_response();
    };

    if request.is_notification() {
        tracing::debug!(session_id = %session.id, method = %request.method, "Notification received");
        return StatusCode::ACCEPTED.into_response();
    }

    let response = state.handler.dispatch(session.database.resource(), request).await;
    Json(response).into_response()
}

async fn initialize(state: &AppState, request: JsonRpcRequest) -> Response {
    let id = request.id.unwrap_or(Value::Null);

    match state.sessions.open_session().await {
        Ok(session) => (
            StatusCode::OK,
            [(SESSION_HEADER, session.id.clone())],
            Json(JsonRpcResponse::success(id, initialize_result())),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Failed to open session: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string())),
            )
                .into_response()
        }
    }
}

/// End a session
///
/// DELETE /mcp
async fn handle_mcp_delete(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let Some(session_id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
        return StatusCode::BAD_REQUEST;
    };

    if state.sessions.close_session(session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Health check endpoint handler
///
/// GET /healthz
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.session_count().await,
        "database": {
            "initialized": state.shared.is_initialized(),
            "refCount": state.shared.ref_count(),
            "path": state.shared.location(),
        }
    }))
}
