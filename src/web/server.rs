//! Axum web server implementation for dotlog.

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{require_header_key, require_header_or_query_key};
use super::handlers::{files, records};
use super::state::AppState;
use crate::config::{Config, DEFAULT_BODY_LIMIT};

/// Server configuration options.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    pub cors_permissive: bool,
    /// Largest accepted request body in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_permissive: true,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_permissive: config.cors_permissive,
            body_limit_bytes: config.body_limit_bytes,
        }
    }
}

/// Health check endpoint handler.
async fn health() -> &'static str {
    "ok"
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    // Writes take the key from the header only
    let save_routes = Router::new()
        .route("/save", post(records::save_record))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_header_key,
        ));

    // Reads also accept ?key= so download links work in a browser
    let file_routes = Router::new()
        .route("/files", get(files::list_files))
        .route("/files/{name}", get(files::download_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_header_or_query_key,
        ));

    Router::new()
        .route("/", get(health))
        .route("/healthz", get(health))
        .merge(save_routes)
        .merge(file_routes)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the web server.
///
/// This starts the Axum server and blocks until Ctrl-C or SIGTERM.
pub async fn run_server(state: AppState, config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    if state.api_key().is_none() {
        tracing::warn!("No API key configured; /save and /files will answer 500");
    }
    let app = build_router(state, &config);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
