//! Web layer module
//!
//! Thin axum handlers over the sync service and the image store. Handlers
//! validate path parameters at the boundary and map [`AppError`] values to
//! status codes through [`responses::handle_error`].
//!
//! [`AppError`]: crate::errors::AppError

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::providers::ProviderChain;
use crate::storage::ImageStore;
use crate::sync::SyncService;

pub mod handlers;
pub mod responses;

pub use responses::{ApiResponse, handle_error};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sync_service: SyncService,
    pub image_store: Arc<dyn ImageStore>,
    pub providers: Arc<ProviderChain>,
    pub web: WebConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        sync_service: SyncService,
        image_store: Arc<dyn ImageStore>,
        providers: Arc<ProviderChain>,
        web: WebConfig,
    ) -> Self {
        Self {
            sync_service,
            image_store,
            providers,
            web,
            start_time: Instant::now(),
        }
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.web.host, state.web.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    state.web.host, state.web.port
                )
            })?;

        Ok(Self {
            app: Self::create_router(state),
            addr,
        })
    }

    /// Builds the application router. Static `/sync` routes take precedence
    /// over the `/{chain_id}/{address}` image route.
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/sync", get(handlers::sync::list_sync_statuses))
            .route("/sync/{chain_id}", get(handlers::sync::trigger_sync))
            .route("/sync/{chain_id}/status", get(handlers::sync::sync_status))
            .route("/{chain_id}/{address}", get(handlers::images::serve_token_image))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(state)
    }

    /// Serves until SIGINT or SIGTERM, then drains in-flight requests.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind to {}", self.addr))?;
        info!("Listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Web server stopped");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
