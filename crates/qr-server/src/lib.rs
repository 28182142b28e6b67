//! HTTP service for quick-research.
//!
//! Exposes the research pipeline over HTTP:
//! - `POST /ask` with `{"query": "...", "depth": "quick|detailed|academic"}`
//! - `GET /health`
//!
//! # Example
//!
//! ```ignore
//! use qr_server::{Config, Server};
//!
//! let config = Config::load(None)?;
//! let server = Server::from_config(&config)?;
//! server.run(&config.server.bind).await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ErrorResponse, ServerError};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use qr_agents::{Depth, Researcher};

/// The quick-research HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(researcher: Researcher, default_depth: Depth) -> Self {
        Self {
            state: AppState::new(researcher, default_depth),
        }
    }

    pub fn from_config(config: &Config) -> qr_core::Result<Self> {
        Ok(Self::new(
            config.build_researcher()?,
            config.agent.default_depth,
        ))
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ask", post(routes::ask_handler))
            .route("/health", get(routes::health))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process receives ctrl-c.
    pub async fn run(self, bind: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind).await?;
        info!(addr = %listener.local_addr()?, "Server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
