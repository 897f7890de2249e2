//! HTTP surface: an axum router over [`state::AppState`].
//!
//! Teacher routes sit behind [`middleware::auth_middleware`]; login, report
//! downloads, upload previews, and the health check are public.

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

use self::state::AppState;

/// Main API server structure
pub struct ApiServer {
    state: AppState,
    addr: SocketAddr,
}

impl ApiServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    /// Bind and serve until Ctrl+C or SIGTERM.
    pub async fn start(self) -> std::io::Result<()> {
        let app = self.router();

        info!("Starting SmartMarks API server on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down...");
        },
    }
}
