//! Server lifecycle management
//!
//! Runs the HTTP server and, on shutdown, stops the active transcoding
//! session so no transcoder outlives the server.

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use overlaytv_api::{create_router, AppState};
use overlaytv_core::{bootstrap::Services, Config};

/// `OverlayTV` server
pub struct OverlayTvServer {
    config: Config,
    services: Services,
    pool: Option<PgPool>,
    watchdog: Option<JoinHandle<()>>,
}

impl OverlayTvServer {
    pub const fn new(
        config: Config,
        services: Services,
        pool: Option<PgPool>,
        watchdog: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            config,
            services,
            pool,
            watchdog,
        }
    }

    /// Start the HTTP server and wait for shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        info!("Starting OverlayTV server...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let http_handle = self.start_http_server(shutdown_rx).await?;

        info!("Server started successfully");

        tokio::select! {
            result = http_handle => {
                match result {
                    Ok(()) => error!("HTTP server stopped unexpectedly"),
                    Err(e) => error!("HTTP server task failed: {}", e),
                }
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        // Signal the HTTP server to stop accepting connections
        let _ = shutdown_tx.send(true);

        self.shutdown().await;

        Ok(())
    }

    /// Gracefully shut down all server components
    async fn shutdown(&self) {
        info!("Shutting down OverlayTV server...");

        // 1. Stop supervising before the session goes away
        if let Some(watchdog) = &self.watchdog {
            watchdog.abort();
        }

        // 2. Terminate the transcoder
        info!("Stopping active stream session...");
        self.services.stream_manager.shutdown().await;

        // 3. Close the database connection pool
        if let Some(pool) = &self.pool {
            info!("Closing database connection pool...");
            pool.close().await;
            info!("Database pool closed");
        }

        info!("OverlayTV server shut down complete");
    }

    /// Bind the listener and spawn the HTTP server with graceful shutdown support
    async fn start_http_server(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let router = create_router(AppState::from(self.services.clone()));

        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_address}: {e}"))?;
        info!("HTTP server listening on {}", listener.local_addr()?);

        let handle = tokio::spawn(async move {
            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
