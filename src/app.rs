use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::cache::{CacheContext, OrchestratorRegistry};
use crate::config::Config;
use crate::hvw::HvwApi;
use crate::scheduler::Scheduler;
use crate::state::AppState;

/// Main application struct wiring pool, client, orchestrators, and scheduler.
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Initialize all components: database pool and migrations, the HVW
    /// client, the orchestrator registry, and the scheduler with its
    /// startup replay of persisted jobs.
    pub async fn new(config: Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect(&config.database_url)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            "database pool established"
        );

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed");

        let api = HvwApi::new(config.hvw_base_url.clone(), config.hvw_organization.clone())
            .context("Failed to create HVW client")?;

        let orchestrators = OrchestratorRegistry::new(
            CacheContext {
                pool: pool.clone(),
                api: Arc::new(api),
            },
            config.serialize_runs,
        );

        // The jobs table is the source of truth; the live registry is
        // rebuilt from it on every start.
        let scheduler = Arc::new(Scheduler::new(pool.clone(), orchestrators.clone()));
        scheduler
            .load_jobs()
            .await
            .context("Failed to load persisted jobs into scheduler")?;

        let state = AppState::new(pool, orchestrators, scheduler);
        Ok(App { config, state })
    }

    /// Serve the REST boundary until a shutdown signal arrives, then stop
    /// the scheduler's triggers.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "Web server listening");

        let router = crate::web::create_router(self.state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Web server failed")?;

        self.state.scheduler.shutdown().await;
        info!("Exiting gracefully");
        Ok(())
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
