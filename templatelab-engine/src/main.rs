use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod provider;
pub mod repository;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::provider::{CapabilityProvider, GatewayProvider};
use crate::service::{
    ExecutionLauncher, OrphanReconciler, PipelineRunner, RunnerSettings, StepExecutor,
};
use crate::store::{
    ExecutionStore, InMemoryProgressCache, PgExecutionStore, PgPipelineStore, PipelineStore,
    ProgressCache, RedisProgressCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "templatelab_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TemplateLab pipeline engine...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let progress: Arc<dyn ProgressCache> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis progress cache");
            Arc::new(
                RedisProgressCache::connect(url)
                    .await
                    .context("Failed to connect to Redis")?,
            )
        }
        None => {
            tracing::warn!("REDIS_URL not set, keeping progress in process");
            Arc::new(InMemoryProgressCache::new())
        }
    };

    let provider: Arc<dyn CapabilityProvider> = Arc::new(
        GatewayProvider::new(
            config.gemini.clone(),
            config.veo.clone(),
            config.provider_timeout,
        )
        .context("Failed to build HTTP client")?,
    );

    let executions: Arc<dyn ExecutionStore> = Arc::new(PgExecutionStore::new(pool.clone()));
    let pipelines: Arc<dyn PipelineStore> = Arc::new(PgPipelineStore::new(pool));

    let runner = Arc::new(PipelineRunner::new(
        Arc::clone(&executions),
        Arc::clone(&pipelines),
        Arc::clone(&progress),
        StepExecutor::new(Arc::clone(&provider)),
        RunnerSettings {
            progress_ttl: config.progress_ttl,
            heartbeat_interval: config.heartbeat_interval,
        },
    ));

    let launcher = Arc::new(ExecutionLauncher::new(
        Arc::clone(&executions),
        Arc::clone(&progress),
        runner,
    ));

    let reconciler = OrphanReconciler::new(
        executions,
        progress,
        config.lease_timeout,
        config.progress_ttl,
    )
    .spawn(config.sweep_interval);

    tracing::info!(
        "Orphan reconciler running (lease {:?}, sweep every {:?})",
        config.lease_timeout,
        config.sweep_interval
    );

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        launcher,
        pipelines,
        provider,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    reconciler.abort();
    tracing::info!("Engine stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
