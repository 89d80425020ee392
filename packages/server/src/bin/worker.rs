// Main entry point for the pipeline worker

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use caferoam_core::kernel::jobs::{JobWorker, JobWorkerConfig, PostgresJobQueue};
use caferoam_core::kernel::{
    start_scheduler, AnthropicClient, ApifyScraper, OpenAiClient, ResendClient, ServerKernel,
    SupabaseStorage,
};
use caferoam_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,caferoam_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CafeRoam pipeline worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Assemble the kernel from production providers
    let job_queue = Arc::new(PostgresJobQueue::new(pool.clone()));
    let kernel = Arc::new(ServerKernel::new(
        pool,
        Arc::new(ApifyScraper::new(config.apify_api_token)),
        Arc::new(AnthropicClient::new(config.anthropic_api_key)?),
        Arc::new(OpenAiClient::new(config.openai_api_key)?),
        Arc::new(ResendClient::new(config.resend_api_key)?),
        Arc::new(SupabaseStorage::new(
            config.supabase_url,
            config.supabase_service_key,
        )?),
        job_queue,
        config.admin_email,
    ));

    // Cron cadences: sweeps, emails, stuck-claim requeue
    let _scheduler = start_scheduler(kernel.clone())
        .await
        .context("Failed to start scheduler")?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let worker_config = JobWorkerConfig {
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        ..JobWorkerConfig::default()
    };
    JobWorker::with_config(kernel, worker_config)
        .run(shutdown)
        .await?;

    tracing::info!("Worker stopped");

    Ok(())
}
