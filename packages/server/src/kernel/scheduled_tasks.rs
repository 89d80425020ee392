//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! This module provides the cron cadences of the system:
//! - Daily staleness sweep enqueue (03:00)
//! - Daily account deletion sweep (04:00)
//! - Weekly member email enqueue (Monday 09:00)
//! - Daily admin digest enqueue (08:00)
//! - Hourly requeue of expired claims
//!
//! # Architecture
//!
//! Scheduled tasks run independently of the job queue poller. With one
//! exception they enqueue jobs rather than doing work directly, so the
//! work itself still flows through the queue's retry bookkeeping. The
//! account deletion sweep runs inline because its per-user isolation and
//! fail-closed handling live in the sweep itself.
//!
//! ```text
//! Scheduler (cron)
//!     │
//!     ├─► enqueue(staleness_sweep)      03:00 daily
//!     ├─► account deletion sweep        04:00 daily (inline)
//!     ├─► enqueue(weekly_email)         09:00 Monday
//!     ├─► enqueue(admin_digest_email)   08:00 daily
//!     └─► requeue_stuck(30 min)         hourly
//! ```

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use serde_json::json;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::jobs::JobType;
use super::ServerKernel;
use crate::domains::account;

/// Claims older than this are treated as abandoned by a crashed worker.
const STUCK_CLAIM_MINUTES: i64 = 30;

/// Start all scheduled tasks
pub async fn start_scheduler(kernel: Arc<ServerKernel>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Staleness sweep - runs daily at 03:00
    let staleness_kernel = kernel.clone();
    let staleness_job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
        let kernel = staleness_kernel.clone();
        Box::pin(async move {
            if let Err(e) = enqueue_cron_job(&kernel, JobType::StalenessSweep).await {
                tracing::error!("Staleness sweep enqueue failed: {}", e);
            }
        })
    })?;
    scheduler.add(staleness_job).await?;

    // Account deletion sweep - runs daily at 04:00
    let deletion_kernel = kernel.clone();
    let deletion_job = Job::new_async("0 0 4 * * *", move |_uuid, _lock| {
        let kernel = deletion_kernel.clone();
        Box::pin(async move {
            if let Err(e) = account::deletion::run_sweep(&kernel).await {
                tracing::error!("Account deletion sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(deletion_job).await?;

    // Weekly member email - runs every Monday at 09:00
    let weekly_kernel = kernel.clone();
    let weekly_job = Job::new_async("0 0 9 * * MON", move |_uuid, _lock| {
        let kernel = weekly_kernel.clone();
        Box::pin(async move {
            if let Err(e) = enqueue_cron_job(&kernel, JobType::WeeklyEmail).await {
                tracing::error!("Weekly email enqueue failed: {}", e);
            }
        })
    })?;
    scheduler.add(weekly_job).await?;

    // Admin digest - runs daily at 08:00
    let digest_kernel = kernel.clone();
    let digest_job = Job::new_async("0 0 8 * * *", move |_uuid, _lock| {
        let kernel = digest_kernel.clone();
        Box::pin(async move {
            if let Err(e) = enqueue_cron_job(&kernel, JobType::AdminDigestEmail).await {
                tracing::error!("Admin digest enqueue failed: {}", e);
            }
        })
    })?;
    scheduler.add(digest_job).await?;

    // Requeue expired claims - runs hourly
    let requeue_kernel = kernel.clone();
    let requeue_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let kernel = requeue_kernel.clone();
        Box::pin(async move {
            if let Err(e) = run_requeue_stuck(&kernel).await {
                tracing::error!("Stuck claim requeue failed: {}", e);
            }
        })
    })?;
    scheduler.add(requeue_job).await?;

    scheduler.start().await?;

    tracing::info!(
        "Scheduled tasks started (staleness 03:00, deletion 04:00, weekly email MON 09:00, digest 08:00, requeue hourly)"
    );
    Ok(scheduler)
}

/// Enqueue a cron-triggered job at default priority
async fn enqueue_cron_job(kernel: &ServerKernel, job_type: JobType) -> Result<()> {
    let job_id = kernel
        .job_queue
        .enqueue(job_type, json!({}), super::jobs::priority::DEFAULT)
        .await?;

    tracing::info!(%job_id, %job_type, "Enqueued cron job");
    Ok(())
}

/// Route expired claims back through the fail/backoff path
async fn run_requeue_stuck(kernel: &ServerKernel) -> Result<()> {
    let requeued = kernel
        .job_queue
        .requeue_stuck(Duration::minutes(STUCK_CLAIM_MINUTES))
        .await?;

    if requeued > 0 {
        tracing::warn!(count = requeued, "Requeued expired claims");
    }

    Ok(())
}
