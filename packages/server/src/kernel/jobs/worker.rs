//! Job worker: the poll loop and dispatcher.
//!
//! The worker claims at most one job per tick, maps its type to a stage
//! handler through an exhaustive match, and routes the outcome back into
//! the queue: `complete` on success, `fail` (backoff) on retryable errors,
//! `fail_permanently` on errors retrying cannot fix.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::{Job, JobType};
use crate::domains::email;
use crate::domains::shop::handlers;
use crate::kernel::ServerKernel;

/// Error classification for stage handlers.
///
/// Everything converts to `Retryable` by default; handlers opt specific
/// failures into `Permanent` (scrape miss, undecodable payload).
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Retryable(anyhow::Error),
    #[error(transparent)]
    Permanent(anyhow::Error),
}

impl JobError {
    pub fn permanent(err: impl Into<anyhow::Error>) -> Self {
        JobError::Permanent(err.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, JobError::Permanent(_))
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::Retryable(err)
    }
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::Retryable(err.into())
    }
}

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct JobWorkerConfig {
    /// How long to wait between claim attempts.
    pub poll_interval: Duration,
    /// Worker ID for this instance, used in logs only.
    pub worker_id: String,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl JobWorkerConfig {
    /// Create a new config with a specific worker ID.
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// A worker that drains the job queue one job per tick.
///
/// Any number of workers may share one store; correctness rests entirely
/// on the claim statement's skip-locked semantics.
pub struct JobWorker {
    kernel: Arc<ServerKernel>,
    config: JobWorkerConfig,
}

impl JobWorker {
    pub fn new(kernel: Arc<ServerKernel>) -> Self {
        Self {
            kernel,
            config: JobWorkerConfig::default(),
        }
    }

    pub fn with_config(kernel: Arc<ServerKernel>, config: JobWorkerConfig) -> Self {
        Self { kernel, config }
    }

    /// Claim and fully process at most one job.
    ///
    /// Returns whether a job was processed. Errors from the claim itself
    /// propagate; handler errors are absorbed into the job row.
    pub async fn tick(&self) -> Result<bool> {
        let Some(job) = self.kernel.job_queue.claim(None).await? else {
            return Ok(false);
        };

        self.process_job(&job).await;
        Ok(true)
    }

    async fn process_job(&self, job: &Job) {
        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            "processing job"
        );

        match self.dispatch(job).await {
            Ok(()) => {
                debug!(job_id = %job.id, job_type = %job.job_type, "job succeeded");
                if let Err(e) = self.kernel.job_queue.complete(job.id).await {
                    error!(job_id = %job.id, error = %e, "failed to mark job completed");
                }
            }
            Err(JobError::Permanent(e)) => {
                error!(job_id = %job.id, job_type = %job.job_type, error = %e, "job failed permanently");
                if let Err(e) = self
                    .kernel
                    .job_queue
                    .fail_permanently(job.id, &format!("{e:#}"))
                    .await
                {
                    error!(job_id = %job.id, error = %e, "failed to mark job failed");
                }
            }
            Err(JobError::Retryable(e)) => {
                warn!(job_id = %job.id, job_type = %job.job_type, error = %e, "job failed");
                if let Err(e) = self.kernel.job_queue.fail(job.id, &format!("{e:#}")).await {
                    error!(job_id = %job.id, error = %e, "failed to record job failure");
                }
            }
        }
    }

    async fn dispatch(&self, job: &Job) -> Result<(), JobError> {
        let kernel = &self.kernel;
        match job.job_type {
            JobType::ScrapeShop => handlers::scrape_shop::run(job, kernel).await,
            JobType::EnrichShop => handlers::enrich_shop::run(job, kernel).await,
            JobType::EnrichMenuPhoto => handlers::enrich_menu_photo::run(job, kernel).await,
            JobType::GenerateEmbedding => handlers::generate_embedding::run(job, kernel).await,
            JobType::PublishShop => handlers::publish_shop::run(job, kernel).await,
            JobType::StalenessSweep => handlers::staleness_sweep::run(job, kernel).await,
            JobType::WeeklyEmail => email::weekly_email::run(job, kernel).await,
            JobType::AdminDigestEmail => email::admin_digest::run(job, kernel).await,
        }
    }

    /// Run the poll loop until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "job worker starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "failed to claim job");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(worker_id = %self.config.worker_id, "job worker stopped");
        Ok(())
    }
}
