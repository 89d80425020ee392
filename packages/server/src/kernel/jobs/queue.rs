//! PostgreSQL-backed job queue.
//!
//! The queue client is the only component that reads or writes the
//! `job_queue` table. Claiming relies on `FOR UPDATE SKIP LOCKED` so any
//! number of pollers can share one store without handing out the same row
//! twice.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::job::{backoff_delay, Job, JobStatus, JobType};

/// Per-status row counts for the admin digest.
#[derive(FromRow, Debug, Clone)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: i64,
}

/// Trait for job queue operations.
///
/// Handlers and schedulers talk to the store exclusively through this
/// seam; the single production implementation is [`PostgresJobQueue`].
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Insert a `pending` job eligible immediately.
    ///
    /// No deduplication; callers own idempotency.
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        priority: i32,
    ) -> Result<Uuid>;

    /// Insert a `pending` job eligible at `run_at`.
    async fn schedule(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        priority: i32,
        run_at: DateTime<Utc>,
    ) -> Result<Uuid>;

    /// Atomically claim the best eligible job, optionally filtered by type.
    ///
    /// Flips the row to `claimed`, stamps `claimed_at` and increments
    /// `attempts` in the same statement. Concurrent callers each get
    /// distinct jobs or `None`; nobody blocks.
    async fn claim(&self, job_type: Option<JobType>) -> Result<Option<Job>>;

    /// Mark a claimed job completed. A second call is a no-op.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Record a failure: re-queue with exponential backoff while attempts
    /// remain, otherwise terminal `failed`. Never deletes the row.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Terminal `failed` regardless of remaining attempts.
    async fn fail_permanently(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Operator reset for a `failed` or `dead_letter` job.
    ///
    /// Returns false when the job is in any other status.
    async fn retry(&self, job_id: Uuid) -> Result<bool>;

    /// Delete pending/claimed jobs whose payload references the shop.
    async fn cancel_for_shop(&self, shop_id: Uuid) -> Result<u64>;

    /// Route claims older than `older_than` back through the failure path
    /// so a crashed poller's jobs re-enter the queue with attempts counted.
    async fn requeue_stuck(&self, older_than: Duration) -> Result<u64>;

    /// Row counts grouped by status.
    async fn counts_by_status(&self) -> Result<Vec<StatusCount>>;

    /// Failed and dead-letter jobs, most recent first.
    async fn list_dead_jobs(&self, limit: i64) -> Result<Vec<Job>>;

    /// Fetch a job by id.
    async fn find_by_id(&self, job_id: Uuid) -> Result<Job>;
}

/// PostgreSQL-backed job queue implementation.
#[derive(Clone)]
pub struct PostgresJobQueue {
    pool: PgPool,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        priority: i32,
    ) -> Result<Uuid> {
        self.schedule(job_type, payload, priority, Utc::now()).await
    }

    async fn schedule(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        priority: i32,
        run_at: DateTime<Utc>,
    ) -> Result<Uuid> {
        let job_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO job_queue (job_type, payload, priority, scheduled_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(job_type)
        .bind(&payload)
        .bind(priority)
        .bind(run_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to enqueue job")?;

        debug!(job_id = %job_id, job_type = %job_type, priority, "job enqueued");

        Ok(job_id)
    }

    async fn claim(&self, job_type: Option<JobType>) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            WITH next_job AS (
                SELECT id
                FROM job_queue
                WHERE status = 'pending'
                  AND scheduled_at <= NOW()
                  AND ($1::job_type IS NULL OR job_type = $1)
                ORDER BY priority DESC, scheduled_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE job_queue
            SET status = 'claimed',
                claimed_at = NOW(),
                attempts = attempts + 1,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_job)
            RETURNING id, job_type, payload, status, priority, attempts, max_attempts,
                      last_error, scheduled_at, claimed_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(job_type)
        .fetch_optional(&self.pool)
        .await
        .context("failed to claim job")?;

        Ok(job)
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'completed',
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'claimed'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to complete job")?;

        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let job = self.find_by_id(job_id).await?;

        if job.has_attempts_remaining() {
            let retry_at = Utc::now() + backoff_delay(job.attempts);

            sqlx::query(
                r#"
                UPDATE job_queue
                SET status = 'pending',
                    scheduled_at = $1,
                    last_error = $2,
                    claimed_at = NULL,
                    updated_at = NOW()
                WHERE id = $3 AND status = 'claimed'
                "#,
            )
            .bind(retry_at)
            .bind(error)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("failed to re-queue job")?;

            info!(
                job_id = %job_id,
                attempt = job.attempts,
                retry_at = %retry_at,
                "job failed, retry scheduled"
            );
        } else {
            sqlx::query(
                r#"
                UPDATE job_queue
                SET status = 'failed',
                    last_error = $1,
                    updated_at = NOW()
                WHERE id = $2 AND status = 'claimed'
                "#,
            )
            .bind(error)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("failed to mark job failed")?;

            warn!(job_id = %job_id, attempts = job.attempts, "job failed terminally");
        }

        Ok(())
    }

    async fn fail_permanently(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'failed',
                last_error = $1,
                updated_at = NOW()
            WHERE id = $2 AND status = 'claimed'
            "#,
        )
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to mark job permanently failed")?;

        warn!(job_id = %job_id, error, "job failed permanently");

        Ok(())
    }

    async fn retry(&self, job_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE job_queue
            SET status = 'pending',
                attempts = 0,
                last_error = NULL,
                scheduled_at = NOW(),
                claimed_at = NULL,
                completed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('failed', 'dead_letter')
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to retry job")?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel_for_shop(&self, shop_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE status IN ('pending', 'claimed')
              AND payload->>'shop_id' = $1::text
            "#,
        )
        .bind(shop_id)
        .execute(&self.pool)
        .await
        .context("failed to cancel jobs for shop")?;

        let cancelled = result.rows_affected();
        if cancelled > 0 {
            info!(shop_id = %shop_id, cancelled, "cancelled in-flight jobs for shop");
        }

        Ok(cancelled)
    }

    async fn requeue_stuck(&self, older_than: Duration) -> Result<u64> {
        let stuck: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM job_queue
            WHERE status = 'claimed'
              AND claimed_at < NOW() - ($1 || ' seconds')::INTERVAL
            "#,
        )
        .bind(older_than.num_seconds().to_string())
        .fetch_all(&self.pool)
        .await
        .context("failed to find stuck jobs")?;

        for job_id in &stuck {
            self.fail(*job_id, "claim expired").await?;
        }

        if !stuck.is_empty() {
            warn!(count = stuck.len(), "re-queued stuck claims");
        }

        Ok(stuck.len() as u64)
    }

    async fn counts_by_status(&self) -> Result<Vec<StatusCount>> {
        let counts = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM job_queue
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to count jobs by status")?;

        Ok(counts)
    }

    async fn list_dead_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, job_type, payload, status, priority, attempts, max_attempts,
                   last_error, scheduled_at, claimed_at, completed_at, created_at, updated_at
            FROM job_queue
            WHERE status IN ('failed', 'dead_letter')
            ORDER BY updated_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to list dead jobs")?;

        Ok(jobs)
    }

    async fn find_by_id(&self, job_id: Uuid) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, job_type, payload, status, priority, attempts, max_attempts,
                   last_error, scheduled_at, claimed_at, completed_at, created_at, updated_at
            FROM job_queue
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("job {} not found", job_id))?;

        Ok(job)
    }
}
