use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Intake state of a user submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Live,
    Failed,
}

/// A user's request to add a shop to the catalog
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopSubmission {
    pub id: Uuid,
    pub google_maps_url: String,
    pub submitted_by: Option<Uuid>,
    pub shop_id: Option<Uuid>,
    pub status: SubmissionStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ShopSubmission {
    pub async fn create(
        google_maps_url: &str,
        submitted_by: Option<Uuid>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO shop_submissions (google_maps_url, submitted_by)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(google_maps_url)
        .bind(submitted_by)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM shop_submissions WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Link the pipeline's shop row and mark the submission in progress
    pub async fn mark_processing(id: Uuid, shop_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shop_submissions
            SET status = 'processing', shop_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_live(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shop_submissions
            SET status = 'live', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_failed(id: Uuid, reason: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shop_submissions
            SET status = 'failed', failure_reason = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Number of submissions awaiting the pipeline, for the admin digest
    pub async fn count_pending(pool: &PgPool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM shop_submissions WHERE status IN ('pending', 'processing')",
        )
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
