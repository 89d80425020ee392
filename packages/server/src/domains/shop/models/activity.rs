use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A public activity feed event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A user visit to a shop, optionally with a photo
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Option<Uuid>,
    pub comment: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ActivityEvent {
    pub async fn insert(
        user_id: Option<Uuid>,
        event_type: &str,
        metadata: &serde_json::Value,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO activity_feed (user_id, event_type, metadata)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(event_type)
        .bind(metadata)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_type(event_type: &str, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM activity_feed WHERE event_type = $1 ORDER BY created_at DESC",
        )
        .bind(event_type)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

impl CheckIn {
    pub async fn create(
        user_id: Uuid,
        shop_id: Option<Uuid>,
        comment: Option<&str>,
        photo_url: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO check_ins (user_id, shop_id, comment, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(shop_id)
        .bind(comment)
        .bind(photo_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Photo URLs from a user's check-ins, for the deletion sweep
    pub async fn photo_urls_for_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT photo_url FROM check_ins WHERE user_id = $1 AND photo_url IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}
