use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A user account row.
///
/// Deletion is two-phase: the app stamps `deletion_requested_at`, and the
/// sweep hard-deletes the row once the grace window has passed and storage
/// cleanup succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_opted_in: bool,
    pub deletion_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// SQL Queries - ALL queries must be in models/
impl Profile {
    pub async fn create(email: Option<&str>, display_name: Option<&str>, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO profiles (email, display_name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(display_name)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn set_avatar_url(id: Uuid, avatar_url: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE profiles
            SET avatar_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Stamp the deletion request. The row stays until the sweep collects it.
    pub async fn request_deletion(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE profiles
            SET deletion_requested_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Profiles whose deletion request is older than the grace window.
    pub async fn find_eligible_for_deletion(grace_days: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM profiles
            WHERE deletion_requested_at IS NOT NULL
              AND deletion_requested_at < NOW() - ($1 || ' days')::INTERVAL
            ORDER BY deletion_requested_at ASC
            "#,
        )
        .bind(grace_days.to_string())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Addresses that should receive the weekly newsletter.
    pub async fn newsletter_recipients(pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT email FROM profiles
            WHERE email_opted_in = TRUE
              AND email IS NOT NULL
              AND deletion_requested_at IS NULL
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    /// Hard delete. FK cascades remove check-ins and activity rows.
    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
