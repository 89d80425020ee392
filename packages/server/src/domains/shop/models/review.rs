use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::kernel::ScrapedReview;

/// A scraped customer review attached to a shop
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopReview {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub text: String,
    pub rating: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ShopReview {
    pub async fn find_for_shop(shop_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM shop_reviews WHERE shop_id = $1 ORDER BY published_at DESC NULLS LAST",
        )
        .bind(shop_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Newest stored review date for a shop, used by the staleness probe
    pub async fn newest_published_at(
        shop_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            "SELECT MAX(published_at) FROM shop_reviews WHERE shop_id = $1",
        )
        .bind(shop_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.and_then(|(max,)| max))
    }

    pub async fn insert(
        shop_id: Uuid,
        review: &ScrapedReview,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO shop_reviews (shop_id, text, rating, published_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(&review.text)
        .bind(review.rating)
        .bind(review.published_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete_for_shop(shop_id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shop_reviews WHERE shop_id = $1")
            .bind(shop_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
