use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::kernel::ScrapedListing;

/// Pipeline position of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shop_processing_status", rename_all = "lowercase")]
pub enum ShopProcessingStatus {
    Pending,
    Scraping,
    Embedding,
    Publishing,
    Live,
    Failed,
}

/// A coffee shop catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop {
    pub id: Uuid,
    pub google_maps_url: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub google_place_id: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub opening_hours: Option<serde_json::Value>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub menu_url: Option<String>,
    pub description: Option<String>,
    pub mode_scores: Option<serde_json::Value>,
    pub enrichment_confidence: Option<f64>,
    pub menu_items: Option<serde_json::Value>,
    pub embedding: Option<pgvector::Vector>,
    pub processing_status: ShopProcessingStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub last_enriched_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Shop {
    /// Create a pending shop holding only its Google Maps URL
    pub async fn create_pending(google_maps_url: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO shops (google_maps_url)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(google_maps_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM shops WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_url(url: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM shops WHERE google_maps_url = $1")
            .bind(url)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Update pipeline status
    pub async fn set_status(
        id: Uuid,
        status: ShopProcessingStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET processing_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Overwrite the descriptive fields with fresh scrape data
    pub async fn apply_scrape(id: Uuid, listing: &ScrapedListing, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET name = $2,
                address = $3,
                latitude = $4,
                longitude = $5,
                google_place_id = $6,
                rating = $7,
                review_count = $8,
                opening_hours = $9,
                phone = $10,
                website = $11,
                menu_url = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&listing.name)
        .bind(&listing.address)
        .bind(listing.latitude)
        .bind(listing.longitude)
        .bind(&listing.google_place_id)
        .bind(listing.rating)
        .bind(listing.review_count)
        .bind(&listing.opening_hours)
        .bind(&listing.phone)
        .bind(&listing.website)
        .bind(&listing.menu_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Write classification output and advance to the embedding stage
    pub async fn apply_enrichment(
        id: Uuid,
        description: &str,
        mode_scores: &serde_json::Value,
        confidence: f64,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET description = $2,
                mode_scores = $3,
                enrichment_confidence = $4,
                last_enriched_at = NOW(),
                processing_status = 'embedding',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(description)
        .bind(mode_scores)
        .bind(confidence)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Write extracted menu items
    pub async fn update_menu_items(
        id: Uuid,
        menu_items: &serde_json::Value,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET menu_items = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(menu_items)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Store the embedding vector and advance to the publishing stage
    pub async fn update_embedding(id: Uuid, embedding: &[f32], pool: &PgPool) -> Result<Self> {
        let vector = pgvector::Vector::from(embedding.to_vec());
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET embedding = $2,
                processing_status = 'publishing',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(vector)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Go live. The publication time is stamped once; a staleness refresh
    /// that re-publishes keeps the original date.
    pub async fn publish(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET processing_status = 'live',
                published_at = COALESCE(published_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Live entries whose enrichment is older than the given number of days.
    /// Entries never enriched fall back to their creation time.
    pub async fn find_stale(days: i64, limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM shops
            WHERE processing_status = 'live'
              AND COALESCE(last_enriched_at, created_at) < NOW() - ($1 || ' days')::INTERVAL
            ORDER BY COALESCE(last_enriched_at, created_at) ASC
            LIMIT $2
            "#,
        )
        .bind(days.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Stamp a staleness probe that found nothing new
    pub async fn touch_last_checked(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE shops
            SET last_checked_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Live entries published within the last N days, newest first
    pub async fn find_published_since(days: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM shops
            WHERE processing_status = 'live'
              AND published_at >= NOW() - ($1 || ' days')::INTERVAL
            ORDER BY published_at DESC
            "#,
        )
        .bind(days.to_string())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM shops WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
