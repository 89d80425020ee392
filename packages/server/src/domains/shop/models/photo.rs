use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A scraped listing photo
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopPhoto {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A user-submitted menu photo
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuPhoto {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ShopPhoto {
    pub async fn find_for_shop(shop_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM shop_photos WHERE shop_id = $1 ORDER BY created_at",
        )
        .bind(shop_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(shop_id: Uuid, url: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO shop_photos (shop_id, url)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete_for_shop(shop_id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shop_photos WHERE shop_id = $1")
            .bind(shop_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl MenuPhoto {
    pub async fn insert(
        shop_id: Uuid,
        uploaded_by: Option<Uuid>,
        url: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO menu_photos (shop_id, uploaded_by, url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(uploaded_by)
        .bind(url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// URLs of menu photos uploaded by a user, for the deletion sweep
    pub async fn urls_for_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM menu_photos WHERE uploaded_by = $1")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}
