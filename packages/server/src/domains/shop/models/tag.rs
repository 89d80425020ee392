use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::kernel::TagSelection;

/// Taxonomy dimension a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tag_dimension", rename_all = "lowercase")]
pub enum TagDimension {
    Functionality,
    Time,
    Ambience,
    Mode,
    Coffee,
}

impl TagDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagDimension::Functionality => "functionality",
            TagDimension::Time => "time",
            TagDimension::Ambience => "ambience",
            TagDimension::Mode => "mode",
            TagDimension::Coffee => "coffee",
        }
    }
}

/// A fixed taxonomy tag
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaxonomyTag {
    pub id: Uuid,
    pub slug: String,
    pub dimension: TagDimension,
    pub label: String,
}

/// A tag association on a shop with the classifier's confidence
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopTag {
    pub shop_id: Uuid,
    pub tag_id: Uuid,
    pub confidence: f64,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl TaxonomyTag {
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM taxonomy_tags ORDER BY slug")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_slug(slug: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM taxonomy_tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}

impl ShopTag {
    pub async fn find_for_shop(shop_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM shop_tags WHERE shop_id = $1")
            .bind(shop_id)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Replace a shop's tag associations wholesale.
    ///
    /// Selections whose slug is not in the taxonomy are skipped. Runs in a
    /// transaction so a failed insert leaves the previous set intact.
    pub async fn replace_for_shop(
        shop_id: Uuid,
        selections: &[TagSelection],
        pool: &PgPool,
    ) -> Result<usize> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM shop_tags WHERE shop_id = $1")
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0;
        for selection in selections {
            let result = sqlx::query(
                r#"
                INSERT INTO shop_tags (shop_id, tag_id, confidence)
                SELECT $1, id, $3 FROM taxonomy_tags WHERE slug = $2
                "#,
            )
            .bind(shop_id)
            .bind(&selection.slug)
            .bind(selection.confidence)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
