//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data;
//! backdating helpers adjust timestamps that no production code path sets
//! into the past.

use anyhow::Result;
use caferoam_core::domains::account::models::Profile;
use caferoam_core::domains::shop::models::Shop;
use caferoam_core::kernel::{ScrapedListing, ScrapedReview};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// A plausible scraped listing for the given shop name.
pub fn sample_listing(name: &str) -> ScrapedListing {
    ScrapedListing {
        name: name.to_string(),
        address: Some("100 Coffee Rd, Taipei".to_string()),
        latitude: Some(25.033),
        longitude: Some(121.565),
        google_place_id: Some(format!("place-{}", name.replace(' ', "-").to_lowercase())),
        rating: Some(4.5),
        review_count: Some(12),
        phone: Some("+886 2 1234 5678".to_string()),
        website: Some("https://example.org".to_string()),
        ..Default::default()
    }
}

/// A scraped review published the given number of days ago.
pub fn review_from_days_ago(text: &str, days: i64) -> ScrapedReview {
    ScrapedReview {
        text: text.to_string(),
        rating: 5,
        published_at: Some(Utc::now() - Duration::days(days)),
    }
}

/// Walk a shop through scrape, embed and publish using the model methods.
pub async fn create_live_shop(name: &str, url: &str, pool: &PgPool) -> Result<Shop> {
    let shop = Shop::create_pending(url, pool).await?;
    Shop::apply_scrape(shop.id, &sample_listing(name), pool).await?;
    Shop::update_embedding(shop.id, &vec![0.1; 1536], pool).await?;
    let shop = Shop::publish(shop.id, pool).await?;
    Ok(shop)
}

/// Create a profile that receives the weekly newsletter.
pub async fn create_opted_in_profile(email: &str, pool: &PgPool) -> Result<Profile> {
    let profile = Profile::create(Some(email), Some("Test User"), pool).await?;
    sqlx::query("UPDATE profiles SET email_opted_in = TRUE WHERE id = $1")
        .bind(profile.id)
        .execute(pool)
        .await?;
    Profile::find_by_id(profile.id, pool).await
}

/// Push a shop's enrichment timestamp into the past.
pub async fn backdate_enrichment(shop_id: Uuid, days: i64, pool: &PgPool) -> Result<()> {
    sqlx::query("UPDATE shops SET last_enriched_at = NOW() - ($2 || ' days')::INTERVAL WHERE id = $1")
        .bind(shop_id)
        .bind(days.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Push a shop's publication timestamp into the past.
pub async fn backdate_published(shop_id: Uuid, days: i64, pool: &PgPool) -> Result<()> {
    sqlx::query("UPDATE shops SET published_at = NOW() - ($2 || ' days')::INTERVAL WHERE id = $1")
        .bind(shop_id)
        .bind(days.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Push a profile's deletion request into the past.
pub async fn backdate_deletion_request(user_id: Uuid, days: i64, pool: &PgPool) -> Result<()> {
    sqlx::query(
        "UPDATE profiles SET deletion_requested_at = NOW() - ($2 || ' days')::INTERVAL WHERE id = $1",
    )
    .bind(user_id)
    .bind(days.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Age a claimed job's claim stamp, as if its worker crashed.
pub async fn backdate_claim(job_id: Uuid, minutes: i64, pool: &PgPool) -> Result<()> {
    sqlx::query(
        "UPDATE job_queue SET claimed_at = NOW() - ($2 || ' minutes')::INTERVAL WHERE id = $1",
    )
    .bind(job_id)
    .bind(minutes.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Make a pending job claimable right now, collapsing its backoff.
pub async fn collapse_backoff(job_id: Uuid, pool: &PgPool) -> Result<()> {
    sqlx::query("UPDATE job_queue SET scheduled_at = NOW() WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}
