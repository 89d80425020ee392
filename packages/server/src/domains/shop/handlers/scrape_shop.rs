//! Scrape stage: fetch listing data by Google Maps URL and persist it.
//!
//! A scrape miss ("place not found") is a permanent failure: retrying will
//! not make the place exist. Review replacement is compensated so a failed
//! insert leaves the previously stored set intact.

use anyhow::{anyhow, Context, Result};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::domains::shop::models::{Shop, ShopPhoto, ShopProcessingStatus, ShopReview, ShopSubmission};
use crate::kernel::jobs::{priority, Job, JobError, JobType, ShopPipelinePayload};
use crate::kernel::{ScrapedReview, ServerKernel};

pub async fn run(job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let payload: ShopPipelinePayload = job.deserialize_payload().map_err(JobError::permanent)?;
    let url = payload
        .google_maps_url
        .clone()
        .ok_or_else(|| JobError::permanent(anyhow!("scrape payload has no google_maps_url")))?;
    let pool = &kernel.db_pool;

    Shop::set_status(payload.shop_id, ShopProcessingStatus::Scraping, pool)
        .await
        .context("failed to mark shop scraping")?;

    let listing = kernel.scraper.scrape_by_url(&url).await?;

    let Some(listing) = listing else {
        Shop::set_status(payload.shop_id, ShopProcessingStatus::Failed, pool)
            .await
            .context("failed to mark shop failed")?;
        if let Some(submission_id) = payload.submission_id {
            ShopSubmission::mark_failed(submission_id, "Place not found on Google Maps", pool)
                .await
                .context("failed to mark submission failed")?;
        }
        return Err(JobError::permanent(anyhow!(
            "place not found on Google Maps: {url}"
        )));
    };

    Shop::apply_scrape(payload.shop_id, &listing, pool)
        .await
        .context("failed to persist scrape data")?;

    replace_reviews(payload.shop_id, &listing.reviews, pool).await?;
    replace_photos(payload.shop_id, &listing.photo_urls, pool).await?;

    if let Some(submission_id) = payload.submission_id {
        ShopSubmission::mark_processing(submission_id, payload.shop_id, pool)
            .await
            .context("failed to mark submission processing")?;
    }

    info!(
        shop_id = %payload.shop_id,
        review_count = listing.reviews.len(),
        photo_count = listing.photo_urls.len(),
        "Scrape complete"
    );

    kernel
        .job_queue
        .enqueue(
            JobType::EnrichShop,
            serde_json::to_value(payload.next_stage()).context("failed to serialize payload")?,
            priority::PIPELINE_STAGE,
        )
        .await?;

    Ok(())
}

/// Replace a shop's stored reviews with a freshly scraped set.
///
/// If any insert of the new set fails, the previous set is re-inserted
/// before the error is re-raised.
async fn replace_reviews(
    shop_id: Uuid,
    reviews: &[ScrapedReview],
    pool: &PgPool,
) -> Result<(), JobError> {
    let old = ShopReview::find_for_shop(shop_id, pool)
        .await
        .context("failed to load existing reviews")?;

    ShopReview::delete_for_shop(shop_id, pool)
        .await
        .context("failed to delete existing reviews")?;

    for review in reviews {
        if let Err(insert_err) = ShopReview::insert(shop_id, review, pool).await {
            ShopReview::delete_for_shop(shop_id, pool)
                .await
                .context("failed to clear partial review set during compensation")?;
            for previous in &old {
                let restored = ScrapedReview {
                    text: previous.text.clone(),
                    rating: previous.rating,
                    published_at: previous.published_at,
                };
                ShopReview::insert(shop_id, &restored, pool)
                    .await
                    .context("failed to restore previous reviews during compensation")?;
            }
            return Err(insert_err
                .context("failed to insert scraped review, previous set restored")
                .into());
        }
    }

    Ok(())
}

async fn replace_photos(shop_id: Uuid, urls: &[String], pool: &PgPool) -> Result<(), JobError> {
    ShopPhoto::delete_for_shop(shop_id, pool)
        .await
        .context("failed to delete existing photos")?;
    for url in urls {
        ShopPhoto::insert(shop_id, url, pool)
            .await
            .context("failed to insert scraped photo")?;
    }
    Ok(())
}
