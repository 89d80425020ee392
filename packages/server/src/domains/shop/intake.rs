//! Intake and admin operations.
//!
//! These are the triggers that feed the pipeline: user submissions start a
//! scrape chain, menu photo uploads start a vision extraction, and admins
//! can reject a submission mid-flight.

use anyhow::{Context, Result};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::models::{MenuPhoto, Shop, ShopSubmission};
use crate::kernel::jobs::{priority, JobType, MenuPhotoPayload, ShopPipelinePayload};
use crate::kernel::ServerKernel;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("not a Google Maps URL: {0}")]
    InvalidUrl(String),

    #[error("shop already exists for {0}")]
    DuplicateShop(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Whether a URL points at a Google Maps listing
fn is_google_maps_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) if host == "maps.google.com" || host.ends_with(".maps.google.com") => true,
        Some(host) if host == "google.com" || host.ends_with(".google.com") => {
            parsed.path().starts_with("/maps")
        }
        _ => false,
    }
}

/// Accept a user's shop submission and start the pipeline.
///
/// Creates a pending shop and submission pair and enqueues the scrape stage
/// with the correlation fields the later stages forward along.
pub async fn submit_shop(
    google_maps_url: &str,
    submitted_by: Option<Uuid>,
    kernel: &ServerKernel,
) -> Result<ShopSubmission, IntakeError> {
    if !is_google_maps_url(google_maps_url) {
        return Err(IntakeError::InvalidUrl(google_maps_url.to_string()));
    }

    let pool = &kernel.db_pool;
    if Shop::find_by_url(google_maps_url, pool)
        .await
        .context("failed to check for existing shop")?
        .is_some()
    {
        return Err(IntakeError::DuplicateShop(google_maps_url.to_string()));
    }

    let shop = Shop::create_pending(google_maps_url, pool)
        .await
        .context("failed to create shop")?;
    let submission = ShopSubmission::create(google_maps_url, submitted_by, pool)
        .await
        .context("failed to create submission")?;

    let payload = ShopPipelinePayload {
        shop_id: shop.id,
        google_maps_url: Some(google_maps_url.to_string()),
        submission_id: Some(submission.id),
        submitted_by,
    };
    let job_id = kernel
        .job_queue
        .enqueue(
            JobType::ScrapeShop,
            serde_json::to_value(&payload).context("failed to serialize payload")?,
            priority::INTAKE_SCRAPE,
        )
        .await?;

    info!(
        shop_id = %shop.id,
        submission_id = %submission.id,
        %job_id,
        "Submission accepted"
    );

    Ok(submission)
}

/// Record an uploaded menu photo and queue its extraction
pub async fn upload_menu_photo(
    shop_id: Uuid,
    uploaded_by: Option<Uuid>,
    image_url: &str,
    kernel: &ServerKernel,
) -> Result<MenuPhoto> {
    let photo = MenuPhoto::insert(shop_id, uploaded_by, image_url, &kernel.db_pool)
        .await
        .context("failed to record menu photo")?;

    let payload = MenuPhotoPayload {
        shop_id,
        image_url: image_url.to_string(),
    };
    kernel
        .job_queue
        .enqueue(
            JobType::EnrichMenuPhoto,
            serde_json::to_value(&payload).context("failed to serialize payload")?,
            priority::PIPELINE_STAGE,
        )
        .await?;

    Ok(photo)
}

/// Admin rejection: fail the submission, cancel its in-flight jobs, and
/// drop the shop row.
pub async fn reject_submission(submission_id: Uuid, kernel: &ServerKernel) -> Result<()> {
    let pool = &kernel.db_pool;

    let submission = ShopSubmission::mark_failed(submission_id, "Rejected by admin", pool)
        .await
        .context("failed to mark submission rejected")?;

    if let Some(shop_id) = submission.shop_id {
        let cancelled = kernel.job_queue.cancel_for_shop(shop_id).await?;
        Shop::delete(shop_id, pool)
            .await
            .context("failed to delete rejected shop")?;
        info!(%submission_id, %shop_id, cancelled, "Submission rejected, shop removed");
    } else {
        info!(%submission_id, "Submission rejected before a shop was linked");
    }

    Ok(())
}

/// Rejection needs the shop link that scraping establishes; until then the
/// submission row alone carries the request. Look the shop up by URL so a
/// pre-scrape rejection still cleans up.
pub async fn reject_submission_with_url_fallback(
    submission_id: Uuid,
    kernel: &ServerKernel,
) -> Result<()> {
    let pool = &kernel.db_pool;
    let submission = ShopSubmission::find_by_id(submission_id, pool)
        .await
        .context("failed to load submission")?;

    if submission.shop_id.is_none() {
        if let Some(shop) = Shop::find_by_url(&submission.google_maps_url, pool)
            .await
            .context("failed to find shop by url")?
        {
            let cancelled = kernel.job_queue.cancel_for_shop(shop.id).await?;
            Shop::delete(shop.id, pool)
                .await
                .context("failed to delete rejected shop")?;
            info!(%submission_id, shop_id = %shop.id, cancelled, "Unlinked shop removed");
        }
        ShopSubmission::mark_failed(submission_id, "Rejected by admin", pool)
            .await
            .context("failed to mark submission rejected")?;
        return Ok(());
    }

    reject_submission(submission_id, kernel).await
}
