//! Publish stage: the pipeline's terminal step.
//!
//! Flips the entry live, announces user-submitted shops on the activity
//! feed, and closes out the originating submission.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing::info;

use crate::domains::shop::models::{ActivityEvent, Shop, ShopSubmission};
use crate::kernel::jobs::{Job, JobError, ShopPipelinePayload};
use crate::kernel::ServerKernel;

pub async fn run(job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let payload: ShopPipelinePayload = job.deserialize_payload().map_err(JobError::permanent)?;
    let pool = &kernel.db_pool;

    let shop = Shop::find_by_id(payload.shop_id, pool)
        .await
        .context("failed to load shop")?;
    if shop.embedding.is_none() {
        return Err(JobError::permanent(anyhow!(
            "shop {} has no embedding to publish",
            shop.id
        )));
    }

    let shop = Shop::publish(shop.id, pool)
        .await
        .context("failed to publish shop")?;

    if let Some(user_id) = payload.submitted_by {
        let metadata = json!({
            "shop_id": shop.id,
            "shop_name": shop.name,
        });
        ActivityEvent::insert(Some(user_id), "shop_added", &metadata, pool)
            .await
            .context("failed to insert activity event")?;
    }

    if let Some(submission_id) = payload.submission_id {
        ShopSubmission::mark_live(submission_id, pool)
            .await
            .context("failed to mark submission live")?;
    }

    info!(shop_id = %shop.id, "Shop published");

    Ok(())
}
