//! Menu photo stage: vision extraction of menu items from an uploaded photo.
//!
//! An unreadable or non-menu image yields no items; in that case nothing is
//! written, so a previously extracted menu is never clobbered by a bad photo.

use anyhow::{Context, Result};
use tracing::info;

use crate::domains::shop::models::Shop;
use crate::kernel::jobs::{Job, JobError, MenuPhotoPayload};
use crate::kernel::ServerKernel;

pub async fn run(job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let payload: MenuPhotoPayload = job.deserialize_payload().map_err(JobError::permanent)?;

    let items = kernel.llm.extract_menu(&payload.image_url).await?;

    if items.is_empty() {
        info!(shop_id = %payload.shop_id, "No menu items extracted, skipping write");
        return Ok(());
    }

    let value = serde_json::to_value(&items).context("failed to serialize menu items")?;
    Shop::update_menu_items(payload.shop_id, &value, &kernel.db_pool)
        .await
        .context("failed to persist menu items")?;

    info!(shop_id = %payload.shop_id, item_count = items.len(), "Menu extracted");

    Ok(())
}
