//! Embed stage: generate the search vector from name and description.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::domains::shop::models::Shop;
use crate::kernel::jobs::{priority, Job, JobError, JobType, ShopPipelinePayload};
use crate::kernel::ServerKernel;

pub async fn run(job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let payload: ShopPipelinePayload = job.deserialize_payload().map_err(JobError::permanent)?;
    let pool = &kernel.db_pool;

    let shop = Shop::find_by_id(payload.shop_id, pool)
        .await
        .context("failed to load shop")?;
    let name = shop
        .name
        .clone()
        .ok_or_else(|| JobError::permanent(anyhow!("shop {} has no name to embed", shop.id)))?;

    let text = format!("{}. {}", name, shop.description.as_deref().unwrap_or(""));
    let embedding = kernel.embedding_service.generate(&text).await?;

    Shop::update_embedding(shop.id, &embedding, pool)
        .await
        .context("failed to persist embedding")?;

    info!(shop_id = %shop.id, dimensions = embedding.len(), "Embedding stored");

    kernel
        .job_queue
        .enqueue(
            JobType::PublishShop,
            serde_json::to_value(payload.next_stage()).context("failed to serialize payload")?,
            priority::PIPELINE_STAGE,
        )
        .await?;

    Ok(())
}
