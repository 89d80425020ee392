//! Enrich stage: LLM classification against the tag taxonomy.
//!
//! The destructive tag replacement happens only after the classification
//! call has succeeded, so a provider failure leaves the previous tags in
//! place for the retry.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::domains::shop::models::{Shop, ShopReview, ShopTag, TaxonomyTag};
use crate::kernel::jobs::{priority, Job, JobError, JobType, ShopPipelinePayload};
use crate::kernel::{EnrichmentRequest, ServerKernel, TaxonomyEntry};

pub async fn run(job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let payload: ShopPipelinePayload = job.deserialize_payload().map_err(JobError::permanent)?;
    let pool = &kernel.db_pool;

    let shop = Shop::find_by_id(payload.shop_id, pool)
        .await
        .context("failed to load shop")?;
    let name = shop
        .name
        .clone()
        .ok_or_else(|| JobError::permanent(anyhow!("shop {} has no name to enrich", shop.id)))?;

    let reviews = ShopReview::find_for_shop(shop.id, pool)
        .await
        .context("failed to load reviews")?;
    let taxonomy = TaxonomyTag::find_all(pool)
        .await
        .context("failed to load taxonomy")?;

    let request = EnrichmentRequest {
        name,
        address: shop.address.clone(),
        review_texts: reviews.into_iter().map(|r| r.text).collect(),
        taxonomy: taxonomy
            .into_iter()
            .map(|t| TaxonomyEntry {
                slug: t.slug,
                dimension: t.dimension.as_str().to_string(),
                label: t.label,
            })
            .collect(),
    };

    let result = kernel.llm.classify_shop(&request).await?;

    let applied = ShopTag::replace_for_shop(shop.id, &result.tags, pool)
        .await
        .context("failed to replace shop tags")?;

    let mode_scores =
        serde_json::to_value(result.mode_scores).context("failed to serialize mode scores")?;
    Shop::apply_enrichment(shop.id, &result.summary, &mode_scores, result.confidence, pool)
        .await
        .context("failed to persist enrichment")?;

    info!(
        shop_id = %shop.id,
        tags_applied = applied,
        confidence = result.confidence,
        "Enrichment complete"
    );

    kernel
        .job_queue
        .enqueue(
            JobType::GenerateEmbedding,
            serde_json::to_value(payload.next_stage()).context("failed to serialize payload")?,
            priority::PIPELINE_STAGE,
        )
        .await?;

    Ok(())
}
