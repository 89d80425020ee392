//! Staleness sweep: re-enrich live entries whose data has gone cold.
//!
//! A cheap reviews-only probe decides whether a full re-enrichment is
//! worth the cost. Probe failures mark the entry checked and move on; the
//! sweep job itself always completes.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::domains::shop::models::{Shop, ShopReview};
use crate::kernel::jobs::{priority, Job, JobError, JobType};
use crate::kernel::ServerKernel;

const STALE_AFTER_DAYS: i64 = 90;
const BATCH_SIZE: i64 = 100;

pub async fn run(_job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let pool = &kernel.db_pool;

    let stale = Shop::find_stale(STALE_AFTER_DAYS, BATCH_SIZE, pool)
        .await
        .context("failed to load stale shops")?;

    if stale.is_empty() {
        info!("No stale shops");
        return Ok(());
    }

    info!(count = stale.len(), "Sweeping stale shops");

    let mut requeued = 0;
    let mut skipped = 0;

    for shop in stale {
        match needs_refresh(&shop, kernel).await {
            Ok(true) => {
                kernel
                    .job_queue
                    .enqueue(
                        JobType::EnrichShop,
                        json!({ "shop_id": shop.id }),
                        priority::STALENESS_REFRESH,
                    )
                    .await?;
                requeued += 1;
            }
            Ok(false) => {
                Shop::touch_last_checked(shop.id, pool)
                    .await
                    .context("failed to stamp last_checked_at")?;
                skipped += 1;
            }
            Err(e) => {
                // Inconclusive probe: checked, but not refreshed.
                warn!(shop_id = %shop.id, error = %format!("{e:#}"), "Staleness probe failed");
                Shop::touch_last_checked(shop.id, pool)
                    .await
                    .context("failed to stamp last_checked_at")?;
                skipped += 1;
            }
        }
    }

    info!(requeued, skipped, "Staleness sweep complete");

    Ok(())
}

/// Whether a stale entry is worth a full re-enrichment.
///
/// Entries without a place id cannot be probed cheaply and are always
/// refreshed. Otherwise a reviews-only probe runs and the newest probe
/// review date is compared against the newest stored one; strictly newer
/// wins a refresh.
async fn needs_refresh(shop: &Shop, kernel: &ServerKernel) -> Result<bool> {
    let Some(place_id) = shop.google_place_id.as_deref() else {
        return Ok(true);
    };

    let probe = kernel
        .scraper
        .scrape_reviews(place_id)
        .await
        .context("reviews probe failed")?;

    let probe_newest = probe.iter().filter_map(|r| r.published_at).max();
    let stored_newest = ShopReview::newest_published_at(shop.id, &kernel.db_pool)
        .await
        .context("failed to load newest stored review date")?;

    Ok(match (probe_newest, stored_newest) {
        (Some(probe), Some(stored)) => probe > stored,
        (Some(_), None) => true,
        (None, _) => false,
    })
}
