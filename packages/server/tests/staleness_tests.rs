//! Staleness sweep tests: which live entries get re-enriched and which are
//! merely stamped as checked.

mod common;

use common::*;
use test_context::test_context;
use uuid::Uuid;

use caferoam_core::domains::shop::handlers::staleness_sweep;
use caferoam_core::domains::shop::models::{Shop, ShopReview};
use caferoam_core::kernel::jobs::{Job, JobType};
use caferoam_core::kernel::{MockScraper, TestDependencies};

fn sweep_job() -> Job {
    Job::builder().job_type(JobType::StalenessSweep).build()
}

/// (count, max priority) of queued enrich jobs for a shop.
async fn enrich_jobs_for(shop_id: Uuid, pool: &sqlx::PgPool) -> (i64, i32) {
    sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(MAX(priority), 0)::INT
        FROM job_queue
        WHERE job_type = 'enrich_shop' AND payload->>'shop_id' = $1::TEXT
        "#,
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await
    .expect("count enrich jobs")
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_newer_probe_review_requeues_enrichment(ctx: &TestHarness) {
    let shop = create_live_shop("Stale Cafe", "https://maps.google.com/?cid=1", &ctx.db_pool)
        .await
        .expect("create shop");
    backdate_enrichment(shop.id, 100, &ctx.db_pool)
        .await
        .expect("backdate");
    ShopReview::insert(shop.id, &review_from_days_ago("Old take", 30), &ctx.db_pool)
        .await
        .expect("insert review");

    let deps = TestDependencies::new()
        .mock_scraper(MockScraper::new().with_reviews(vec![review_from_days_ago("Fresh take", 2)]));
    let kernel = ctx.kernel_with(deps);

    staleness_sweep::run(&sweep_job(), &kernel)
        .await
        .expect("sweep");

    let jobs = enrich_jobs_for(shop.id, &ctx.db_pool).await;
    assert_eq!(jobs, (1, 1));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_quiet_probe_only_stamps_last_checked(ctx: &TestHarness) {
    let shop = create_live_shop("Quiet Cafe", "https://maps.google.com/?cid=2", &ctx.db_pool)
        .await
        .expect("create shop");
    backdate_enrichment(shop.id, 100, &ctx.db_pool)
        .await
        .expect("backdate");
    ShopReview::insert(shop.id, &review_from_days_ago("Recent take", 2), &ctx.db_pool)
        .await
        .expect("insert review");

    // Probe returns only an older review than the one already stored
    let deps = TestDependencies::new()
        .mock_scraper(MockScraper::new().with_reviews(vec![review_from_days_ago("Old take", 30)]));
    let kernel = ctx.kernel_with(deps);

    staleness_sweep::run(&sweep_job(), &kernel)
        .await
        .expect("sweep");

    let jobs = enrich_jobs_for(shop.id, &ctx.db_pool).await;
    assert_eq!(jobs.0, 0);

    let shop = Shop::find_by_id(shop.id, &ctx.db_pool)
        .await
        .expect("reload shop");
    assert!(shop.last_checked_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_shop_without_place_id_is_always_refreshed(ctx: &TestHarness) {
    let shop = create_live_shop("Unprobed Cafe", "https://maps.google.com/?cid=3", &ctx.db_pool)
        .await
        .expect("create shop");
    backdate_enrichment(shop.id, 100, &ctx.db_pool)
        .await
        .expect("backdate");
    sqlx::query("UPDATE shops SET google_place_id = NULL WHERE id = $1")
        .bind(shop.id)
        .execute(&ctx.db_pool)
        .await
        .expect("clear place id");

    let deps = TestDependencies::new();
    let scraper = deps.scraper.clone();
    let kernel = ctx.kernel_with(deps);

    staleness_sweep::run(&sweep_job(), &kernel)
        .await
        .expect("sweep");

    let jobs = enrich_jobs_for(shop.id, &ctx.db_pool).await;
    assert_eq!(jobs, (1, 1));
    // No place id means no probe was attempted
    assert!(scraper.review_calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_failed_probe_marks_checked_and_continues(ctx: &TestHarness) {
    let shop = create_live_shop("Flaky Cafe", "https://maps.google.com/?cid=4", &ctx.db_pool)
        .await
        .expect("create shop");
    backdate_enrichment(shop.id, 100, &ctx.db_pool)
        .await
        .expect("backdate");

    let deps = TestDependencies::new().mock_scraper(MockScraper::new().with_failure());
    let kernel = ctx.kernel_with(deps);

    // The sweep itself still completes
    staleness_sweep::run(&sweep_job(), &kernel)
        .await
        .expect("sweep");

    let jobs = enrich_jobs_for(shop.id, &ctx.db_pool).await;
    assert_eq!(jobs.0, 0);

    let shop = Shop::find_by_id(shop.id, &ctx.db_pool)
        .await
        .expect("reload shop");
    assert!(shop.last_checked_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_recently_enriched_shops_are_left_alone(ctx: &TestHarness) {
    let shop = create_live_shop("Fresh Cafe", "https://maps.google.com/?cid=5", &ctx.db_pool)
        .await
        .expect("create shop");
    sqlx::query("UPDATE shops SET last_enriched_at = NOW() WHERE id = $1")
        .bind(shop.id)
        .execute(&ctx.db_pool)
        .await
        .expect("stamp enrichment");

    let deps = TestDependencies::new();
    let scraper = deps.scraper.clone();
    let kernel = ctx.kernel_with(deps);

    staleness_sweep::run(&sweep_job(), &kernel)
        .await
        .expect("sweep");

    let jobs = enrich_jobs_for(shop.id, &ctx.db_pool).await;
    assert_eq!(jobs.0, 0);
    assert!(scraper.review_calls().is_empty());
}
