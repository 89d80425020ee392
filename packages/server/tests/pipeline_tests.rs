//! End-to-end pipeline tests: submission through scrape, enrich, embed and
//! publish, driven by the real queue and a ticking worker.

mod common;

use common::*;
use serde_json::json;
use test_context::test_context;

use caferoam_core::domains::account::models::Profile;
use caferoam_core::domains::shop::intake::{self, IntakeError};
use caferoam_core::domains::shop::models::{
    ActivityEvent, Shop, ShopProcessingStatus, ShopReview, ShopSubmission, ShopTag,
    SubmissionStatus,
};
use caferoam_core::kernel::jobs::{Job, JobQueue, JobStatus, JobType, PostgresJobQueue};
use caferoam_core::kernel::{
    MenuItem, MockLlm, MockScraper, ScrapedListing, ScrapedReview, TagSelection, TestDependencies,
};

const MAPS_URL: &str = "https://maps.google.com/?cid=42";

#[test_context(TestHarness)]
#[tokio::test]
async fn test_submission_runs_the_full_pipeline(ctx: &TestHarness) {
    let kernel = ctx.kernel();
    let submitter = Profile::create(Some("ana@example.org"), Some("Ana"), &ctx.db_pool)
        .await
        .expect("create profile");

    let submission = intake::submit_shop(MAPS_URL, Some(submitter.id), &kernel)
        .await
        .expect("submit shop");
    assert_eq!(submission.status, SubmissionStatus::Pending);

    ctx.drain_queue(&kernel).await;

    let shop = Shop::find_by_url(MAPS_URL, &ctx.db_pool)
        .await
        .expect("find shop")
        .expect("shop exists");
    assert_eq!(shop.processing_status, ShopProcessingStatus::Live);
    assert_eq!(shop.name.as_deref(), Some("Mock Cafe"));
    assert_eq!(shop.description.as_deref(), Some("A mock cafe."));
    assert!(shop.embedding.is_some());
    assert!(shop.published_at.is_some());

    let submission = ShopSubmission::find_by_id(submission.id, &ctx.db_pool)
        .await
        .expect("reload submission");
    assert_eq!(submission.status, SubmissionStatus::Live);
    assert_eq!(submission.shop_id, Some(shop.id));

    let events = ActivityEvent::find_by_type("shop_added", &ctx.db_pool)
        .await
        .expect("load feed");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, Some(submitter.id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_place_not_found_fails_shop_and_submission(ctx: &TestHarness) {
    let deps = TestDependencies::new().mock_scraper(MockScraper::new().with_not_found());
    let kernel = ctx.kernel_with(deps);

    let submission = intake::submit_shop(MAPS_URL, None, &kernel)
        .await
        .expect("submit shop");

    ctx.drain_queue(&kernel).await;

    let shop = Shop::find_by_url(MAPS_URL, &ctx.db_pool)
        .await
        .expect("find shop")
        .expect("shop exists");
    assert_eq!(shop.processing_status, ShopProcessingStatus::Failed);

    let submission = ShopSubmission::find_by_id(submission.id, &ctx.db_pool)
        .await
        .expect("reload submission");
    assert_eq!(submission.status, SubmissionStatus::Failed);
    assert_eq!(
        submission.failure_reason.as_deref(),
        Some("Place not found on Google Maps")
    );

    // Not found is not retryable, so the job burns no further attempts
    let (status, attempts): (JobStatus, i32) =
        sqlx::query_as("SELECT status, attempts FROM job_queue WHERE job_type = 'scrape_shop'")
            .fetch_one(&ctx.db_pool)
            .await
            .expect("load scrape job");
    assert_eq!(status, JobStatus::Failed);
    assert_eq!(attempts, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_transient_enrichment_failure_backs_off_for_retry(ctx: &TestHarness) {
    let deps = TestDependencies::new().mock_llm(MockLlm::new().with_failure());
    let kernel = ctx.kernel_with(deps);

    intake::submit_shop(MAPS_URL, None, &kernel)
        .await
        .expect("submit shop");

    ctx.drain_queue(&kernel).await;

    // The drain stops at the backed-off enrich job
    let job: Job = {
        let queue = PostgresJobQueue::new(ctx.db_pool.clone());
        let (id,): (uuid::Uuid,) =
            sqlx::query_as("SELECT id FROM job_queue WHERE job_type = 'enrich_shop'")
                .fetch_one(&ctx.db_pool)
                .await
                .expect("load enrich job");
        queue.find_by_id(id).await.expect("find job")
    };
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);
    assert!(job.scheduled_at > chrono::Utc::now());
    assert!(job.last_error.is_some());

    // Collapse the backoff and the pipeline completes on retry
    collapse_backoff(job.id, &ctx.db_pool)
        .await
        .expect("collapse backoff");
    ctx.drain_queue(&kernel).await;

    let shop = Shop::find_by_url(MAPS_URL, &ctx.db_pool)
        .await
        .expect("find shop")
        .expect("shop exists");
    assert_eq!(shop.processing_status, ShopProcessingStatus::Live);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_enrichment_replaces_tags_wholesale(ctx: &TestHarness) {
    let shop = create_live_shop("Tag Cafe", MAPS_URL, &ctx.db_pool)
        .await
        .expect("create shop");

    let first = vec![
        TagSelection {
            slug: "wifi".to_string(),
            confidence: 0.9,
        },
        TagSelection {
            slug: "power-outlets".to_string(),
            confidence: 0.8,
        },
    ];
    let applied = ShopTag::replace_for_shop(shop.id, &first, &ctx.db_pool)
        .await
        .expect("first replace");
    assert_eq!(applied, 2);

    let second = vec![TagSelection {
        slug: "quiet".to_string(),
        confidence: 0.7,
    }];
    let applied = ShopTag::replace_for_shop(shop.id, &second, &ctx.db_pool)
        .await
        .expect("second replace");
    assert_eq!(applied, 1);

    let tags = ShopTag::find_for_shop(shop.id, &ctx.db_pool)
        .await
        .expect("load tags");
    assert_eq!(tags.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_unknown_tag_slugs_are_skipped(ctx: &TestHarness) {
    let shop = create_live_shop("Slug Cafe", MAPS_URL, &ctx.db_pool)
        .await
        .expect("create shop");

    let selections = vec![
        TagSelection {
            slug: "wifi".to_string(),
            confidence: 0.9,
        },
        TagSelection {
            slug: "no-such-tag".to_string(),
            confidence: 0.9,
        },
    ];
    let applied = ShopTag::replace_for_shop(shop.id, &selections, &ctx.db_pool)
        .await
        .expect("replace tags");
    assert_eq!(applied, 1);

    let tags = ShopTag::find_for_shop(shop.id, &ctx.db_pool)
        .await
        .expect("load tags");
    assert_eq!(tags.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_unreadable_menu_photo_writes_nothing(ctx: &TestHarness) {
    let kernel = ctx.kernel();
    let shop = create_live_shop("Menu Cafe", MAPS_URL, &ctx.db_pool)
        .await
        .expect("create shop");

    // Default mock extraction returns no items
    intake::upload_menu_photo(shop.id, None, "https://img.example.org/menu.jpg", &kernel)
        .await
        .expect("upload photo");
    ctx.drain_queue(&kernel).await;

    let shop = Shop::find_by_id(shop.id, &ctx.db_pool)
        .await
        .expect("reload shop");
    assert!(shop.menu_items.is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_menu_photo_extraction_writes_items(ctx: &TestHarness) {
    let items = vec![
        MenuItem {
            name: "Flat White".to_string(),
            price: Some("NT$150".to_string()),
            category: Some("Coffee".to_string()),
        },
        MenuItem {
            name: "Basque Cheesecake".to_string(),
            price: None,
            category: None,
        },
    ];
    let deps = TestDependencies::new().mock_llm(MockLlm::new().with_menu_items(items));
    let kernel = ctx.kernel_with(deps);

    let shop = create_live_shop("Menu Cafe", MAPS_URL, &ctx.db_pool)
        .await
        .expect("create shop");
    let photo = intake::upload_menu_photo(shop.id, None, "https://img.example.org/menu.jpg", &kernel)
        .await
        .expect("upload photo");
    assert_eq!(photo.shop_id, shop.id);

    ctx.drain_queue(&kernel).await;

    let shop = Shop::find_by_id(shop.id, &ctx.db_pool)
        .await
        .expect("reload shop");
    let stored = shop.menu_items.expect("menu items written");
    let stored = stored.as_array().expect("array");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["name"], "Flat White");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_duplicate_submission_is_rejected(ctx: &TestHarness) {
    let kernel = ctx.kernel();
    intake::submit_shop(MAPS_URL, None, &kernel)
        .await
        .expect("first submission");

    let err = intake::submit_shop(MAPS_URL, None, &kernel)
        .await
        .expect_err("duplicate should fail");
    assert!(matches!(err, IntakeError::DuplicateShop(_)));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_non_maps_url_is_rejected(ctx: &TestHarness) {
    let kernel = ctx.kernel();
    let err = intake::submit_shop("https://example.com/cafe", None, &kernel)
        .await
        .expect_err("should fail");
    assert!(matches!(err, IntakeError::InvalidUrl(_)));

    assert!(Shop::find_by_url("https://example.com/cafe", &ctx.db_pool)
        .await
        .expect("find shop")
        .is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_admin_rejection_before_scrape_cleans_up(ctx: &TestHarness) {
    let kernel = ctx.kernel();
    let submission = intake::submit_shop(MAPS_URL, None, &kernel)
        .await
        .expect("submit shop");

    // Reject before any worker tick: the submission has no shop link yet
    intake::reject_submission_with_url_fallback(submission.id, &kernel)
        .await
        .expect("reject submission");

    assert!(Shop::find_by_url(MAPS_URL, &ctx.db_pool)
        .await
        .expect("find shop")
        .is_none());

    let submission = ShopSubmission::find_by_id(submission.id, &ctx.db_pool)
        .await
        .expect("reload submission");
    assert_eq!(submission.status, SubmissionStatus::Failed);
    assert_eq!(submission.failure_reason.as_deref(), Some("Rejected by admin"));

    // The pending scrape job was cancelled, so a drain does nothing
    ctx.drain_queue(&kernel).await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_queue")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count jobs");
    assert_eq!(count, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_failed_review_replacement_restores_previous_set(ctx: &TestHarness) {
    let shop = create_live_shop("Compensated Cafe", MAPS_URL, &ctx.db_pool)
        .await
        .expect("create shop");
    ShopReview::insert(shop.id, &review_from_days_ago("Lovely pour over", 10), &ctx.db_pool)
        .await
        .expect("insert review");

    // Rating 6 violates the table's range check mid-replacement
    let listing = ScrapedListing {
        reviews: vec![
            review_from_days_ago("Great beans", 2),
            ScrapedReview {
                text: "Out of range".to_string(),
                rating: 6,
                published_at: None,
            },
        ],
        ..sample_listing("Compensated Cafe")
    };
    let deps = TestDependencies::new().mock_scraper(MockScraper::new().with_listing(listing));
    let kernel = ctx.kernel_with(deps);

    let job = Job::builder()
        .job_type(JobType::ScrapeShop)
        .payload(json!({ "shop_id": shop.id, "google_maps_url": MAPS_URL }))
        .build();
    let result = caferoam_core::domains::shop::handlers::scrape_shop::run(&job, &kernel).await;
    assert!(result.is_err());

    let reviews = ShopReview::find_for_shop(shop.id, &ctx.db_pool)
        .await
        .expect("load reviews");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].text, "Lovely pour over");
}
