//! Email job tests: the weekly newsletter and the daily admin digest,
//! asserted through the mock provider's outbox.

mod common;

use common::*;
use serde_json::json;
use test_context::test_context;

use caferoam_core::domains::email::{admin_digest, weekly_email};
use caferoam_core::kernel::jobs::{Job, JobQueue, JobType, PostgresJobQueue};
use caferoam_core::kernel::{MockEmailService, TestDependencies};

fn email_job(job_type: JobType) -> Job {
    Job::builder().job_type(job_type).build()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_weekly_email_with_no_recipients_sends_nothing(ctx: &TestHarness) {
    create_live_shop("Fresh Cafe", "https://maps.google.com/?cid=1", &ctx.db_pool)
        .await
        .expect("create shop");

    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    weekly_email::run(&email_job(JobType::WeeklyEmail), &kernel)
        .await
        .expect("run weekly email");

    assert_eq!(email.sent_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_weekly_email_with_no_new_shops_sends_nothing(ctx: &TestHarness) {
    create_opted_in_profile("reader@example.org", &ctx.db_pool)
        .await
        .expect("create profile");

    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    weekly_email::run(&email_job(JobType::WeeklyEmail), &kernel)
        .await
        .expect("run weekly email");

    assert_eq!(email.sent_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_weekly_email_reaches_opted_in_readers(ctx: &TestHarness) {
    create_opted_in_profile("reader@example.org", &ctx.db_pool)
        .await
        .expect("create profile");
    create_live_shop("Fresh Cafe", "https://maps.google.com/?cid=1", &ctx.db_pool)
        .await
        .expect("create shop");

    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    weekly_email::run(&email_job(JobType::WeeklyEmail), &kernel)
        .await
        .expect("run weekly email");

    assert!(email.was_sent_to("reader@example.org"));
    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "This Week's CafeRoam Picks");
    assert!(sent[0].html.contains("Fresh Cafe"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_one_failed_send_does_not_stop_the_run(ctx: &TestHarness) {
    create_opted_in_profile("first@example.org", &ctx.db_pool)
        .await
        .expect("create first profile");
    create_opted_in_profile("second@example.org", &ctx.db_pool)
        .await
        .expect("create second profile");
    create_live_shop("Fresh Cafe", "https://maps.google.com/?cid=1", &ctx.db_pool)
        .await
        .expect("create shop");

    let deps = TestDependencies::new().mock_email(MockEmailService::new().with_failure());
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    // The first send fails; the run still completes and reaches the other
    weekly_email::run(&email_job(JobType::WeeklyEmail), &kernel)
        .await
        .expect("run weekly email");

    assert_eq!(email.sent_count(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_weekly_email_skips_old_publications(ctx: &TestHarness) {
    create_opted_in_profile("reader@example.org", &ctx.db_pool)
        .await
        .expect("create profile");
    let shop = create_live_shop("Old Cafe", "https://maps.google.com/?cid=1", &ctx.db_pool)
        .await
        .expect("create shop");
    backdate_published(shop.id, 30, &ctx.db_pool)
        .await
        .expect("backdate");

    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    weekly_email::run(&email_job(JobType::WeeklyEmail), &kernel)
        .await
        .expect("run weekly email");

    assert_eq!(email.sent_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_admin_digest_is_sent_even_when_idle(ctx: &TestHarness) {
    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    admin_digest::run(&email_job(JobType::AdminDigestEmail), &kernel)
        .await
        .expect("run digest");

    assert!(email.was_sent_to("admin@example.org"));
    let sent = email.sent();
    assert_eq!(sent[0].subject, "CafeRoam Daily Digest");
    assert!(sent[0].html.contains("queue is empty"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn test_admin_digest_surfaces_dead_jobs(ctx: &TestHarness) {
    let queue = PostgresJobQueue::new(ctx.db_pool.clone());
    let job_id = queue
        .enqueue(JobType::ScrapeShop, json!({"shop_id": uuid::Uuid::new_v4()}), 2)
        .await
        .expect("enqueue");
    queue.claim(None).await.expect("claim").expect("job claimed");
    queue
        .fail_permanently(job_id, "provider rejected the listing")
        .await
        .expect("fail job");

    let deps = TestDependencies::new();
    let email = deps.email_service.clone();
    let kernel = ctx.kernel_with(deps);

    admin_digest::run(&email_job(JobType::AdminDigestEmail), &kernel)
        .await
        .expect("run digest");

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains("scrape_shop"));
    assert!(sent[0].html.contains("provider rejected the listing"));
    assert!(sent[0].html.contains("failed: 1"));
}
