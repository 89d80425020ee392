//! Daily operator digest: queue health at a glance.
//!
//! Always sent, even when every count is zero, so a silent queue and a
//! broken scheduler are distinguishable from the inbox.

use anyhow::{Context, Result};
use tracing::info;

use crate::domains::shop::models::ShopSubmission;
use crate::kernel::jobs::{Job, JobError, StatusCount};
use crate::kernel::{EmailMessage, ServerKernel};

const SUBJECT: &str = "CafeRoam Daily Digest";
const DEAD_JOB_LIMIT: i64 = 50;

pub async fn run(_job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let counts = kernel.job_queue.counts_by_status().await?;
    let dead = kernel.job_queue.list_dead_jobs(DEAD_JOB_LIMIT).await?;
    let pending_submissions = ShopSubmission::count_pending(&kernel.db_pool)
        .await
        .context("failed to count pending submissions")?;

    let message = EmailMessage {
        to: kernel.admin_email.clone(),
        subject: SUBJECT.to_string(),
        html: render_digest_html(&counts, &dead, pending_submissions),
    };
    kernel
        .email_service
        .send(&message)
        .await
        .context("failed to send admin digest")?;

    info!(
        to = %kernel.admin_email,
        dead_jobs = dead.len(),
        pending_submissions,
        "Admin digest sent"
    );

    Ok(())
}

fn render_digest_html(counts: &[StatusCount], dead: &[Job], pending_submissions: i64) -> String {
    let mut html = String::from("<h1>Queue digest</h1><h2>Jobs by status</h2><ul>");
    if counts.is_empty() {
        html.push_str("<li>queue is empty</li>");
    }
    for row in counts {
        html.push_str(&format!("<li>{}: {}</li>", row.status.as_str(), row.count));
    }
    html.push_str("</ul><h2>Failed and dead-letter jobs</h2>");
    if dead.is_empty() {
        html.push_str("<p>None</p>");
    } else {
        html.push_str("<ul>");
        for job in dead {
            let error = job.last_error.as_deref().unwrap_or("(no error recorded)");
            html.push_str(&format!("<li>{} ({}): {}</li>", job.job_type, job.id, error));
        }
        html.push_str("</ul>");
    }
    html.push_str(&format!(
        "<h2>Pending submissions</h2><p>{pending_submissions}</p>"
    ));
    html
}
