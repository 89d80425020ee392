//! Weekly newsletter: the week's newly published shops, sent to every
//! opted-in profile. One recipient's provider failure is logged and the
//! loop continues.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domains::account::models::Profile;
use crate::domains::shop::models::Shop;
use crate::kernel::jobs::{Job, JobError};
use crate::kernel::{EmailMessage, ServerKernel};

const SUBJECT: &str = "This Week's CafeRoam Picks";
const PUBLISHED_WITHIN_DAYS: i64 = 7;

pub async fn run(_job: &Job, kernel: &ServerKernel) -> Result<(), JobError> {
    let pool = &kernel.db_pool;

    let recipients = Profile::newsletter_recipients(pool)
        .await
        .context("failed to load newsletter recipients")?;
    if recipients.is_empty() {
        info!("No newsletter recipients");
        return Ok(());
    }

    let shops = Shop::find_published_since(PUBLISHED_WITHIN_DAYS, pool)
        .await
        .context("failed to load newly published shops")?;
    if shops.is_empty() {
        info!("No newly published shops this week");
        return Ok(());
    }

    let html = render_weekly_html(&shops);

    let mut sent = 0;
    let mut failed = 0;
    for to in &recipients {
        let message = EmailMessage {
            to: to.clone(),
            subject: SUBJECT.to_string(),
            html: html.clone(),
        };
        match kernel.email_service.send(&message).await {
            Ok(()) => sent += 1,
            Err(e) => {
                warn!(to = %to, error = %format!("{e:#}"), "Weekly email send failed");
                failed += 1;
            }
        }
    }

    info!(sent, failed, shops = shops.len(), "Weekly email run complete");

    Ok(())
}

fn render_weekly_html(shops: &[Shop]) -> String {
    let mut html = String::from("<h1>New cafes this week</h1><ul>");
    for shop in shops {
        let name = shop.name.as_deref().unwrap_or("(unnamed)");
        html.push_str(&format!("<li><strong>{name}</strong>"));
        if let Some(address) = &shop.address {
            html.push_str(&format!(" &middot; {address}"));
        }
        if let Some(description) = &shop.description {
            html.push_str(&format!("<br/>{description}"));
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}
