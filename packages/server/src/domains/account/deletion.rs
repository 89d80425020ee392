//! Account-deletion sweep.
//!
//! Runs daily from the scheduler. A profile becomes eligible once its
//! deletion request is older than the 30-day grace window. For each eligible
//! user the sweep removes every binary asset attributed to them, and only
//! then hard-deletes the account row so FK cascades can clear the rest.
//! A storage error or an unparseable URL aborts that user's deletion before
//! the row is touched; the sweep moves on to the next user.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use super::models::Profile;
use crate::domains::shop::models::{CheckIn, MenuPhoto};
use crate::kernel::ServerKernel;

const GRACE_PERIOD_DAYS: i64 = 30;
const CHECKIN_PHOTO_BUCKET: &str = "checkin-photos";

pub async fn run_sweep(kernel: &ServerKernel) -> Result<()> {
    let eligible = Profile::find_eligible_for_deletion(GRACE_PERIOD_DAYS, &kernel.db_pool)
        .await
        .context("failed to load deletion-eligible profiles")?;

    if eligible.is_empty() {
        info!("No accounts pending deletion");
        return Ok(());
    }

    info!(count = eligible.len(), "Sweeping accounts pending deletion");

    let mut deleted = 0;
    let mut failed = 0;

    for profile in eligible {
        match delete_account(&profile, kernel).await {
            Ok(()) => {
                info!(user_id = %profile.id, "Account deleted");
                deleted += 1;
            }
            Err(e) => {
                // Row kept; the next sweep retries from scratch.
                error!(
                    user_id = %profile.id,
                    error = %format!("{e:#}"),
                    "Account deletion failed"
                );
                failed += 1;
            }
        }
    }

    info!(deleted, failed, "Deletion sweep complete");

    Ok(())
}

/// Storage cleanup first, row deletion second. Order matters: a half-done
/// storage pass with the row still present is retryable, orphaned objects
/// with the row gone are not.
async fn delete_account(profile: &Profile, kernel: &ServerKernel) -> Result<()> {
    purge_user_assets(profile, kernel)
        .await
        .context("storage cleanup failed, account row kept")?;

    Profile::delete(profile.id, &kernel.db_pool)
        .await
        .context("failed to delete profile row")?;

    Ok(())
}

/// Remove both asset families: objects under the user's folder prefix, and
/// objects referenced by persisted public URLs.
async fn purge_user_assets(profile: &Profile, kernel: &ServerKernel) -> Result<()> {
    let pool = &kernel.db_pool;

    let prefix = format!("{}/", profile.id);
    let under_prefix = kernel
        .storage
        .list_objects(CHECKIN_PHOTO_BUCKET, &prefix)
        .await
        .with_context(|| format!("failed to list objects under {prefix}"))?;
    if !under_prefix.is_empty() {
        kernel
            .storage
            .remove_objects(CHECKIN_PHOTO_BUCKET, &under_prefix)
            .await
            .with_context(|| {
                format!(
                    "failed to remove {} objects under {prefix}",
                    under_prefix.len()
                )
            })?;
    }

    let mut urls = CheckIn::photo_urls_for_user(profile.id, pool)
        .await
        .context("failed to load check-in photo URLs")?;
    urls.extend(
        MenuPhoto::urls_for_user(profile.id, pool)
            .await
            .context("failed to load menu photo URLs")?,
    );
    if let Some(avatar_url) = &profile.avatar_url {
        urls.push(avatar_url.clone());
    }

    let mut by_bucket: HashMap<String, Vec<String>> = HashMap::new();
    for url in &urls {
        let (bucket, path) = parse_storage_url(url)?;
        by_bucket.entry(bucket).or_default().push(path);
    }

    for (bucket, paths) in by_bucket {
        kernel
            .storage
            .remove_objects(&bucket, &paths)
            .await
            .with_context(|| format!("failed to remove {} objects from {bucket}", paths.len()))?;
    }

    Ok(())
}

/// Split a public storage URL back into bucket and object path.
///
/// Expected shape: `{base}/storage/v1/object/public/{bucket}/{path...}`.
/// Anything else fails the per-user deletion rather than leaving the object
/// behind silently.
fn parse_storage_url(url: &str) -> Result<(String, String)> {
    let parsed =
        url::Url::parse(url).with_context(|| format!("unparseable storage URL: {url}"))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["storage", "v1", "object", "public", bucket, path @ ..]
            if !bucket.is_empty() && !path.is_empty() =>
        {
            Ok(((*bucket).to_string(), path.join("/")))
        }
        _ => bail!("URL is not a public storage object: {url}"),
    }
}
