//! Job model for the durable Postgres queue.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ScrapeShop,
    EnrichShop,
    EnrichMenuPhoto,
    GenerateEmbedding,
    PublishShop,
    StalenessSweep,
    WeeklyEmail,
    AdminDigestEmail,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ScrapeShop => "scrape_shop",
            JobType::EnrichShop => "enrich_shop",
            JobType::EnrichMenuPhoto => "enrich_menu_photo",
            JobType::GenerateEmbedding => "generate_embedding",
            JobType::PublishShop => "publish_shop",
            JobType::StalenessSweep => "staleness_sweep",
            JobType::WeeklyEmail => "weekly_email",
            JobType::AdminDigestEmail => "admin_digest_email",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Claimed,
    Completed,
    Failed,
    /// Operator-only parking state. Handler logic never writes this.
    DeadLetter,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Claimed => "claimed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::DeadLetter => "dead_letter",
        }
    }
}

/// Priority bands used by the pipeline. Higher claims first.
pub mod priority {
    /// Cron-enqueued sweeps and emails.
    pub const DEFAULT: i32 = 0;
    /// Staleness-triggered re-enrichment; yields to fresh intake.
    pub const STALENESS_REFRESH: i32 = 1;
    /// First stage of a user submission.
    pub const INTAKE_SCRAPE: i32 = 2;
    /// In-flight pipeline stages; a started shop finishes before new intake.
    pub const PIPELINE_STAGE: i32 = 5;
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub job_type: JobType,

    #[builder(default = serde_json::json!({}))]
    pub payload: serde_json::Value,

    #[builder(default)]
    pub status: JobStatus,

    #[builder(default = 0)]
    pub priority: i32,

    #[builder(default = 0)]
    pub attempts: i32,
    #[builder(default = 3)]
    pub max_attempts: i32,

    #[builder(default, setter(strip_option))]
    pub last_error: Option<String>,

    #[builder(default = Utc::now())]
    pub scheduled_at: DateTime<Utc>,
    #[builder(default, setter(strip_option))]
    pub claimed_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether a claim statement would consider this row.
    pub fn is_ready(&self) -> bool {
        self.status == JobStatus::Pending && self.scheduled_at <= Utc::now()
    }

    /// Whether a failure should re-queue rather than terminate.
    pub fn has_attempts_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Deserialize the payload into a typed struct.
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| anyhow!("failed to deserialize payload for job {}: {}", self.id, e))
    }
}

/// Retry delay after the given (already incremented) attempt number.
///
/// 60s after the first attempt, doubling each retry, capped at an hour.
pub fn backoff_delay(attempts: i32) -> Duration {
    let exp = (attempts - 1).clamp(0, 10) as u32;
    Duration::seconds((60_i64 * 2_i64.pow(exp)).min(3600))
}
