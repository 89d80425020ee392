//! Typed job payloads.
//!
//! Payloads are stored as opaque JSONB on the job row; each stage
//! deserializes the shape it expects and forwards correlation fields
//! (`submission_id`, `submitted_by`) to the next stage unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried through the scrape -> enrich -> embed -> publish chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopPipelinePayload {
    pub shop_id: Uuid,

    /// Required by the scrape stage, unused afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<Uuid>,
}

impl ShopPipelinePayload {
    /// The payload forwarded to the next stage: same correlation fields,
    /// no scrape URL.
    pub fn next_stage(&self) -> Self {
        Self {
            shop_id: self.shop_id,
            google_maps_url: None,
            submission_id: self.submission_id,
            submitted_by: self.submitted_by,
        }
    }
}

/// Payload for menu-photo enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuPhotoPayload {
    pub shop_id: Uuid,
    pub image_url: String,
}
