// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "enrich a shop") should be domain functions that use
// these traits.
//
// Naming convention: Base* for trait names (e.g., BaseScraper, BaseLlm)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Scraper Trait (Infrastructure - Google Maps listing data)
// =============================================================================

/// A single review as returned by the scrape provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedReview {
    pub text: String,
    pub rating: i32,
    pub published_at: Option<DateTime<Utc>>,
}

/// Structured listing data from a full scrape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedListing {
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub google_place_id: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub opening_hours: Option<serde_json::Value>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub menu_url: Option<String>,
    pub reviews: Vec<ScrapedReview>,
    pub photo_urls: Vec<String>,
}

#[async_trait]
pub trait BaseScraper: Send + Sync {
    /// Full scrape of a listing by its Google Maps URL.
    ///
    /// Returns `Ok(None)` when the place does not exist on Google Maps.
    async fn scrape_by_url(&self, url: &str) -> Result<Option<ScrapedListing>>;

    /// Cheap reviews-only probe by place id, used by the staleness sweep.
    async fn scrape_reviews(&self, place_id: &str) -> Result<Vec<ScrapedReview>>;
}

// =============================================================================
// LLM Trait (Infrastructure - classification and vision extraction)
// =============================================================================

/// A taxonomy entry handed to the classifier as context.
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyEntry {
    pub slug: String,
    pub dimension: String,
    pub label: String,
}

/// Everything the classifier sees about a shop.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    pub name: String,
    pub address: Option<String>,
    pub review_texts: Vec<String>,
    pub taxonomy: Vec<TaxonomyEntry>,
}

/// One selected tag with the classifier's confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSelection {
    pub slug: String,
    pub confidence: f64,
}

/// Suitability scores per visit mode, each in 0..1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeScores {
    pub work: f64,
    pub rest: f64,
    pub social: f64,
}

/// Full classification output for one shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub tags: Vec<TagSelection>,
    pub summary: String,
    pub confidence: f64,
    pub mode_scores: ModeScores,
}

/// One extracted menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[async_trait]
pub trait BaseLlm: Send + Sync {
    /// Classify a shop against the tag taxonomy and summarize it.
    async fn classify_shop(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult>;

    /// Extract menu items from a photo. An unreadable menu yields an empty list.
    async fn extract_menu(&self, image_url: &str) -> Result<Vec<MenuItem>>;
}

// =============================================================================
// Embedding Service Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate embedding for text (returns 1536-dimensional vector)
    async fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// Email Service Trait (Infrastructure)
// =============================================================================

/// An outbound email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait BaseEmailService: Send + Sync {
    /// Send one email. Returns once the provider has accepted delivery.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

// =============================================================================
// Storage Trait (Infrastructure - object storage buckets)
// =============================================================================

#[async_trait]
pub trait BaseStorage: Send + Sync {
    /// List object paths under a prefix in a bucket.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Bulk delete objects in a bucket. Deleting a missing path is not an error.
    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<()>;
}
