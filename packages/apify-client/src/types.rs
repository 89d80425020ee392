use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the actor's `startUrls` input.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Input for the compass/crawler-google-places actor.
#[derive(Debug, Clone, Serialize)]
pub struct GooglePlacesInput {
    #[serde(rename = "startUrls", skip_serializing_if = "Vec::is_empty")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "placeIds", skip_serializing_if = "Vec::is_empty")]
    pub place_ids: Vec<String>,
    #[serde(rename = "maxCrawledPlacesPerSearch")]
    pub max_crawled_places_per_search: u32,
    #[serde(rename = "maxReviews")]
    pub max_reviews: u32,
    #[serde(rename = "maxImages")]
    pub max_images: u32,
    pub language: String,
    #[serde(rename = "scrapeReviewerName")]
    pub scrape_reviewer_name: bool,
}

impl GooglePlacesInput {
    /// Full scrape of a single listing by URL.
    pub fn for_listing(url: &str) -> Self {
        Self {
            start_urls: vec![StartUrl {
                url: url.to_string(),
            }],
            place_ids: vec![],
            max_crawled_places_per_search: 1,
            max_reviews: 20,
            max_images: 10,
            language: "zh-TW".to_string(),
            scrape_reviewer_name: false,
        }
    }

    /// Cheap reviews-only probe by place id.
    pub fn for_reviews_probe(place_id: &str) -> Self {
        Self {
            start_urls: vec![],
            place_ids: vec![place_id.to_string()],
            max_crawled_places_per_search: 1,
            max_reviews: 5,
            max_images: 0,
            language: "zh-TW".to_string(),
            scrape_reviewer_name: false,
        }
    }
}

/// A single review on a scraped place.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceReview {
    pub text: Option<String>,
    pub stars: Option<i32>,
    #[serde(rename = "publishedAtDate")]
    pub published_at_date: Option<DateTime<Utc>>,
}

/// A scraped Google Maps place from the actor's dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct GooglePlace {
    pub title: Option<String>,
    pub address: Option<String>,
    pub location: Option<PlaceLocation>,
    #[serde(rename = "placeId")]
    pub place_id: Option<String>,
    #[serde(rename = "totalScore")]
    pub total_score: Option<f64>,
    #[serde(rename = "reviewsCount")]
    pub reviews_count: Option<i32>,
    #[serde(rename = "openingHours")]
    pub opening_hours: Option<serde_json::Value>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub menu: Option<String>,
    #[serde(rename = "imageUrls", default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<PlaceReview>,
}

/// Coordinates of a scraped place.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}
