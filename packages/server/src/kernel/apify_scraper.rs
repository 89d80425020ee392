use anyhow::{Context, Result};
use apify_client::{ApifyClient, GooglePlace, PlaceReview};
use async_trait::async_trait;

use super::{BaseScraper, ScrapedListing, ScrapedReview};

/// Google Maps scraper backed by the Apify places crawler.
pub struct ApifyScraper {
    client: ApifyClient,
}

impl ApifyScraper {
    pub fn new(api_token: String) -> Self {
        Self {
            client: ApifyClient::new(api_token),
        }
    }
}

fn to_listing(place: GooglePlace) -> Option<ScrapedListing> {
    // A dataset item without a title is a crawl artifact, not a place.
    let name = place.title?;

    Some(ScrapedListing {
        name,
        address: place.address,
        latitude: place.location.as_ref().map(|l| l.lat),
        longitude: place.location.as_ref().map(|l| l.lng),
        google_place_id: place.place_id,
        rating: place.total_score,
        review_count: place.reviews_count,
        opening_hours: place.opening_hours,
        phone: place.phone,
        website: place.website,
        menu_url: place.menu,
        reviews: place.reviews.into_iter().filter_map(to_review).collect(),
        photo_urls: place.image_urls,
    })
}

fn to_review(review: PlaceReview) -> Option<ScrapedReview> {
    let text = review.text.filter(|t| !t.trim().is_empty())?;
    let rating = review.stars?;

    Some(ScrapedReview {
        text,
        rating,
        published_at: review.published_at_date,
    })
}

#[async_trait]
impl BaseScraper for ApifyScraper {
    async fn scrape_by_url(&self, url: &str) -> Result<Option<ScrapedListing>> {
        let places = self
            .client
            .scrape_place(url)
            .await
            .context("Apify place scrape failed")?;

        Ok(places.into_iter().next().and_then(to_listing))
    }

    async fn scrape_reviews(&self, place_id: &str) -> Result<Vec<ScrapedReview>> {
        let places = self
            .client
            .scrape_place_reviews(place_id)
            .await
            .context("Apify reviews probe failed")?;

        Ok(places
            .into_iter()
            .flat_map(|p| p.reviews)
            .filter_map(to_review)
            .collect())
    }
}
