// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerKernel for tests.
// The job queue is the real Postgres-backed one so tests exercise the same
// claim semantics as production.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

use super::jobs::PostgresJobQueue;
use super::{
    BaseEmailService, BaseEmbeddingService, BaseLlm, BaseScraper, BaseStorage, EmailMessage,
    EnrichmentRequest, EnrichmentResult, MenuItem, ModeScores, ScrapedListing, ScrapedReview,
    ServerKernel,
};

// =============================================================================
// Mock Scraper
// =============================================================================

pub struct MockScraper {
    listing_responses: Arc<Mutex<Vec<Option<ScrapedListing>>>>,
    review_responses: Arc<Mutex<Vec<Vec<ScrapedReview>>>>,
    scrape_calls: Arc<Mutex<Vec<String>>>,
    review_calls: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self {
            listing_responses: Arc::new(Mutex::new(Vec::new())),
            review_responses: Arc::new(Mutex::new(Vec::new())),
            scrape_calls: Arc::new(Mutex::new(Vec::new())),
            review_calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Queue a listing to return from the next scrape_by_url call
    pub fn with_listing(self, listing: ScrapedListing) -> Self {
        self.listing_responses.lock().unwrap().push(Some(listing));
        self
    }

    /// Queue a not-found result (the place does not exist on Google Maps)
    pub fn with_not_found(self) -> Self {
        self.listing_responses.lock().unwrap().push(None);
        self
    }

    /// Queue reviews to return from the next scrape_reviews call
    pub fn with_reviews(self, reviews: Vec<ScrapedReview>) -> Self {
        self.review_responses.lock().unwrap().push(reviews);
        self
    }

    /// Make the next call return a transient provider error
    pub fn with_failure(self) -> Self {
        *self.fail_next.lock().unwrap() = true;
        self
    }

    /// Get all URLs that were scraped
    pub fn scrape_calls(&self) -> Vec<String> {
        self.scrape_calls.lock().unwrap().clone()
    }

    /// Get all place ids that were probed for reviews
    pub fn review_calls(&self) -> Vec<String> {
        self.review_calls.lock().unwrap().clone()
    }

    /// Check if a URL was scraped
    pub fn was_scraped(&self, url: &str) -> bool {
        self.scrape_calls.lock().unwrap().iter().any(|u| u == url)
    }
}

impl Default for MockScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseScraper for MockScraper {
    async fn scrape_by_url(&self, url: &str) -> Result<Option<ScrapedListing>> {
        self.scrape_calls.lock().unwrap().push(url.to_string());

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock scrape failure");
        }
        drop(fail);

        let mut responses = self.listing_responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok(Some(ScrapedListing {
                name: "Mock Cafe".to_string(),
                address: Some("1 Mock St".to_string()),
                google_place_id: Some("mock-place-id".to_string()),
                ..Default::default()
            }))
        }
    }

    async fn scrape_reviews(&self, place_id: &str) -> Result<Vec<ScrapedReview>> {
        self.review_calls.lock().unwrap().push(place_id.to_string());

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock reviews failure");
        }
        drop(fail);

        let mut responses = self.review_responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok(vec![])
        }
    }
}

// =============================================================================
// Mock LLM
// =============================================================================

pub struct MockLlm {
    classify_responses: Arc<Mutex<Vec<EnrichmentResult>>>,
    menu_responses: Arc<Mutex<Vec<Vec<MenuItem>>>>,
    classify_calls: Arc<Mutex<Vec<String>>>,
    menu_calls: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            classify_responses: Arc::new(Mutex::new(Vec::new())),
            menu_responses: Arc::new(Mutex::new(Vec::new())),
            classify_calls: Arc::new(Mutex::new(Vec::new())),
            menu_calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Queue a classification result
    pub fn with_classification(self, result: EnrichmentResult) -> Self {
        self.classify_responses.lock().unwrap().push(result);
        self
    }

    /// Queue a menu extraction result
    pub fn with_menu_items(self, items: Vec<MenuItem>) -> Self {
        self.menu_responses.lock().unwrap().push(items);
        self
    }

    /// Make the next call return a transient provider error
    pub fn with_failure(self) -> Self {
        *self.fail_next.lock().unwrap() = true;
        self
    }

    /// Get the shop names that were classified
    pub fn classify_calls(&self) -> Vec<String> {
        self.classify_calls.lock().unwrap().clone()
    }

    /// Get the image URLs sent for menu extraction
    pub fn menu_calls(&self) -> Vec<String> {
        self.menu_calls.lock().unwrap().clone()
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.lock().unwrap().len()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseLlm for MockLlm {
    async fn classify_shop(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult> {
        self.classify_calls
            .lock()
            .unwrap()
            .push(request.name.clone());

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock classification failure");
        }
        drop(fail);

        let mut responses = self.classify_responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok(EnrichmentResult {
                tags: vec![],
                summary: "A mock cafe.".to_string(),
                confidence: 0.5,
                mode_scores: ModeScores {
                    work: 0.5,
                    rest: 0.5,
                    social: 0.5,
                },
            })
        }
    }

    async fn extract_menu(&self, image_url: &str) -> Result<Vec<MenuItem>> {
        self.menu_calls.lock().unwrap().push(image_url.to_string());

        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock menu extraction failure");
        }
        drop(fail);

        let mut responses = self.menu_responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok(vec![])
        }
    }
}

// =============================================================================
// Mock Embedding Service
// =============================================================================

pub struct MockEmbeddingService {
    fixed_embedding: Vec<f32>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            fixed_embedding: vec![0.1; 1536],
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = embedding;
        self
    }

    /// Get all texts that embeddings were generated for
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Check if an embedding was generated for text containing the given snippet
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|t| t.contains(text))
    }
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(self.fixed_embedding.clone())
    }
}

// =============================================================================
// Mock Email Service
// =============================================================================

pub struct MockEmailService {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Make the next send attempt fail
    pub fn with_failure(self) -> Self {
        *self.fail_next.lock().unwrap() = true;
        self
    }

    /// Get all emails that were sent
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Check if an email was sent to the given address
    pub fn was_sent_to(&self, to: &str) -> bool {
        self.sent.lock().unwrap().iter().any(|m| m.to == to)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmailService for MockEmailService {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut fail_next = self.fail_next.lock().unwrap();
        if *fail_next {
            *fail_next = false;
            anyhow::bail!("mock email provider error");
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// =============================================================================
// Mock Storage
// =============================================================================

pub struct MockStorage {
    objects: Arc<Mutex<Vec<(String, String)>>>,
    removed: Arc<Mutex<Vec<(String, String)>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(Vec::new())),
            removed: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Seed an object into a bucket
    pub fn with_object(self, bucket: &str, path: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_string(), path.to_string()));
        self
    }

    /// Make the next call return a transient provider error
    pub fn with_failure(self) -> Self {
        *self.fail_next.lock().unwrap() = true;
        self
    }

    /// Get all (bucket, path) pairs that were removed
    pub fn removed(&self) -> Vec<(String, String)> {
        self.removed.lock().unwrap().clone()
    }

    /// Check if a path was removed from a bucket
    pub fn was_removed(&self, bucket: &str, path: &str) -> bool {
        self.removed
            .lock()
            .unwrap()
            .iter()
            .any(|(b, p)| b == bucket && p == path)
    }

    /// Paths still present in a bucket
    pub fn remaining(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseStorage for MockStorage {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock storage failure");
        }
        drop(fail);

        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(b, p)| b == bucket && p.starts_with(prefix))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("mock storage failure");
        }
        drop(fail);

        let mut objects = self.objects.lock().unwrap();
        let mut removed = self.removed.lock().unwrap();
        for path in paths {
            objects.retain(|(b, p)| !(b == bucket && p == path));
            removed.push((bucket.to_string(), path.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub scraper: Arc<MockScraper>,
    pub llm: Arc<MockLlm>,
    pub embedding_service: Arc<MockEmbeddingService>,
    pub email_service: Arc<MockEmailService>,
    pub storage: Arc<MockStorage>,
    pub admin_email: String,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            scraper: Arc::new(MockScraper::new()),
            llm: Arc::new(MockLlm::new()),
            embedding_service: Arc::new(MockEmbeddingService::new()),
            email_service: Arc::new(MockEmailService::new()),
            storage: Arc::new(MockStorage::new()),
            admin_email: "admin@example.org".to_string(),
        }
    }

    /// Set a mock scraper
    pub fn mock_scraper(mut self, scraper: MockScraper) -> Self {
        self.scraper = Arc::new(scraper);
        self
    }

    /// Set a mock LLM
    pub fn mock_llm(mut self, llm: MockLlm) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    /// Set a mock embedding service
    pub fn mock_embeddings(mut self, service: MockEmbeddingService) -> Self {
        self.embedding_service = Arc::new(service);
        self
    }

    /// Set a mock email service
    pub fn mock_email(mut self, service: MockEmailService) -> Self {
        self.email_service = Arc::new(service);
        self
    }

    /// Set a mock storage backend
    pub fn mock_storage(mut self, storage: MockStorage) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    /// Convert into a ServerKernel backed by the given test database
    pub fn into_kernel(self, db_pool: PgPool) -> Arc<ServerKernel> {
        let job_queue = Arc::new(PostgresJobQueue::new(db_pool.clone()));
        Arc::new(ServerKernel::new(
            db_pool,
            self.scraper,
            self.llm,
            self.embedding_service,
            self.email_service,
            self.storage,
            job_queue,
            self.admin_email,
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
