// ServerKernel - core infrastructure with all dependencies
//
// The ServerKernel holds all server dependencies (database, providers, queue)
// and provides access via traits for testability.

use sqlx::PgPool;
use std::sync::Arc;

use super::jobs::JobQueue;
use super::{BaseEmailService, BaseEmbeddingService, BaseLlm, BaseScraper, BaseStorage};

/// ServerKernel holds all server dependencies
pub struct ServerKernel {
    pub db_pool: PgPool,
    pub scraper: Arc<dyn BaseScraper>,
    pub llm: Arc<dyn BaseLlm>,
    pub embedding_service: Arc<dyn BaseEmbeddingService>,
    pub email_service: Arc<dyn BaseEmailService>,
    pub storage: Arc<dyn BaseStorage>,
    /// Durable queue for pipeline execution
    pub job_queue: Arc<dyn JobQueue>,
    /// Recipient of the daily operator digest
    pub admin_email: String,
}

impl ServerKernel {
    /// Creates a new ServerKernel with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        scraper: Arc<dyn BaseScraper>,
        llm: Arc<dyn BaseLlm>,
        embedding_service: Arc<dyn BaseEmbeddingService>,
        email_service: Arc<dyn BaseEmailService>,
        storage: Arc<dyn BaseStorage>,
        job_queue: Arc<dyn JobQueue>,
        admin_email: String,
    ) -> Self {
        Self {
            db_pool,
            scraper,
            llm,
            embedding_service,
            email_service,
            storage,
            job_queue,
            admin_email,
        }
    }
}
