//! Kernel module - server infrastructure and dependencies.

pub mod anthropic_client;
pub mod apify_scraper;
pub mod jobs;
pub mod openai_client;
pub mod resend_client;
pub mod scheduled_tasks;
pub mod server_kernel;
pub mod supabase_storage;
pub mod test_dependencies;
pub mod traits;

pub use anthropic_client::AnthropicClient;
pub use apify_scraper::ApifyScraper;
pub use openai_client::OpenAiClient;
pub use resend_client::ResendClient;
pub use scheduled_tasks::start_scheduler;
pub use server_kernel::ServerKernel;
pub use supabase_storage::SupabaseStorage;
pub use test_dependencies::{
    MockEmailService, MockEmbeddingService, MockLlm, MockScraper, MockStorage, TestDependencies,
};
pub use traits::*;
