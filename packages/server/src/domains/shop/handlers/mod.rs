//! Stage handlers for the ingestion pipeline.
//!
//! Each handler is `run(job, kernel)`: it deserializes its payload shape,
//! performs the stage's effects, and enqueues the next stage. Handlers are
//! independently retryable from the entry's persisted state alone.

pub mod enrich_menu_photo;
pub mod enrich_shop;
pub mod generate_embedding;
pub mod publish_shop;
pub mod scrape_shop;
pub mod staleness_sweep;
