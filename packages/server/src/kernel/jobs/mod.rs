//! Job infrastructure for background pipeline execution.
//!
//! This module provides the kernel-level queue machinery:
//! - [`PostgresJobQueue`] - Database-backed durable queue
//! - [`JobWorker`] - Long-running poller that claims and dispatches jobs
//! - [`Job`] - Job row model with claim/backoff helpers
//!
//! # Architecture
//!
//! ```text
//! Intake / cron enqueue
//!     │
//!     └─► JobQueue.enqueue(job_type, payload, priority)
//!             └─► INSERT pending row
//!
//! JobWorker (one per process, N processes share one store)
//!     │
//!     ├─► JobQueue.claim()        (FOR UPDATE SKIP LOCKED, attempts += 1)
//!     ├─► dispatch by JobType     (exhaustive match, handlers in domains/)
//!     └─► JobQueue.complete() / fail() / fail_permanently()
//! ```
//!
//! # Domain-Specific Handlers
//!
//! Stage handlers live in their respective domains. This module only
//! provides the infrastructure - business logic stays in domains.

mod job;
mod payload;
mod queue;
mod worker;

pub use job::{backoff_delay, priority, Job, JobStatus, JobType};
pub use payload::{MenuPhotoPayload, ShopPipelinePayload};
pub use queue::{JobQueue, PostgresJobQueue, StatusCount};
pub use worker::{JobError, JobWorker, JobWorkerConfig};
