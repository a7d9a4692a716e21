//! # beacon-jobs
//!
//! Read-only introspection over beacon's shared, multi-tenant job queue:
//! normalized job listings, scheduler liveness, and pending-task lookup for
//! documents. Nothing here mutates the queue.

pub mod pending;
pub mod registry;
pub mod scheduler;

// Re-export core types
pub use beacon_core::SiteContext;

pub use pending::{pending_tasks_for_doc, TaskDirectory};
pub use registry::{
    JobRegistry, JobStatus, JobView, MemoryQueueBackend, QueueBackend, QueuedJob,
    RedisQueueBackend, WorkerSnapshot,
};
pub use scheduler::{scheduler_status, RedisSchedulerProbe, SchedulerProbe, SchedulerStatus};
