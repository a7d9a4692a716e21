//! # beacon-realtime
//!
//! Realtime event publishing for beacon: broker abstraction, the
//! transactional outbox for post-commit delivery, `publish_realtime` room
//! resolution, and per-task log streaming.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use beacon_core::SiteContext;
//! use beacon_realtime::{Publisher, PublishArgs, RealtimeOutbox, RedisBroker, publish_realtime};
//!
//! let broker = Arc::new(RedisBroker::from_env().await?);
//! let publisher = Publisher::new(broker);
//!
//! // Per-request state
//! let ctx = SiteContext::new("site1.local").with_user("alice@example.com");
//! let mut outbox = RealtimeOutbox::new();
//!
//! publish_realtime(&ctx, &publisher, &mut outbox,
//!     PublishArgs::event("list_update").doctype("Note").after_commit(true)).await;
//!
//! // ... transaction commits ...
//! outbox.flush(&publisher).await;
//! ```

pub mod broker;
pub mod outbox;
pub mod publish;
pub mod publisher;
pub mod subscribe;
pub mod task_log;

// Re-export core types
pub use beacon_core::{Envelope, Message, SiteContext};

pub use broker::{EventBroker, MemoryBroker, RedisBroker};
pub use outbox::RealtimeOutbox;
pub use publish::{publish_progress, publish_realtime, publish_task_status, PublishArgs};
pub use publisher::Publisher;
pub use subscribe::{
    can_subscribe_doc, can_subscribe_doctype, user_info, PermissionChecker, SessionInfo,
    SessionStore, GUEST_USER,
};
pub use task_log::{remove_stale_logs, std_streams, TaskLogSink};
