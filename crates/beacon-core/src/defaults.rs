//! Centralized default constants for beacon.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// BROKER
// =============================================================================

/// Well-known broker channel every envelope is published on.
pub const EVENTS_CHANNEL: &str = "events";

/// Default broker connection URL.
pub const BROKER_URL: &str = "redis://localhost:12311";

/// Environment variable overriding [`BROKER_URL`].
pub const ENV_BROKER_URL: &str = "BEACON_BROKER_URL";

/// Timeout for a single broker publish, in seconds. Publishing is best-effort
/// and must never stall the business transaction that triggered it.
pub const BROKER_TIMEOUT_SECS: u64 = 2;

// =============================================================================
// TASK LOGS
// =============================================================================

/// Sliding TTL for a task's keyed log entries, in seconds. Reset on every
/// append, not absolute.
pub const TASK_LOG_TTL_SECS: u64 = 3600;

/// Age threshold for the filesystem log sweep, in seconds (one day).
pub const TASK_LOG_MAX_AGE_SECS: u64 = 86_400;

/// Environment variable overriding [`TASK_LOG_MAX_AGE_SECS`].
pub const ENV_TASK_LOG_MAX_AGE_SECS: &str = "BEACON_TASK_LOG_MAX_AGE_SECS";

/// Key prefix for per-task log hashes in the keyed store.
pub const TASK_LOG_KEY_PREFIX: &str = "task_log:";

/// Build the keyed-store key for one task's log.
pub fn task_log_key(task_id: &str) -> String {
    format!("{TASK_LOG_KEY_PREFIX}{task_id}")
}

// =============================================================================
// JOB QUEUE INTROSPECTION
// =============================================================================

/// Key prefix for the queue backend's own keys (queues, jobs, workers).
pub const QUEUE_KEY_PREFIX: &str = "jobs:";

/// Key prefix for per-site scheduler heartbeat keys.
pub const SCHEDULER_HEARTBEAT_PREFIX: &str = "scheduler:heartbeat:";
