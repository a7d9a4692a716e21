//! Structured logging field name constants for beacon.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (broker outage, swallowed publish) |
//! | INFO  | Lifecycle events, sweep summaries |
//! | DEBUG | Decision points, room resolution, outbox activity |
//! | TRACE | Per-line / per-job iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "realtime", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "publisher", "outbox", "task_log", "registry"
pub const COMPONENT: &str = "component";

/// Tenant (site) the event belongs to.
pub const SITE: &str = "site";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Event name carried by an envelope.
pub const EVENT: &str = "event";

/// Resolved room an envelope is addressed to.
pub const ROOM: &str = "room";

/// Background task id.
pub const TASK_ID: &str = "task_id";

/// Job id in the queue backend.
pub const JOB_ID: &str = "job_id";

/// Queue name a job was observed in.
pub const QUEUE: &str = "queue";

/// Line number within a task log stream.
pub const LINE_NO: &str = "line_no";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of envelopes flushed from an outbox.
pub const FLUSHED: &str = "flushed";

/// Number of files removed by a sweep.
pub const REMOVED: &str = "removed";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
