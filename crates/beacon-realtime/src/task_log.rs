//! Task log sink — line-oriented job output, streamed and persisted.
//!
//! A [`TaskLogSink`] is bound to one task id. Every written line is mirrored
//! three ways:
//! 1. published as a `task_progress` event to the task's progress room (live
//!    push, best-effort — broker outages are swallowed by the publisher);
//! 2. optionally appended to an on-disk log file;
//! 3. persisted in the keyed store under `task_log:{task_id}` with a sliding
//!    TTL reset on every append.
//!
//! Durable-store failures surface to the caller: losing a durable log line is
//! a worse failure than losing a live push, which for that same line already
//! happened independently.
//!
//! The sink is explicit composition over a store and a publish path — not a
//! subclassed file stream. Clones share the underlying sink and its counter.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;
use tracing::info;

use beacon_core::defaults::{
    task_log_key, ENV_TASK_LOG_MAX_AGE_SECS, TASK_LOG_MAX_AGE_SECS, TASK_LOG_TTL_SECS,
};
use beacon_core::{rooms, Envelope, Message, Result, SiteContext};

use crate::broker::EventBroker;
use crate::publisher::Publisher;

struct SinkState {
    next_line: u64,
    file: Option<File>,
}

struct Inner {
    site: String,
    task_id: String,
    log_key: String,
    broker: Arc<dyn EventBroker>,
    publisher: Publisher,
    // Serializes the counter with the writes it numbers, so line numbers stay
    // monotonic even with writers on multiple threads.
    state: Mutex<SinkState>,
}

/// Append-only, line-numbered output sink for one task.
#[derive(Clone)]
pub struct TaskLogSink {
    inner: Arc<Inner>,
}

impl TaskLogSink {
    /// Create a sink for `task_id`, reusing the publisher's broker as the
    /// keyed store.
    pub fn new(ctx: &SiteContext, task_id: impl Into<String>, publisher: &Publisher) -> Self {
        let task_id = task_id.into();
        Self {
            inner: Arc::new(Inner {
                site: ctx.site().to_string(),
                log_key: task_log_key(&task_id),
                task_id,
                broker: publisher.broker(),
                publisher: publisher.clone(),
                state: Mutex::new(SinkState {
                    next_line: 0,
                    file: None,
                }),
            }),
        }
    }

    /// The task this sink belongs to.
    pub fn task_id(&self) -> &str {
        &self.inner.task_id
    }

    /// Attach an on-disk mirror at `{dir}/{task_id}.{stream_type}`.
    ///
    /// Returns the file path. Subsequent lines are appended to the file in
    /// addition to the live push and keyed store.
    pub async fn attach_file(&self, dir: &Path, stream_type: &str) -> Result<PathBuf> {
        let path = task_log_file_path(dir, &self.inner.task_id, stream_type);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.inner.state.lock().await.file = Some(file);
        Ok(path)
    }

    /// Write one line: publish it to the task's progress room, mirror it to
    /// the attached file (if any), and persist it with a fresh TTL.
    ///
    /// Returns the line number. The number is consumed only when the durable
    /// write succeeds, so a caller retrying a failed write reuses it.
    pub async fn write_line(&self, line: &str) -> Result<u64> {
        let mut state = self.inner.state.lock().await;
        let line_no = state.next_line;

        self.inner
            .publisher
            .emit(&progress_envelope(
                &self.inner.site,
                &self.inner.task_id,
                line_no,
                line,
            ))
            .await;

        if let Some(file) = state.file.as_mut() {
            writeln!(file, "{line}")?;
        }

        self.inner
            .broker
            .log_line(&self.inner.log_key, line_no, line, TASK_LOG_TTL_SECS)
            .await?;

        state.next_line = line_no + 1;
        Ok(line_no)
    }

    /// Replay all persisted lines for this task, ordered by line number.
    pub async fn stored_lines(&self) -> Result<BTreeMap<u64, String>> {
        self.inner.broker.log_lines(&self.inner.log_key).await
    }
}

/// Primary and error output streams for a task.
///
/// Both channels multiplex onto the SAME sink: line numbers are global across
/// stdout and stderr, not per-channel. Consumers replaying logs see one
/// interleaved sequence.
pub fn std_streams(
    ctx: &SiteContext,
    task_id: impl Into<String>,
    publisher: &Publisher,
) -> (TaskLogSink, TaskLogSink) {
    let sink = TaskLogSink::new(ctx, task_id, publisher);
    (sink.clone(), sink)
}

/// On-disk path of a task's log file for the given stream type.
pub fn task_log_file_path(dir: &Path, task_id: &str, stream_type: &str) -> PathBuf {
    dir.join(format!("{task_id}.{stream_type}"))
}

fn progress_envelope(site: &str, task_id: &str, line_no: u64, line: &str) -> Envelope {
    let mut lines = serde_json::Map::new();
    lines.insert(line_no.to_string(), json!(line));
    let mut body = serde_json::Map::new();
    body.insert("lines".to_string(), JsonValue::Object(lines));

    let mut message = Message::new();
    message.insert("message".to_string(), JsonValue::Object(body));
    message.insert("task_id".to_string(), json!(task_id));

    Envelope::new(
        "task_progress",
        message,
        rooms::task_progress_room(site, task_id),
    )
}

/// Remove on-disk log files older than `max_age`.
///
/// Runs independently of the keyed-store TTL (the TTL covers the store, the
/// sweep covers the filesystem mirror). Tolerates concurrent writers: entries
/// that vanish mid-scan are skipped, not errors.
pub fn remove_stale_logs(dir: &Path, max_age: Duration) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age > max_age {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    if removed > 0 {
        info!(removed, dir = %dir.display(), "removed stale task logs");
    }
    Ok(removed)
}

/// Sweep age threshold: `BEACON_TASK_LOG_MAX_AGE_SECS` or the default.
pub fn stale_log_max_age() -> Duration {
    let secs = std::env::var(ENV_TASK_LOG_MAX_AGE_SECS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(TASK_LOG_MAX_AGE_SECS);
    Duration::from_secs(secs)
}
