//! Job registry reader — a uniform view over the shared job queue.
//!
//! The broker's queue space is shared by every tenant; jobs carry their site
//! in submission kwargs. [`JobRegistry::list_jobs`] scans queued jobs, the job
//! each live worker is executing, and (optionally) each queue's failed
//! registry, filters to the caller's site, and normalizes heterogeneous job
//! metadata into [`JobView`]s. Read-only; safe to call concurrently.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::warn;

use beacon_core::defaults::QUEUE_KEY_PREFIX;
use beacon_core::{Error, Result, SiteContext};

/// Name of the legacy failed queue, skipped during the queued-job scan.
const FAILED_QUEUE: &str = "failed";

// =============================================================================
// JOB TYPES
// =============================================================================

/// Lifecycle status of a queued job, each mapped 1:1 to a display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
}

impl JobStatus {
    /// Display color for desk listings.
    pub fn color(self) -> &'static str {
        match self {
            JobStatus::Queued => "orange",
            JobStatus::Started => "blue",
            JobStatus::Finished => "green",
            JobStatus::Failed => "red",
        }
    }

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a wire status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "started" => Some(JobStatus::Started),
            "finished" => Some(JobStatus::Finished),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Raw job record as stored by the queue backend.
///
/// `kwargs` is the submission metadata: the `"site"` tenant tag, an optional
/// `"job_name"`, and an optional nested `"kwargs"` object carrying
/// `"job_type"` / `"sub_job_type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: String,
    pub kwargs: JsonValue,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub exc_info: Option<String>,
}

impl QueuedJob {
    /// Create a queued job tagged with a site.
    pub fn new(id: impl Into<String>, site: &str) -> Self {
        Self {
            id: id.into(),
            kwargs: json!({ "site": site }),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            exc_info: None,
        }
    }

    /// Replace the submission kwargs wholesale.
    pub fn with_kwargs(mut self, kwargs: JsonValue) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach failure details.
    pub fn with_exc_info(mut self, exc_info: impl Into<String>) -> Self {
        self.exc_info = Some(exc_info.into());
        self
    }

    /// The site tag from submission kwargs, if present.
    pub fn site(&self) -> Option<&str> {
        self.kwargs.get("site").and_then(JsonValue::as_str)
    }
}

/// A live worker and the job it is currently executing, if any.
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub name: String,
    pub current_job: Option<QueuedJob>,
}

/// Normalized display projection of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub job_name: String,
    pub status: JobStatus,
    pub queue: String,
    pub created: DateTime<Utc>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exc_info: Option<String>,
}

/// Resolve a display name: nested `sub_job_type`, then nested `job_type`,
/// then top-level `job_name`, then the job id. First non-empty wins.
fn resolve_job_name(job: &QueuedJob) -> String {
    let nested = job.kwargs.get("kwargs");
    let candidates = [
        nested.and_then(|n| n.get("sub_job_type")).and_then(JsonValue::as_str),
        nested.and_then(|n| n.get("job_type")).and_then(JsonValue::as_str),
        job.kwargs.get("job_name").and_then(JsonValue::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(&job.id)
        .to_string()
}

fn job_view(job: &QueuedJob, source: &str) -> JobView {
    JobView {
        job_name: resolve_job_name(job),
        status: job.status,
        queue: source.to_string(),
        created: job.created_at,
        color: job.status.color().to_string(),
        exc_info: job.exc_info.clone(),
    }
}

// =============================================================================
// QUEUE BACKEND
// =============================================================================

/// Read-only view of the broker's native queue/worker/registry APIs.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Names of all known queues.
    async fn queue_names(&self) -> Result<Vec<String>>;

    /// Jobs currently sitting in a queue.
    async fn queued_jobs(&self, queue: &str) -> Result<Vec<QueuedJob>>;

    /// All live workers with their current jobs.
    async fn workers(&self) -> Result<Vec<WorkerSnapshot>>;

    /// Ids in a queue's failed registry.
    async fn failed_job_ids(&self, queue: &str) -> Result<Vec<String>>;

    /// Fetch a job by id.
    async fn fetch_job(&self, id: &str) -> Result<Option<QueuedJob>>;
}

// =============================================================================
// REGISTRY READER
// =============================================================================

/// Reader over a [`QueueBackend`], scoped per call to a [`SiteContext`].
#[derive(Clone)]
pub struct JobRegistry {
    backend: Arc<dyn QueueBackend>,
}

impl JobRegistry {
    /// Create a registry reader over the given backend.
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    /// List jobs visible to the caller's site.
    ///
    /// Scans non-failed queues, then each worker's current job, then (with
    /// `include_failed`) each queue's failed registry. A job observed through
    /// multiple sources appears once, with the most recently observed status.
    pub async fn list_jobs(&self, ctx: &SiteContext, include_failed: bool) -> Result<Vec<JobView>> {
        let mut order: Vec<String> = Vec::new();
        let mut views: HashMap<String, JobView> = HashMap::new();

        fn add(
            order: &mut Vec<String>,
            views: &mut HashMap<String, JobView>,
            site: &str,
            job: &QueuedJob,
            source: &str,
        ) {
            // Jobs for other tenants are silently excluded.
            if job.site() != Some(site) {
                return;
            }
            if !views.contains_key(&job.id) {
                order.push(job.id.clone());
            }
            // Later observations win (queued -> started -> failed).
            views.insert(job.id.clone(), job_view(job, source));
        }

        let queues = self.backend.queue_names().await?;

        for queue in &queues {
            if queue == FAILED_QUEUE {
                continue;
            }
            for job in self.backend.queued_jobs(queue).await? {
                add(&mut order, &mut views, ctx.site(), &job, queue);
            }
        }

        for worker in self.backend.workers().await? {
            if let Some(job) = &worker.current_job {
                add(&mut order, &mut views, ctx.site(), job, &worker.name);
            }
        }

        if include_failed {
            for queue in &queues {
                for id in self.backend.failed_job_ids(queue).await? {
                    if let Some(job) = self.backend.fetch_job(&id).await? {
                        add(&mut order, &mut views, ctx.site(), &job, queue);
                    }
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| views.remove(&id))
            .collect())
    }
}

// =============================================================================
// REDIS BACKEND
// =============================================================================

/// Redis queue backend storing job metadata as JSON hash fields.
///
/// Key layout under the configured prefix:
/// - `queues` — set of queue names
/// - `queue:{name}` — list of job ids
/// - `job:{id}` — hash with `kwargs` (JSON), `status`, `created_at`
///   (RFC 3339), `exc_info`
/// - `workers` — set of worker names
/// - `worker:{name}` — hash with `current_job` (job id)
/// - `failed:{name}` — list of failed job ids
#[derive(Clone)]
pub struct RedisQueueBackend {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisQueueBackend {
    /// Connect to the queue backend at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: QUEUE_KEY_PREFIX.to_string(),
        })
    }

    /// Override the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, rest: &str) -> String {
        format!("{}{}", self.prefix, rest)
    }

    /// Parse a job hash tolerantly: malformed fields degrade to defaults
    /// instead of failing the whole listing.
    fn parse_job(&self, id: &str, mut fields: HashMap<String, String>) -> QueuedJob {
        let kwargs = fields
            .remove("kwargs")
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(job_id = %id, error = %e, "unparseable job kwargs");
                    None
                }
            })
            .unwrap_or_else(|| json!({}));

        let status = fields
            .remove("status")
            .and_then(|s| JobStatus::parse(&s))
            .unwrap_or(JobStatus::Queued);

        let created_at = fields
            .remove("created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        QueuedJob {
            id: id.to_string(),
            kwargs,
            status,
            created_at,
            exc_info: fields.remove("exc_info"),
        }
    }
}

#[async_trait]
impl QueueBackend for RedisQueueBackend {
    async fn queue_names(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut names: Vec<String> = conn
            .smembers(self.key("queues"))
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        names.sort();
        Ok(names)
    }

    async fn queued_jobs(&self, queue: &str) -> Result<Vec<QueuedJob>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .lrange(self.key(&format!("queue:{queue}")), 0, -1)
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.fetch_job(&id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn workers(&self) -> Result<Vec<WorkerSnapshot>> {
        let mut conn = self.conn.clone();
        let mut names: Vec<String> = conn
            .smembers(self.key("workers"))
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        names.sort();

        let mut snapshots = Vec::with_capacity(names.len());
        for name in names {
            let job_id: Option<String> = conn
                .hget(self.key(&format!("worker:{name}")), "current_job")
                .await
                .map_err(|e| Error::Queue(e.to_string()))?;
            let current_job = match job_id {
                Some(id) => self.fetch_job(&id).await?,
                None => None,
            };
            snapshots.push(WorkerSnapshot { name, current_job });
        }
        Ok(snapshots)
    }

    async fn failed_job_ids(&self, queue: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(self.key(&format!("failed:{queue}")), 0, -1)
            .await
            .map_err(|e| Error::Queue(e.to_string()))
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<QueuedJob>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(self.key(&format!("job:{id}")))
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.parse_job(id, fields)))
    }
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

#[derive(Default)]
struct MemState {
    queues: BTreeMap<String, Vec<String>>,
    jobs: HashMap<String, QueuedJob>,
    workers: BTreeMap<String, Option<String>>,
    failed: BTreeMap<String, Vec<String>>,
}

/// In-process [`QueueBackend`] for tests and single-node development.
#[derive(Default)]
pub struct MemoryQueueBackend {
    state: Mutex<MemState>,
}

impl MemoryQueueBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job to a queue.
    pub fn enqueue(&self, queue: &str, job: QueuedJob) {
        let mut state = self.state.lock().unwrap();
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push(job.id.clone());
        state.jobs.insert(job.id.clone(), job);
    }

    /// Record a worker and the job id it is executing (replaces the job's
    /// queued entry semantics: the job now reports `started`).
    pub fn set_worker(&self, name: &str, job_id: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = job_id {
            // Worker pickup removes the job from its queue
            for ids in state.queues.values_mut() {
                ids.retain(|queued| queued != id);
            }
            if let Some(job) = state.jobs.get_mut(id) {
                job.status = JobStatus::Started;
            }
        }
        state
            .workers
            .insert(name.to_string(), job_id.map(str::to_string));
    }

    /// Move a job into a queue's failed registry.
    pub fn fail(&self, queue: &str, job: QueuedJob) {
        let mut state = self.state.lock().unwrap();
        state
            .failed
            .entry(queue.to_string())
            .or_default()
            .push(job.id.clone());
        state.jobs.insert(job.id.clone(), job);
        state.queues.entry(queue.to_string()).or_default();
    }

    /// Register a queue even if empty.
    pub fn add_queue(&self, queue: &str) {
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_string())
            .or_default();
    }
}

#[async_trait]
impl QueueBackend for MemoryQueueBackend {
    async fn queue_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().queues.keys().cloned().collect())
    }

    async fn queued_jobs(&self, queue: &str) -> Result<Vec<QueuedJob>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queues
            .get(queue)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.jobs.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn workers(&self) -> Result<Vec<WorkerSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .workers
            .iter()
            .map(|(name, job_id)| WorkerSnapshot {
                name: name.clone(),
                current_job: job_id
                    .as_ref()
                    .and_then(|id| state.jobs.get(id).cloned()),
            })
            .collect())
    }

    async fn failed_job_ids(&self, queue: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .failed
            .get(queue)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<QueuedJob>> {
        Ok(self.state.lock().unwrap().jobs.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(backend: MemoryQueueBackend) -> JobRegistry {
        JobRegistry::new(Arc::new(backend))
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(JobStatus::Queued.color(), "orange");
        assert_eq!(JobStatus::Started.color(), "blue");
        assert_eq!(JobStatus::Finished.color(), "green");
        assert_eq!(JobStatus::Failed.color(), "red");
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Started,
            JobStatus::Finished,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("deferred"), None);
    }

    #[test]
    fn test_job_name_resolution_chain() {
        let base = QueuedJob::new("job-1", "site1");

        let sub = base.clone().with_kwargs(json!({
            "site": "site1",
            "job_name": "generic",
            "kwargs": { "job_type": "backup", "sub_job_type": "backup_files" }
        }));
        assert_eq!(resolve_job_name(&sub), "backup_files");

        let typed = base.clone().with_kwargs(json!({
            "site": "site1",
            "job_name": "generic",
            "kwargs": { "job_type": "backup" }
        }));
        assert_eq!(resolve_job_name(&typed), "backup");

        let named = base
            .clone()
            .with_kwargs(json!({ "site": "site1", "job_name": "generic" }));
        assert_eq!(resolve_job_name(&named), "generic");

        // Empty strings are skipped, not taken
        let empty = base.clone().with_kwargs(json!({
            "site": "site1",
            "job_name": "",
            "kwargs": { "job_type": "" }
        }));
        assert_eq!(resolve_job_name(&empty), "job-1");

        assert_eq!(resolve_job_name(&base), "job-1");
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_site() {
        let backend = MemoryQueueBackend::new();
        backend.enqueue("default", QueuedJob::new("mine", "site1"));
        backend.enqueue("default", QueuedJob::new("theirs", "site2"));
        backend.enqueue("default", QueuedJob::new("untagged", "").with_kwargs(json!({})));

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_name, "mine");
    }

    #[tokio::test]
    async fn test_list_jobs_dedups_keeping_latest_status() {
        let backend = MemoryQueueBackend::new();
        backend.enqueue("default", QueuedJob::new("job-1", "site1"));
        // Same job later observed running on a worker
        backend.set_worker("worker-0", Some("job-1"));
        // set_worker removed it from the queue; re-observe both ways by
        // leaving another queued copy of the id in the scan
        backend.enqueue("default", QueuedJob::new("job-2", "site1"));

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();

        let started: Vec<_> = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Started)
            .collect();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].queue, "worker-0");
        assert_eq!(started[0].color, "blue");
        // job-1 appears exactly once
        assert_eq!(jobs.iter().filter(|j| j.queue == "worker-0").count(), 1);
        assert_eq!(jobs.len(), 2);
    }

    #[tokio::test]
    async fn test_queued_then_started_yields_single_started_entry() {
        // A job visible both as queued and as running must not appear twice.
        let backend = MemoryQueueBackend::new();
        backend.enqueue("default", QueuedJob::new("job-1", "site1"));
        {
            // Simulate a backend that still reports the job queued after a
            // worker picked it up (the race list_jobs must tolerate)
            let mut state = backend.state.lock().unwrap();
            state
                .workers
                .insert("worker-0".to_string(), Some("job-1".to_string()));
        }
        {
            let mut state = backend.state.lock().unwrap();
            if let Some(job) = state.jobs.get_mut("job-1") {
                job.status = JobStatus::Started;
            }
        }

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Started);
    }

    #[tokio::test]
    async fn test_failed_jobs_only_when_requested() {
        let backend = MemoryQueueBackend::new();
        backend.fail(
            "default",
            QueuedJob::new("boom", "site1")
                .with_status(JobStatus::Failed)
                .with_exc_info("Traceback: division by zero"),
        );

        let ctx = SiteContext::new("site1");
        let reader = registry(backend);

        let without = reader.list_jobs(&ctx, false).await.unwrap();
        assert!(without.is_empty());

        let with = reader.list_jobs(&ctx, true).await.unwrap();
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].status, JobStatus::Failed);
        assert_eq!(with[0].color, "red");
        assert!(with[0].exc_info.as_deref().unwrap().contains("division"));
    }

    #[tokio::test]
    async fn test_failed_queue_skipped_in_queued_scan() {
        let backend = MemoryQueueBackend::new();
        backend.enqueue("failed", QueuedJob::new("legacy", "site1"));

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_kwargs_still_listed_best_effort() {
        let backend = MemoryQueueBackend::new();
        // site tag present but everything else junk
        backend.enqueue(
            "default",
            QueuedJob::new("weird", "site1")
                .with_kwargs(json!({ "site": "site1", "kwargs": [1, 2, 3] })),
        );

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();
        assert_eq!(jobs.len(), 1);
        // Falls back to the job id
        assert_eq!(jobs[0].job_name, "weird");
    }

    #[tokio::test]
    async fn test_view_serialization_skips_absent_exc_info() {
        let backend = MemoryQueueBackend::new();
        backend.enqueue("default", QueuedJob::new("job-1", "site1"));

        let ctx = SiteContext::new("site1");
        let jobs = registry(backend).list_jobs(&ctx, false).await.unwrap();
        let json = serde_json::to_string(&jobs[0]).unwrap();
        assert!(json.contains("\"status\":\"queued\""));
        assert!(json.contains("\"color\":\"orange\""));
        assert!(!json.contains("exc_info"));
    }
}
