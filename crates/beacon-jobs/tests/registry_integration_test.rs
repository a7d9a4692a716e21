//! Integration test for job listings over the in-memory backend: a
//! multi-tenant queue with live workers and a failed registry, read through
//! the public registry API.

use std::sync::Arc;

use beacon_core::SiteContext;
use beacon_jobs::{JobRegistry, JobStatus, MemoryQueueBackend, QueuedJob};
use serde_json::json;

#[tokio::test]
async fn test_multi_tenant_listing_with_workers_and_failures() {
    let backend = MemoryQueueBackend::new();

    // site1: one queued job with a friendly name, one picked up by a worker
    backend.enqueue(
        "default",
        QueuedJob::new("j1", "site1").with_kwargs(json!({
            "site": "site1",
            "kwargs": { "job_type": "send_mail" }
        })),
    );
    backend.enqueue("default", QueuedJob::new("j2", "site1"));
    backend.set_worker("worker-0", Some("j2"));

    // site2: queued job that must never appear in site1's listing
    backend.enqueue("default", QueuedJob::new("j3", "site2"));

    // site1: a failed job in the failed registry
    backend.fail(
        "default",
        QueuedJob::new("j4", "site1")
            .with_status(JobStatus::Failed)
            .with_exc_info("Traceback: boom"),
    );

    let registry = JobRegistry::new(Arc::new(backend));
    let ctx = SiteContext::new("site1");

    let jobs = registry.list_jobs(&ctx, true).await.unwrap();
    assert_eq!(jobs.len(), 3);

    let queued = jobs.iter().find(|j| j.job_name == "send_mail").unwrap();
    assert_eq!(queued.status, JobStatus::Queued);
    assert_eq!(queued.color, "orange");

    // j2 shows once, with the worker-side started status winning
    let started: Vec<_> = jobs.iter().filter(|j| j.job_name == "j2").collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].status, JobStatus::Started);
    assert_eq!(started[0].color, "blue");

    let failed = jobs.iter().find(|j| j.job_name == "j4").unwrap();
    assert_eq!(failed.color, "red");
    assert_eq!(failed.exc_info.as_deref(), Some("Traceback: boom"));

    // Without the failed registry, only live jobs appear
    let live = registry.list_jobs(&ctx, false).await.unwrap();
    assert_eq!(live.len(), 2);
    assert!(live.iter().all(|j| j.status != JobStatus::Failed));
}
