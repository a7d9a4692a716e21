//! Pending-task lookup for a document.
//!
//! Clients polling a document view want the ids of tasks still queued or
//! running against it. The task records live in the document store, which is
//! an external collaborator — hence a trait seam.

use async_trait::async_trait;

use beacon_core::{Result, SiteContext};

/// Directory of async task records (external collaborator: document store).
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Ids of tasks in a queued or running state that reference the given
    /// document.
    async fn pending_task_ids(
        &self,
        site: &str,
        doctype: &str,
        docname: &str,
    ) -> Result<Vec<String>>;
}

/// Whitelisted read endpoint: pending task ids for one document.
pub async fn pending_tasks_for_doc(
    ctx: &SiteContext,
    directory: &dyn TaskDirectory,
    doctype: &str,
    docname: &str,
) -> Result<Vec<String>> {
    directory
        .pending_task_ids(ctx.site(), doctype, docname)
        .await
}
