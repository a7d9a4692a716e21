//! Explicit request/task context.
//!
//! Every publishing and introspection operation takes a [`SiteContext`] as an
//! argument instead of reading hidden thread-local state. The context carries
//! the tenant (site), the session user if any, and the ambient task id when
//! running inside a background job.

/// Per-request / per-task context threaded through every call.
///
/// A context is cheap to clone and is typically built once at the edge
/// (HTTP dispatch or job start) and handed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    site: String,
    user: Option<String>,
    task_id: Option<String>,
}

impl SiteContext {
    /// Create a context for the given site with no user or task.
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            user: None,
            task_id: None,
        }
    }

    /// Attach the session user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Attach the ambient task id (set when executing inside a background job).
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// The tenant this context belongs to.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// The session user, if authenticated.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The ambient task id, if running inside a background job.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }
}
