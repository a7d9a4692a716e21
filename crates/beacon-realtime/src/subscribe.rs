//! Subscription authorization for the websocket gateway.
//!
//! The gateway asks, before joining a client to a doc/doctype room, whether
//! the session user may read the underlying document. Permission checking and
//! session storage live outside this subsystem, so both are trait seams here.

use async_trait::async_trait;
use serde::Serialize;

use beacon_core::{Error, Result, SiteContext};

/// Fallback identity for unauthenticated sessions.
pub const GUEST_USER: &str = "Guest";

/// Read-permission oracle (external collaborator).
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Whether `user` may read `doctype`, optionally narrowed to one document.
    async fn can_read(
        &self,
        site: &str,
        user: &str,
        doctype: &str,
        docname: Option<&str>,
    ) -> Result<bool>;
}

/// Resolved session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub user: String,
    pub user_type: String,
}

/// Session resumption by sid (external collaborator).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resume a session and return its identity.
    async fn resume(&self, site: &str, sid: &str) -> Result<SessionInfo>;
}

/// Authorize subscribing to a single document's room.
pub async fn can_subscribe_doc(
    ctx: &SiteContext,
    perms: &dyn PermissionChecker,
    doctype: &str,
    docname: &str,
) -> Result<()> {
    let user = ctx.user().unwrap_or(GUEST_USER);
    if perms
        .can_read(ctx.site(), user, doctype, Some(docname))
        .await?
    {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "{user} cannot read {doctype}/{docname}"
        )))
    }
}

/// Authorize subscribing to a doctype's list room.
pub async fn can_subscribe_doctype(
    ctx: &SiteContext,
    perms: &dyn PermissionChecker,
    doctype: &str,
) -> Result<()> {
    let user = ctx.user().unwrap_or(GUEST_USER);
    if perms.can_read(ctx.site(), user, doctype, None).await? {
        Ok(())
    } else {
        Err(Error::Forbidden(format!("{user} cannot read {doctype}")))
    }
}

/// Resolve the identity behind a session id, for the gateway's handshake.
pub async fn user_info(
    ctx: &SiteContext,
    sessions: &dyn SessionStore,
    sid: &str,
) -> Result<SessionInfo> {
    sessions.resume(ctx.site(), sid).await
}
