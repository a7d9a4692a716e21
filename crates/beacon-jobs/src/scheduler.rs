//! Scheduler liveness status.
//!
//! The desk shows whether a site's scheduler is alive. Liveness is probed
//! through a trait; the Redis probe checks the per-site heartbeat key the
//! scheduler refreshes with a TTL.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;

use beacon_core::defaults::SCHEDULER_HEARTBEAT_PREFIX;
use beacon_core::{Error, Result, SiteContext};

/// Liveness oracle for a site's scheduler.
#[async_trait]
pub trait SchedulerProbe: Send + Sync {
    /// Whether the scheduler for `site` has stopped heartbeating.
    async fn is_inactive(&self, site: &str) -> Result<bool>;
}

/// Display status of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub status: String,
    pub color: String,
}

/// Whitelisted read endpoint: scheduler liveness for the caller's site.
pub async fn scheduler_status(
    ctx: &SiteContext,
    probe: &dyn SchedulerProbe,
) -> Result<SchedulerStatus> {
    if probe.is_inactive(ctx.site()).await? {
        Ok(SchedulerStatus {
            status: "inactive".to_string(),
            color: "red".to_string(),
        })
    } else {
        Ok(SchedulerStatus {
            status: "active".to_string(),
            color: "green".to_string(),
        })
    }
}

/// Redis heartbeat probe: the scheduler refreshes
/// `scheduler:heartbeat:{site}` with a TTL; a missing key means inactive.
#[derive(Clone)]
pub struct RedisSchedulerProbe {
    conn: ConnectionManager,
}

impl RedisSchedulerProbe {
    /// Connect to the broker holding heartbeat keys.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SchedulerProbe for RedisSchedulerProbe {
    async fn is_inactive(&self, site: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let alive: bool = conn
            .exists(format!("{SCHEDULER_HEARTBEAT_PREFIX}{site}"))
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        Ok(!alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe {
        inactive: bool,
    }

    #[async_trait]
    impl SchedulerProbe for FixedProbe {
        async fn is_inactive(&self, _site: &str) -> Result<bool> {
            Ok(self.inactive)
        }
    }

    #[tokio::test]
    async fn test_active_scheduler_is_green() {
        let ctx = SiteContext::new("site1");
        let status = scheduler_status(&ctx, &FixedProbe { inactive: false })
            .await
            .unwrap();
        assert_eq!(status.status, "active");
        assert_eq!(status.color, "green");
    }

    #[tokio::test]
    async fn test_inactive_scheduler_is_red() {
        let ctx = SiteContext::new("site1");
        let status = scheduler_status(&ctx, &FixedProbe { inactive: true })
            .await
            .unwrap();
        assert_eq!(status.status, "inactive");
        assert_eq!(status.color, "red");
    }
}
