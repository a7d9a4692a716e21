//! Broker abstraction and implementations.
//!
//! The realtime layer talks to its pub/sub broker and keyed durable store
//! through the [`EventBroker`] trait. Production uses [`RedisBroker`];
//! [`MemoryBroker`] is an in-process implementation for tests and single-node
//! development, with a switchable fail mode to simulate outages.
//!
//! The broker client is constructed explicitly and injected into whichever
//! component owns the process lifecycle — there is no hidden on-demand
//! singleton.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use beacon_core::defaults::{BROKER_TIMEOUT_SECS, BROKER_URL, ENV_BROKER_URL};
use beacon_core::{Error, Result};

/// Pub/sub broker plus keyed durable store for task logs.
///
/// `publish` errors mean the broker is unreachable; callers on the live-push
/// path swallow them. `log_line` errors must surface — losing a durable log
/// line is a worse failure than losing a live push.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Publish a serialized payload on a channel.
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;

    /// Append one line to a task-log hash and reset the key's TTL.
    ///
    /// The TTL is sliding: every append pushes expiry out to `ttl_secs` from
    /// now, not from the first write.
    async fn log_line(&self, key: &str, line_no: u64, line: &str, ttl_secs: u64) -> Result<()>;

    /// Fetch all stored lines for a task-log key, ordered by line number.
    async fn log_lines(&self, key: &str) -> Result<BTreeMap<u64, String>>;
}

// =============================================================================
// REDIS
// =============================================================================

/// Redis-backed [`EventBroker`] using a shared connection manager.
///
/// The connection manager handles reconnection internally and is cloned per
/// call, so concurrent publishes need no external locking.
#[derive(Clone)]
pub struct RedisBroker {
    conn: ConnectionManager,
    publish_timeout: Duration,
}

impl RedisBroker {
    /// Connect to the broker at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url = %url, "connected to realtime broker");
        Ok(Self {
            conn,
            publish_timeout: Duration::from_secs(BROKER_TIMEOUT_SECS),
        })
    }

    /// Connect using `BEACON_BROKER_URL`, falling back to the default URL.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_BROKER_URL).unwrap_or_else(|_| BROKER_URL.to_string());
        Self::connect(&url).await
    }

    /// Override the per-publish timeout.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }
}

#[async_trait]
impl EventBroker for RedisBroker {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        match tokio::time::timeout(
            self.publish_timeout,
            conn.publish::<_, _, ()>(channel, payload),
        )
        .await
        {
            Ok(res) => Ok(res?),
            Err(_) => Err(Error::Internal(format!(
                "broker publish timed out after {:?}",
                self.publish_timeout
            ))),
        }
    }

    async fn log_line(&self, key: &str, line_no: u64, line: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .hset(key, line_no, line)
            .ignore()
            .expire(key, ttl_secs as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    async fn log_lines(&self, key: &str) -> Result<BTreeMap<u64, String>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let mut lines = BTreeMap::new();
        for (field, value) in raw {
            match field.parse::<u64>() {
                Ok(n) => {
                    lines.insert(n, value);
                }
                Err(_) => warn!(key = %key, field = %field, "skipping non-numeric log field"),
            }
        }
        Ok(lines)
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// In-process [`EventBroker`] for tests and single-node development.
///
/// Records every publish and log append. [`MemoryBroker::set_down`] simulates
/// a broker outage: publishes fail until the broker is brought back up.
#[derive(Default)]
pub struct MemoryBroker {
    published: Mutex<Vec<(String, String)>>,
    logs: Mutex<HashMap<String, BTreeMap<u64, String>>>,
    down: AtomicBool,
    store_down: AtomicBool,
}

impl MemoryBroker {
    /// Create an empty in-memory broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage of the pub/sub side.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Simulate an outage of the keyed store side.
    pub fn set_store_down(&self, down: bool) {
        self.store_down.store(down, Ordering::SeqCst);
    }

    /// All `(channel, payload)` pairs published so far, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publishes recorded.
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Stored lines for a task-log key.
    pub fn stored(&self, key: &str) -> BTreeMap<u64, String> {
        self.logs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventBroker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Internal("broker unavailable".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }

    async fn log_line(&self, key: &str, line_no: u64, line: &str, _ttl_secs: u64) -> Result<()> {
        if self.store_down.load(Ordering::SeqCst) {
            return Err(Error::Store("store unavailable".to_string()));
        }
        self.logs
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(line_no, line.to_string());
        Ok(())
    }

    async fn log_lines(&self, key: &str) -> Result<BTreeMap<u64, String>> {
        Ok(self.stored(key))
    }
}
