//! Remote Client Facade (§4.D): a single trait covering both single-node
//! and cluster Redis topologies, so the engine and the sync bridge never
//! need to know which one they're talking to.

pub mod cluster;
pub mod single;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;

use crate::error::Result;

/// What to write atomically alongside an optional TTL (§6.2 `MULTI` pipeline).
#[derive(Debug, Clone)]
pub enum WritePayload {
    Scalar(String),
    Hash(BTreeMap<String, String>),
}

/// A parsed keyspace-notification event (§4.F, §6.2).
#[derive(Debug, Clone)]
pub struct KeyspaceEvent {
    /// The key the event concerns, already stripped of the
    /// `__keyspace@0__:` channel prefix.
    pub key: String,
    /// The action string delivered as the message payload (`set`, `hset`,
    /// `del`, or anything else the server chooses to emit).
    pub action: String,
}

pub type KeyspaceEventStream = BoxStream<'static, KeyspaceEvent>;

/// Everything the Cache Engine and Sync Bridge need from the remote tier.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>>;

    /// Atomically `DEL` the key, write `payload`, and (if `ttl_secs` is
    /// `Some` and positive) `EXPIRE` it, all inside one `MULTI/EXEC`.
    async fn write_atomic(&self, key: &str, payload: WritePayload, ttl_secs: Option<i64>) -> Result<()>;

    /// Bulk delete; returns the number of keys actually removed.
    async fn del(&self, keys: &[String]) -> Result<usize>;

    /// One `SCAN` iteration. Callers loop until the returned cursor is `0`.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Ask the server to emit keyspace notifications (`notify-keyspace-events KEA`).
    async fn enable_keyspace_notifications(&self) -> Result<()>;

    /// Open (or reuse) the subscription connection and start listening to
    /// `__keyspace@0__:*`. Returns a stream of parsed events.
    async fn subscribe_keyspace_events(&self) -> Result<KeyspaceEventStream>;

    async fn quit(&self);
}
