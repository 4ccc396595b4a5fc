//! Single-node Redis backend, grounded almost directly on the teacher's
//! `backends/redis_cache.rs` (`ConnectionManager` construction, `PING`
//! health check, `SCAN` cursor loop, `set_ex`/`del` call sites).

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::options::SingleNodeOptions;

use super::{KeyspaceEvent, KeyspaceEventStream, RemoteBackend, WritePayload};

/// A single Redis node reachable via `ConnectionManager` for ordinary
/// commands, plus a plain `Client` kept around to open a dedicated
/// subscription connection lazily (a subscribed connection can't also run
/// ordinary commands, so the two must stay separate).
pub struct SingleNodeBackend {
    conn: ConnectionManager,
    client: Client,
}

impl SingleNodeBackend {
    /// # Errors
    /// Returns `BackendUnavailable` if the client can't be built or the
    /// initial connection/health check fails.
    pub async fn connect(opts: &SingleNodeOptions) -> Result<Self> {
        let url = format!("redis://{}:{}", opts.host, opts.port);
        info!(redis_url = %url, "connecting single-node remote tier");

        let client = Client::open(url.as_str())
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;

        let mut ping_conn = conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut ping_conn)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;

        info!(redis_url = %url, "single-node remote tier connected");
        Ok(Self { conn, client })
    }
}

#[async_trait]
impl RemoteBackend for SingleNodeBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: BTreeMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        Ok(fields)
    }

    async fn write_atomic(&self, key: &str, payload: WritePayload, ttl_secs: Option<i64>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        match payload {
            WritePayload::Scalar(ref v) => {
                pipe.set(key, v).ignore();
            }
            WritePayload::Hash(ref fields) => {
                let flat: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                pipe.hset_multiple(key, &flat).ignore();
            }
        }
        if let Some(ttl) = ttl_secs.filter(|t| *t > 0) {
            pipe.expire(key, ttl).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        debug!(key = %key, "[remote] atomic write");
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let count: usize = conn
            .del(keys)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        Ok(count)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        Ok((next, keys))
    }

    async fn enable_keyspace_notifications(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("KEA")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        Ok(())
    }

    async fn subscribe_keyspace_events(&self) -> Result<KeyspaceEventStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        pubsub
            .psubscribe("__keyspace@0__:*")
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let channel = msg.get_channel_name();
            let key = channel.strip_prefix("__keyspace@0__:")?.to_string();
            let action: String = match msg.get_payload() {
                Ok(a) => a,
                Err(e) => {
                    warn!(error = %e, "failed to read keyspace event payload");
                    return None;
                }
            };
            Some(KeyspaceEvent { key, action })
        });
        Ok(Box::pin(stream))
    }

    async fn quit(&self) {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok();
        if let Some(conn) = conn.as_mut() {
            let _: std::result::Result<(), _> = redis::cmd("QUIT").query_async(conn).await;
        }
    }
}
