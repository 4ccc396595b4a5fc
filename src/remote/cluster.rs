//! Cluster-mode Redis backend, built on the `cluster-async` feature of the
//! `redis` crate. Command shape mirrors `single.rs`; the notable deviation
//! is keyspace subscription (see the module-level note on `subscribe_keyspace_events`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::stream::select_all;
use futures_util::StreamExt;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::options::ClusterNodeOptions;

use super::{KeyspaceEvent, KeyspaceEventStream, RemoteBackend, WritePayload};

pub struct ClusterBackend {
    conn: ClusterConnection,
    /// One plain client per configured node, used only to open keyspace-event
    /// subscriptions. `cluster-async`'s `ClusterConnection` multiplexes
    /// ordinary commands across the cluster but does not expose pub/sub, and
    /// Redis Cluster only emits a key's keyspace events from the node that
    /// owns its hash slot. Subscribing to a single node would silently miss
    /// every event for keys owned by the others, so every configured node
    /// gets its own subscription and the resulting streams are merged into
    /// one (§9 "Subscription reuse in cluster mode").
    pubsub_clients: Vec<redis::Client>,
}

impl ClusterBackend {
    /// # Errors
    /// Returns `BackendUnavailable` if the cluster client can't be built or
    /// the initial connection fails.
    pub async fn connect(nodes: &[ClusterNodeOptions]) -> Result<Self> {
        let urls: Vec<String> = nodes.iter().map(|n| format!("redis://{}:{}", n.host, n.port)).collect();
        info!(nodes = ?urls, "connecting cluster remote tier");

        let client = ClusterClient::new(urls.clone())
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        let conn = client
            .get_async_connection()
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.into()))?;

        if urls.is_empty() {
            return Err(CacheError::InvalidArgument(
                "cluster options must list at least one node".to_string(),
            ));
        }
        let pubsub_clients = urls
            .iter()
            .map(|url| redis::Client::open(url.as_str()).map_err(|e| CacheError::BackendUnavailable(e.into())))
            .collect::<Result<Vec<_>>>()?;

        info!("cluster remote tier connected");
        Ok(Self { conn, pubsub_clients })
    }
}

#[async_trait]
impl RemoteBackend for ClusterBackend {
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
        // Cluster-mode MULTI/EXEC requires every key in the transaction to
        // hash to the same slot; since this pipeline only ever touches a
        // single key, that constraint is trivially satisfied.
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
        debug!(key = %key, "[remote cluster] atomic write");
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let mut total = 0usize;
        // Cross-slot DEL isn't guaranteed atomic/batched in cluster mode;
        // issue per-key to stay correct across slots at the cost of one
        // round trip per key.
        for key in keys {
            total += conn
                .del::<_, usize>(key)
                .await
                .map_err(|e| CacheError::BackendUnavailable(e.into()))?;
        }
        Ok(total)
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
        let mut per_node_streams = Vec::with_capacity(self.pubsub_clients.len());
        for client in &self.pubsub_clients {
            let mut pubsub = client
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
            per_node_streams.push(Box::pin(stream) as KeyspaceEventStream);
        }
        Ok(Box::pin(select_all(per_node_streams)))
    }

    async fn quit(&self) {
        for client in &self.pubsub_clients {
            let mut conn = client.get_multiplexed_async_connection().await.ok();
            if let Some(conn) = conn.as_mut() {
                let _: std::result::Result<(), _> = redis::cmd("QUIT").query_async(conn).await;
            }
        }
    }
}
