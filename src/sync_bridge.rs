//! Remote-to-local coherence via keyspace-event subscription (§4.F).
//!
//! The background-task shape (spawn, reconnect-with-backoff on stream
//! error, `tokio::select!` against a shutdown signal) is carried over
//! almost directly from the teacher's
//! `invalidation.rs::InvalidationSubscriber::run_subscriber_loop`. What
//! differs is *what* triggers a local write: the teacher reacts to an
//! application-level JSON envelope published on one fixed channel; this
//! reacts to the server's own `__keyspace@0__:*` notifications and only
//! for keys this instance has explicitly registered via `syncOn`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::codec::{decode_object, decode_primitive};
use crate::key_lock_queue::KeyLockQueue;
use crate::local_store::{CachedValue, LocalStore};
use crate::remote::RemoteBackend;

/// Keeps the local tier current for every key registered via [`syncOn`].
///
/// [`syncOn`]: SyncBridge::sync_on
pub struct SyncBridge {
    registered: DashSet<String>,
    lock_queue: Arc<KeyLockQueue>,
    shutdown_tx: broadcast::Sender<()>,
    started: AtomicBool,
}

impl SyncBridge {
    #[must_use]
    pub fn new(lock_queue: Arc<KeyLockQueue>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: DashSet::new(),
            lock_queue,
            shutdown_tx,
            started: AtomicBool::new(false),
        }
    }

    /// Mark `key` (the full storage key) as subscribed to change events.
    pub fn sync_on(&self, key: &str) {
        self.registered.insert(key.to_string());
    }

    /// Stop syncing `key`.
    pub fn sync_off(&self, key: &str) {
        self.registered.remove(key);
    }

    /// Start the background subscriber task, once, the first time a
    /// `BOTH`-level write happens on this instance (§4.F Startup).
    pub fn ensure_started(self: &Arc<Self>, remote: Arc<dyn RemoteBackend>, local: Arc<LocalStore>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(remote, local).await;
        });
    }

    async fn run(&self, remote: Arc<dyn RemoteBackend>, local: Arc<LocalStore>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("sync bridge shutting down");
                return;
            }

            if let Err(e) = remote.enable_keyspace_notifications().await {
                warn!(error = %e, "failed to enable keyspace notifications, retrying in 5s");
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_secs(5)) => continue,
                    _ = shutdown_rx.recv() => return,
                }
            }

            match self.run_once(remote.as_ref(), &local, &mut shutdown_rx).await {
                Ok(()) => return,
                Err(e) => {
                    error!(error = %e, "sync bridge subscription error, reconnecting in 5s");
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_secs(5)) => {}
                        _ = shutdown_rx.recv() => return,
                    }
                }
            }
        }
    }

    async fn run_once(
        &self,
        remote: &dyn RemoteBackend,
        local: &Arc<LocalStore>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        use futures_util::StreamExt;

        let mut events = remote.subscribe_keyspace_events().await?;
        info!("sync bridge subscribed to keyspace events");

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        anyhow::bail!("keyspace event stream ended");
                    };
                    if !self.registered.contains(&event.key) {
                        continue;
                    }

                    // §9 open question, resolved: lock on the affected key
                    // itself, not a caller-side key, since nothing on the
                    // call path is blocked waiting for this event.
                    let guard = self.lock_queue.acquire(&event.key).await;
                    self.apply(remote, local, &event.key, &event.action).await;
                    drop(guard);
                }
                _ = shutdown_rx.recv() => return Ok(()),
            }
        }
    }

    async fn apply(&self, remote: &dyn RemoteBackend, local: &LocalStore, key: &str, action: &str) {
        match action {
            "set" => match remote.get(key).await {
                Ok(Some(raw)) => {
                    let value = decode_primitive(&raw, true);
                    local.put(key, CachedValue::Primitive(value), 0).await;
                    debug!(key = %key, "[sync] refreshed primitive from remote");
                }
                Ok(None) => local.delete(key).await,
                Err(e) => warn!(key = %key, error = %e, "[sync] failed to refresh primitive"),
            },
            "hset" => match remote.hgetall(key).await {
                Ok(fields) if !fields.is_empty() => {
                    let value = decode_object(fields, true);
                    local.put(key, CachedValue::Object(value), 0).await;
                    debug!(key = %key, "[sync] refreshed object from remote");
                }
                Ok(_) => local.delete(key).await,
                Err(e) => warn!(key = %key, error = %e, "[sync] failed to refresh object"),
            },
            "del" => {
                local.delete(key).await;
                debug!(key = %key, "[sync] removed local entry after remote delete");
            }
            _ => {}
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
