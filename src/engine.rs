//! The Cache Engine (§4.G): the operations behind the public
//! [`crate::CacheProvider`] surface, wiring together the Key Namer, Local
//! Store, Remote Client Facade, Key Lock Queue, and Sync Bridge.
//!
//! Grounded on the teacher's `lib.rs` (`CacheSystem`, a thin `Clone`
//! wrapper over `Arc`-shared sub-components) and `cache_manager.rs`
//! (`CacheManager<C> { inner: Arc<CacheManagerInner<C>> }`): the same
//! cheap-clone-over-shared-inner shape, pared down to the three shapes and
//! one tier pair this spec actually needs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use crate::codec::{decode_array, decode_object, decode_primitive, encode_array, encode_primitive, CacheObject, Primitive};
use crate::error::{CacheError, Result};
use crate::key_lock_queue::KeyLockQueue;
use crate::key_namer::KeyNamer;
use crate::local_store::{CachedValue, LocalStore};
use crate::options::{CacheProviderOptions, DeleteOptions, GetOptions, Lookup, SetOptions, TierLevel};
use crate::remote::cluster::ClusterBackend;
use crate::remote::single::SingleNodeBackend;
use crate::remote::{RemoteBackend, WritePayload};
use crate::sync_bridge::SyncBridge;

/// Redis `SCAN` batch size used by pattern deletes (§6.2).
const SCAN_COUNT: usize = 10;

struct Inner {
    key_namer: KeyNamer,
    local: Arc<LocalStore>,
    remote: Option<Arc<dyn RemoteBackend>>,
    lock_queue: Arc<KeyLockQueue>,
    sync_bridge: Arc<SyncBridge>,
    disposed: AtomicBool,
}

/// A two-tier cache handle. Cheap to clone; every clone shares the same
/// local store, remote connection(s), and background sync task.
#[derive(Clone)]
pub struct CacheProvider {
    inner: Arc<Inner>,
}

impl CacheProvider {
    /// Build a provider per `opts` (§3 Lifecycle). With neither `single`
    /// nor `cluster` set the provider runs local-only: no remote client is
    /// created and every op is restricted to the local tier regardless of
    /// the requested level.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if a remote client/connection can't be
    /// established, and `InvalidArgument` if `opts.name` is empty.
    pub async fn new(opts: CacheProviderOptions) -> Result<Self> {
        if opts.name.is_empty() {
            return Err(CacheError::InvalidArgument("instance name must not be empty".to_string()));
        }

        let remote: Option<Arc<dyn RemoteBackend>> = if let Some(nodes) = &opts.cluster {
            Some(Arc::new(ClusterBackend::connect(nodes).await?))
        } else if let Some(single) = &opts.single {
            Some(Arc::new(SingleNodeBackend::connect(single).await?))
        } else {
            None
        };

        let lock_queue = Arc::new(KeyLockQueue::new());
        let sync_bridge = Arc::new(SyncBridge::new(Arc::clone(&lock_queue)));

        Ok(Self {
            inner: Arc::new(Inner {
                key_namer: KeyNamer::new(opts.name),
                local: Arc::new(LocalStore::new()),
                remote,
                lock_queue,
                sync_bridge,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(CacheError::Disposed);
        }
        Ok(())
    }

    fn default_level(&self) -> TierLevel {
        if self.inner.remote.is_some() {
            TierLevel::REMOTE
        } else {
            TierLevel::LOCAL
        }
    }

    async fn write_remote(&self, storage_key: &str, payload: WritePayload, duration_secs: i64) -> Result<()> {
        let Some(remote) = &self.inner.remote else {
            return Ok(());
        };
        let ttl = if duration_secs > 0 { Some(duration_secs) } else { None };
        remote.write_atomic(storage_key, payload, ttl).await
    }

    fn register_sync(&self, storage_key: &str, level: TierLevel) {
        let Some(remote) = &self.inner.remote else {
            return;
        };
        if level.is_both() {
            self.inner
                .sync_bridge
                .ensure_started(Arc::clone(remote), Arc::clone(&self.inner.local));
            self.inner.sync_bridge.sync_on(storage_key);
        }
    }

    // ---- setters -------------------------------------------------------

    /// Store a scalar value under `key` (§4.G setters).
    ///
    /// # Errors
    /// `InvalidArgument` for an empty key; `BackendUnavailable` if the
    /// remote write is requested and fails.
    pub async fn set_primitive(&self, key: &str, value: Primitive, opts: SetOptions) -> Result<()> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;
        let level = opts.level.unwrap_or_else(|| self.default_level());

        if level.includes_local() {
            self.inner
                .local
                .put(&storage_key, CachedValue::Primitive(value.clone()), opts.duration_secs)
                .await;
        }
        if level.includes_remote() {
            let scalar = encode_primitive(&value);
            self.write_remote(&storage_key, WritePayload::Scalar(scalar), opts.duration_secs)
                .await?;
        }
        self.register_sync(&storage_key, level);
        Ok(())
    }

    /// Store an array under `key`. Implemented, as in the source system
    /// this was modeled on, by delegating to the primitive path with the
    /// JSON-encoded text (§4.G `setArray`); the engine tags the local copy
    /// as an array so `get_array` doesn't need to re-sniff a string.
    ///
    /// # Errors
    /// See [`CacheProvider::set_primitive`].
    pub async fn set_array(&self, key: &str, value: Vec<Json>, opts: SetOptions) -> Result<()> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;
        let level = opts.level.unwrap_or_else(|| self.default_level());

        if level.includes_local() {
            self.inner
                .local
                .put(&storage_key, CachedValue::Array(value.clone()), opts.duration_secs)
                .await;
        }
        if level.includes_remote() {
            let encoded = encode_array(&value)
                .map_err(|e| CacheError::DecodeFailure { key: storage_key.clone(), source: e })?;
            self.write_remote(&storage_key, WritePayload::Scalar(encoded), opts.duration_secs)
                .await?;
        }
        self.register_sync(&storage_key, level);
        Ok(())
    }

    /// Store an object under `key` (§4.G setters; wire encoding per §6.2 `HMSET`).
    ///
    /// # Errors
    /// See [`CacheProvider::set_primitive`].
    pub async fn set_object(&self, key: &str, value: CacheObject, opts: SetOptions) -> Result<()> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;
        let level = opts.level.unwrap_or_else(|| self.default_level());

        if level.includes_local() {
            self.inner
                .local
                .put(&storage_key, CachedValue::Object(value.clone()), opts.duration_secs)
                .await;
        }
        if level.includes_remote() {
            let fields = crate::codec::encode_object(&value);
            self.write_remote(&storage_key, WritePayload::Hash(fields), opts.duration_secs)
                .await?;
        }
        self.register_sync(&storage_key, level);
        Ok(())
    }

    // ---- getters -------------------------------------------------------

    /// Read a scalar value (§4.G getters, lookup order).
    ///
    /// # Errors
    /// `InvalidArgument` for an empty key; `BackendUnavailable` if a
    /// remote read is attempted and fails.
    pub async fn get_primitive(&self, key: &str, opts: GetOptions) -> Result<Lookup<Primitive>> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;

        if !opts.force_remote {
            match self.inner.local.get(&storage_key).await {
                Some(CachedValue::Primitive(p)) => return Ok(Lookup::Present(p)),
                // Locally resident under a different shape: the key exists,
                // just not as this one (§9 "Dynamic shape at one key"). Do
                // not fall through to a remote read with the wrong
                // shape-specific command.
                Some(_) => return Ok(Lookup::Absent),
                None => {}
            }
        }
        let Some(remote) = &self.inner.remote else {
            return Ok(Lookup::Absent);
        };
        match remote.get(&storage_key).await? {
            Some(raw) => Ok(Lookup::Present(decode_primitive(&raw, opts.parse_type))),
            None => Ok(Lookup::Absent),
        }
    }

    /// Read an array value. Always fetches remotely with `parse_type=false`
    /// and JSON-parses the result (§4.G `getArray`).
    ///
    /// # Errors
    /// `DecodeFailure` if a remotely-stored value isn't valid JSON array
    /// text; `BackendUnavailable` if the remote read fails.
    pub async fn get_array(&self, key: &str, opts: GetOptions) -> Result<Lookup<Vec<Json>>> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;

        if !opts.force_remote {
            match self.inner.local.get(&storage_key).await {
                Some(CachedValue::Array(a)) => return Ok(Lookup::Present(a)),
                Some(_) => return Ok(Lookup::Absent),
                None => {}
            }
        }
        let Some(remote) = &self.inner.remote else {
            return Ok(Lookup::Absent);
        };
        match remote.get(&storage_key).await? {
            Some(raw) => {
                let decoded = decode_array(&raw)
                    .map_err(|e| CacheError::DecodeFailure { key: storage_key.clone(), source: e })?;
                Ok(Lookup::Present(decoded))
            }
            None => Ok(Lookup::Absent),
        }
    }

    /// Read an object value (§4.G `getObject`; an empty remote hash counts
    /// as absent).
    ///
    /// # Errors
    /// `BackendUnavailable` if the remote read fails.
    pub async fn get_object(&self, key: &str, opts: GetOptions) -> Result<Lookup<CacheObject>> {
        self.ensure_alive()?;
        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;

        if !opts.force_remote {
            match self.inner.local.get(&storage_key).await {
                Some(CachedValue::Object(o)) => return Ok(Lookup::Present(o)),
                Some(_) => return Ok(Lookup::Absent),
                None => {}
            }
        }
        let Some(remote) = &self.inner.remote else {
            return Ok(Lookup::Absent);
        };
        let fields = remote.hgetall(&storage_key).await?;
        if fields.is_empty() {
            return Ok(Lookup::Absent);
        }
        Ok(Lookup::Present(decode_object(fields, opts.parse_type)))
    }

    // ---- delete ---------------------------------------------------------

    /// Delete a single key, or every key matching a glob pattern when
    /// `opts.is_pattern` is set (§4.G `delete`).
    ///
    /// # Errors
    /// `InvalidArgument` for an empty (non-pattern) key or a pattern that
    /// fails to compile; `BackendUnavailable` if remote deletion fails.
    pub async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<()> {
        self.ensure_alive()?;

        if opts.is_pattern {
            let regex = KeyNamer::compile_pattern(key)?;
            self.inner.local.delete_by_pattern(&regex).await;

            let Some(remote) = &self.inner.remote else {
                return Ok(());
            };
            let mut matched = HashSet::new();
            let mut cursor = 0u64;
            loop {
                let (next, keys) = remote.scan(cursor, key, SCAN_COUNT).await?;
                matched.extend(keys);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            if !matched.is_empty() {
                let keys: Vec<String> = matched.into_iter().collect();
                remote.del(&keys).await?;
            }
            debug!(pattern = %key, "[delete] pattern delete complete");
            return Ok(());
        }

        let storage_key = self.inner.key_namer.resolve(key, opts.is_global)?;
        self.inner.local.delete(&storage_key).await;
        self.inner.sync_bridge.sync_off(&storage_key);
        if let Some(remote) = &self.inner.remote {
            remote.del(&[storage_key]).await?;
        }
        Ok(())
    }

    /// Tear the instance down: close remote connections, stop the sync
    /// bridge, and drop all local state (§3 Lifecycle). The provider is not
    /// usable afterward.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.sync_bridge.shutdown();
        self.inner.local.clear();
        if let Some(remote) = &self.inner.remote {
            remote.quit().await;
        }
    }
}
