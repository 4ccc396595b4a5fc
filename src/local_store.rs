//! The in-process local tier (§4.C).
//!
//! Grounded on the teacher's `backends/moka_cache.rs`, but trades its
//! manual `CacheEntry::is_expired()` check (itself only a defense against
//! moka's own `time_to_live` being too coarse for per-key TTLs) for a
//! `moka::Expiry` implementation, which gives invariant 1 ("exactly one
//! pending expiration mechanism per key") directly from the library.

use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use regex::Regex;
use tracing::debug;

use crate::codec::{CacheObject, Primitive};

/// The decoded, tagged value held in the local tier.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Primitive(Primitive),
    Array(Vec<serde_json::Value>),
    Object(CacheObject),
}

#[derive(Clone)]
struct Entry {
    value: CachedValue,
    ttl: Option<Duration>,
}

struct TtlExpiry;

impl Expiry<String, Entry> for TtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _current_time: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _current_time: Instant,
        _current_duration: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-memory mapping from storage key to decoded value, per §4.C.
pub struct LocalStore {
    cache: Cache<String, Entry>,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .expire_after(TtlExpiry)
            .max_capacity(100_000)
            .build();
        Self { cache }
    }

    /// Write `value` under `key`. `duration_secs <= 0` means "no TTL".
    pub async fn put(&self, key: &str, value: CachedValue, duration_secs: i64) {
        let ttl = if duration_secs > 0 {
            Some(Duration::from_secs(duration_secs.unsigned_abs()))
        } else {
            None
        };
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
        debug!(key = %key, ttl_secs = duration_secs, "[local] wrote key");
    }

    #[must_use]
    pub async fn get(&self, key: &str) -> Option<CachedValue> {
        self.cache.get(key).await.map(|e| e.value)
    }

    pub async fn delete(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Remove every key matching `pattern` (already compiled, see
    /// `KeyNamer::compile_pattern`).
    pub async fn delete_by_pattern(&self, pattern: &Regex) {
        let matching: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| pattern.is_match(k))
            .map(|(k, _)| k.as_str().to_string())
            .collect();
        for key in matching {
            self.cache.invalidate(&key).await;
        }
    }

    /// Drop every entry, used on `dispose` (§3 Lifecycle).
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
