//! Tiered Cache
//!
//! A two-tier cache provider: a process-local in-memory store paired with
//! a Redis-family remote store, kept coherent across processes via
//! keyspace-event subscription. Consumers choose, per operation, whether a
//! value lives only locally, only remotely, or in both tiers with
//! automatic propagation of remote changes back into the local tier.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tiered_cache::{CacheProvider, CacheProviderOptions, Primitive, SetOptions, GetOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = CacheProvider::new(
//!         CacheProviderOptions::new("svc").with_single("localhost", 6379),
//!     )
//!     .await?;
//!
//!     provider
//!         .set_primitive("user:1", Primitive::String("alice".to_string()), SetOptions::default())
//!         .await?;
//!
//!     if let tiered_cache::Lookup::Present(value) =
//!         provider.get_primitive("user:1", GetOptions::default()).await?
//!     {
//!         println!("cached value: {value:?}");
//!     }
//!
//!     provider.dispose().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! caller -> Key Namer -> Local Store (LOCAL) / Remote Client (REMOTE)
//!                                      |
//!                               Sync Bridge <- keyspace events (BOTH)
//! ```

pub mod codec;
pub mod engine;
pub mod error;
pub mod key_lock_queue;
pub mod key_namer;
pub mod local_store;
pub mod options;
pub mod remote;
pub mod sync_bridge;

pub use codec::{CacheObject, Primitive};
pub use engine::CacheProvider;
pub use error::{CacheError, Result};
pub use options::{
    CacheProviderOptions, ClusterNodeOptions, DeleteOptions, GetOptions, Lookup, SetOptions,
    SingleNodeOptions, TierLevel,
};

// Re-export async_trait for anyone implementing `remote::RemoteBackend` directly.
pub use async_trait::async_trait;
