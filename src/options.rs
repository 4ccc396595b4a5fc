//! Options and small value types shared across the public API.

use std::ops::BitOr;

/// Which tier(s) an operation targets.
///
/// Backed by a two-bit set so `level & tier == tier` answers "does this
/// level touch that tier" without a match arm per combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLevel(u8);

impl TierLevel {
    pub const LOCAL: TierLevel = TierLevel(0b01);
    pub const REMOTE: TierLevel = TierLevel(0b10);
    pub const BOTH: TierLevel = TierLevel(0b11);

    #[must_use]
    pub fn includes_local(self) -> bool {
        self.0 & Self::LOCAL.0 != 0
    }

    #[must_use]
    pub fn includes_remote(self) -> bool {
        self.0 & Self::REMOTE.0 != 0
    }

    #[must_use]
    pub fn is_both(self) -> bool {
        self == Self::BOTH
    }
}

impl BitOr for TierLevel {
    type Output = TierLevel;

    fn bitor(self, rhs: Self) -> Self::Output {
        TierLevel(self.0 | rhs.0)
    }
}

/// A present-or-absent result, used in place of `Option` so callers can't
/// confuse "value is `None`" with "value wasn't found" (the cache never
/// stores `null`, see [`crate::error::CacheError::InvalidArgument`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Present(T),
    Absent,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Present(v) => Some(v),
            Lookup::Absent => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Present(v) => Lookup::Present(f(v)),
            Lookup::Absent => Lookup::Absent,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Lookup::Present(v),
            None => Lookup::Absent,
        }
    }
}

/// A single endpoint for a single-node Redis connection.
#[derive(Debug, Clone)]
pub struct SingleNodeOptions {
    pub host: String,
    pub port: u16,
}

impl Default for SingleNodeOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
        }
    }
}

/// A single endpoint contributing to a cluster client.
#[derive(Debug, Clone)]
pub struct ClusterNodeOptions {
    pub host: String,
    pub port: u16,
}

/// Construction options for [`crate::CacheProvider`].
///
/// Exactly one of `single` / `cluster` should be set; if both are `None`
/// the provider runs in local-only mode (no remote tier, see
/// `SPEC_FULL.md` §3 Lifecycle).
#[derive(Debug, Clone, Default)]
pub struct CacheProviderOptions {
    /// Namespace prefix applied to every non-global key.
    pub name: String,
    pub single: Option<SingleNodeOptions>,
    pub cluster: Option<Vec<ClusterNodeOptions>>,
}

impl CacheProviderOptions {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            single: None,
            cluster: None,
        }
    }

    #[must_use]
    pub fn with_single(mut self, host: impl Into<String>, port: u16) -> Self {
        self.single = Some(SingleNodeOptions {
            host: host.into(),
            port,
        });
        self
    }

    #[must_use]
    pub fn with_cluster(mut self, nodes: Vec<ClusterNodeOptions>) -> Self {
        self.cluster = Some(nodes);
        self
    }
}

/// Options accepted by `set_primitive` / `set_array` / `set_object`.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// TTL in seconds; `0` or negative means "never expires".
    pub duration_secs: i64,
    /// Which tier(s) to write. `None` defers to the engine's default rule
    /// (REMOTE if a remote client exists, else LOCAL).
    pub level: Option<TierLevel>,
    /// Store under the raw key, bypassing the instance name prefix.
    pub is_global: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            duration_secs: 0,
            level: None,
            is_global: false,
        }
    }
}

/// Options accepted by `get_primitive` / `get_array` / `get_object`.
#[derive(Debug, Clone, Copy)]
pub struct GetOptions {
    /// Skip the local tier and always read from remote.
    pub force_remote: bool,
    /// When fetching remotely, attempt to parse scalars back to their
    /// native type instead of returning the raw string.
    pub parse_type: bool,
    pub is_global: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            force_remote: false,
            parse_type: true,
            is_global: false,
        }
    }
}

/// Options accepted by `delete`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Treat the key as a glob pattern (`*`, `?`) instead of a literal key.
    pub is_pattern: bool,
    /// Ignored when `is_pattern` is set; the caller owns prefixing for patterns.
    pub is_global: bool,
}
