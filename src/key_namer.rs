//! Key namespacing and glob-pattern compilation (§4.B).

use regex::Regex;

use crate::error::{CacheError, Result};

/// Prefixes user keys with an instance name and compiles the glob-style
/// patterns accepted by pattern deletes (`*`, `?`) into anchored regexes.
#[derive(Debug, Clone)]
pub struct KeyNamer {
    name: String,
}

impl KeyNamer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Namespaced storage key: `"{name}::{key}"`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn real(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".to_string()));
        }
        Ok(format!("{}::{key}", self.name))
    }

    /// Unprefixed storage key, for global (cross-instance) entries.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn global(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key must not be empty".to_string()));
        }
        Ok(key.to_string())
    }

    /// Resolve a storage key honoring `is_global`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn resolve(&self, key: &str, is_global: bool) -> Result<String> {
        if is_global {
            self.global(key)
        } else {
            self.real(key)
        }
    }

    /// Compile a glob pattern (only `*` and `?` are special) to an anchored
    /// regex. Character classes are not supported, matching the source
    /// behavior this is grounded on (see `SPEC_FULL.md` §9).
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the compiled regex is invalid, which
    /// should not happen for any pattern built purely from `*`/`?` plus
    /// escaped literals.
    pub fn compile_pattern(pattern: &str) -> Result<Regex> {
        let mut out = String::with_capacity(pattern.len() * 2 + 2);
        out.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => out.push_str("(.*)"),
                '?' => out.push_str("(.?)"),
                other => out.push_str(&regex::escape(&other.to_string())),
            }
        }
        out.push('$');
        Regex::new(&out).map_err(|e| CacheError::InvalidArgument(format!("bad pattern {pattern}: {e}")))
    }
}
