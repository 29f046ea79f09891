//! Process-startup configuration for a buffer pool. Loaded once via the
//! layered `config` crate (defaults, then an optional TOML file, then
//! environment variables) and treated as immutable for the pool's lifetime —
//! there is no persisted state owned by this crate (§1 Non-goals).

use crate::common::constants::{DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE};
use crate::common::error::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacerPolicy {
    Lru,
    Clock,
}

impl Default for ReplacerPolicy {
    fn default() -> Self {
        ReplacerPolicy::Lru
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub replacer_policy: ReplacerPolicy,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            replacer_policy: ReplacerPolicy::default(),
        }
    }
}

impl PoolConfig {
    /// Loads configuration from, in increasing precedence: compiled-in
    /// defaults, an optional TOML file at `path` (silently skipped if
    /// absent), then environment variables prefixed `BUFFERPOOL__` (e.g.
    /// `BUFFERPOOL__POOL_SIZE=128`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let builder = config::Config::builder()
            .set_default("pool_size", DEFAULT_POOL_SIZE as i64)?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("replacer_policy", "lru")?
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("BUFFERPOOL").separator("__"));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.replacer_policy, ReplacerPolicy::Lru);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_is_absent() {
        let config = PoolConfig::load("/nonexistent/bufferpool.toml").unwrap();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }
}
