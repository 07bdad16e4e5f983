use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use foyer::{Cache as FoyerCache, CacheBuilder};
use serde::Deserialize;
use thiserror::Error;

/// Size of TTL prefix (u64 timestamp).
const TTL_PREFIX_SIZE: usize = 8;

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// TTL duration string (e.g., "72h", "30m", "1d").
    #[serde(default = "default_cache_ttl")]
    pub ttl: String,

    /// Maximum number of cached responses.
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl() -> String {
    "72h".to_string()
}

fn default_cache_entries() -> usize {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid TTL format: {0}")]
    InvalidTtl(String),
}

/// In-memory cache with TTL support.
pub struct Cache {
    store: FoyerCache<String, Bytes>,
    ttl: Duration,
}

impl Cache {
    /// Create a new cache instance.
    pub fn new(cfg: &CacheConfig) -> Result<Self, CacheError> {
        let ttl = parse_duration(&cfg.ttl)?;
        let store = CacheBuilder::new(cfg.max_entries.max(1))
            .with_weighter(|_key, _value: &Bytes| 1)
            .build();

        Ok(Self { store, ttl })
    }

    /// Get a value from the cache. Returns None if not found or expired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let raw = self.store.get(key).map(|e| e.value().clone())?;

        // Need at least TTL prefix.
        if raw.len() < TTL_PREFIX_SIZE {
            return None;
        }

        // Read TTL from first 8 bytes.
        let created_at = u64::from_le_bytes(raw[..TTL_PREFIX_SIZE].try_into().ok()?);

        if now().saturating_sub(created_at) > self.ttl.as_secs() {
            return None;
        }

        Some(raw.slice(TTL_PREFIX_SIZE..))
    }

    /// Store a value in the cache with current timestamp prefix.
    pub fn put(&self, key: &str, value: &[u8]) {
        self.put_at(key, value, now());
    }

    fn put_at(&self, key: &str, value: &[u8], created_at: u64) {
        let mut buf = BytesMut::with_capacity(TTL_PREFIX_SIZE + value.len());
        buf.put_u64_le(created_at);
        buf.extend_from_slice(value);

        self.store.insert(key.to_string(), buf.freeze());
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Generate a cache key for remote suggestion lookups.
pub fn make_suggest_cache_key(input: &str, offset: usize) -> String {
    let key = format!("p:{}:{}", input, offset);
    let digest = md5::compute(key.as_bytes());
    format!("p:{:x}", digest)
}

/// Parse a duration string like "72h", "30m", "1d" into Duration.
pub fn parse_duration(s: &str) -> Result<Duration, CacheError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CacheError::InvalidTtl("empty duration".to_string()));
    }

    let (num_str, unit) = match s.char_indices().last() {
        Some((i, _)) => s.split_at(i),
        None => return Err(CacheError::InvalidTtl(s.to_string())),
    };
    let num: u64 = num_str
        .parse()
        .map_err(|_| CacheError::InvalidTtl(s.to_string()))?;

    let secs = match unit {
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => return Err(CacheError::InvalidTtl(s.to_string())),
    };

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration(" 72h ").unwrap(), Duration::from_secs(259200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("10é").is_err());
    }

    #[test]
    fn test_get_put_and_expiry() {
        let cfg = CacheConfig {
            enabled: true,
            ttl: "1h".to_string(),
            max_entries: 10,
        };
        let cache = Cache::new(&cfg).unwrap();

        assert!(cache.get("k").is_none());
        cache.put("k", b"hello");
        assert_eq!(cache.get("k").unwrap().as_ref(), b"hello");

        cache.put_at("old", b"stale", now() - 7200);
        assert!(cache.get("old").is_none());
    }

    #[test]
    fn test_cache_key() {
        let a = make_suggest_cache_key("union sq", 8);
        assert_eq!(a, make_suggest_cache_key("union sq", 8));
        assert_ne!(a, make_suggest_cache_key("union sq", 3));
        assert!(a.starts_with("p:"));
    }
}
