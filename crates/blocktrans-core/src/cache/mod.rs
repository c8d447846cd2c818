//! Memo of block translations, shared by every run of one process.
//!
//! Only successful translations are stored. Nothing is persisted.

mod memory;
mod key;

pub use memory::MemoryCache;
pub use key::CacheKey;

use crate::config::CacheConfig;

/// Translation memo; a no-op when disabled in config.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct TranslationCache {
    memory: Option<MemoryCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let memory = config
            .memory_enabled
            .then(|| MemoryCache::new(config.memory_max_entries, config.memory_ttl_seconds));

        Self { memory }
    }

    /// A cache that never stores anything.
    pub const fn disabled() -> Self {
        Self { memory: None }
    }

    pub const fn is_enabled(&self) -> bool {
        self.memory.is_some()
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        match self.memory {
            Some(ref memory) => memory.get(key.as_str()).await,
            None => None,
        }
    }

    /// Store a translation in cache
    pub async fn insert(&self, key: &CacheKey, value: String) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.to_string(), value).await;
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn key(text: &str) -> CacheKey {
        CacheKey::new(text, "Google", &Lang::new("en"), &Lang::new("id"))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = TranslationCache::new(&CacheConfig::default());
        assert!(cache.get(&key("Hello")).await.is_none());

        cache.insert(&key("Hello"), "Halo".to_string()).await;
        assert_eq!(cache.get(&key("Hello")).await.as_deref(), Some("Halo"));
        assert!(cache.get(&key("World")).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let config = CacheConfig {
            memory_enabled: false,
            ..CacheConfig::default()
        };
        let cache = TranslationCache::new(&config);
        assert!(!cache.is_enabled());

        cache.insert(&key("Hello"), "Halo".to_string()).await;
        assert!(cache.get(&key("Hello")).await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = TranslationCache::new(&CacheConfig::default());
        cache.insert(&key("Hello"), "Halo".to_string()).await;
        cache.clear();
        assert!(cache.get(&key("Hello")).await.is_none());
    }
}
