/// Recently searched URLs, persisted through a [`KeyValueStore`]
use crate::error::PersistenceError;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key of the persisted list
pub const HISTORY_KEY: &str = "search_history";

/// Maximum number of remembered URLs
pub const HISTORY_LIMIT: usize = 10;

/// Most-recent-first, deduplicated list of searched URLs.
///
/// The in-memory list is authoritative; storage failures are logged and
/// otherwise ignored.
pub struct SearchHistory {
    entries: Vec<String>,
    store: Arc<dyn KeyValueStore>,
}

impl SearchHistory {
    /// Load the persisted list. Missing, unreadable or corrupt data yields an empty history.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_LIMIT);
                    debug!("Loaded {} history entries", entries.len());
                    entries
                }
                Err(source) => {
                    let err = PersistenceError::Corrupt {
                        key: HISTORY_KEY.to_string(),
                        source,
                    };
                    warn!("Ignoring stored history: {}", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read search history: {}", e);
                Vec::new()
            }
        };

        Self { entries, store }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Move `url` to the front, drop the oldest entries past the limit and persist.
    pub async fn record(&mut self, url: &str) {
        push_front(&mut self.entries, url);

        match serde_json::to_string(&self.entries) {
            Ok(raw) => {
                if let Err(e) = self.store.set(HISTORY_KEY, &raw).await {
                    warn!("Failed to save search history: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize search history: {}", e),
        }
    }

    /// Forget every entry, in memory and in storage.
    pub async fn clear(&mut self) {
        self.entries.clear();

        if let Err(e) = self.store.remove(HISTORY_KEY).await {
            warn!("Failed to remove stored search history: {}", e);
        }
        info!("🧹 Search history cleared");
    }
}

fn push_front(entries: &mut Vec<String>, url: &str) {
    entries.retain(|existing| existing != url);
    entries.insert(0, url.to_string());
    entries.truncate(HISTORY_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            Err(broken(key))
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(broken(key))
        }

        async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            Err(broken(key))
        }
    }

    fn broken(key: &str) -> PersistenceError {
        PersistenceError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage disabled"),
        }
    }

    #[tokio::test]
    async fn test_repeat_search_moves_to_front() {
        let mut history = SearchHistory::load(Arc::new(MemoryStore::new())).await;

        history.record("https://a.test").await;
        history.record("https://b.test").await;
        history.record("https://a.test").await;

        assert_eq!(history.entries(), &["https://a.test", "https://b.test"]);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let mut history = SearchHistory::load(Arc::new(MemoryStore::new())).await;

        for i in 0..11 {
            history.record(&format!("https://site{}.test", i)).await;
        }

        assert_eq!(history.entries().len(), HISTORY_LIMIT);
        assert_eq!(history.get(0), Some("https://site10.test"));
        assert_eq!(history.get(9), Some("https://site1.test"));
        assert!(!history.entries().contains(&"https://site0.test".to_string()));
    }

    #[tokio::test]
    async fn test_history_is_persisted_and_reloaded() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut history = SearchHistory::load(store.clone()).await;
        history.record("https://a.test").await;
        history.record("https://b.test").await;

        let raw = store.get(HISTORY_KEY).await.unwrap().unwrap();
        assert_eq!(raw, r#"["https://b.test","https://a.test"]"#);

        let reloaded = SearchHistory::load(store.clone()).await;
        assert_eq!(reloaded.entries(), history.entries());

        history.clear().await;
        assert!(history.entries().is_empty());
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_history_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "{not json").await.unwrap();

        let history = SearchHistory::load(store).await;
        assert!(history.entries().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failures_do_not_block_updates() {
        let mut history = SearchHistory::load(Arc::new(BrokenStore)).await;
        assert!(history.entries().is_empty());

        history.record("https://a.test").await;
        assert_eq!(history.entries(), &["https://a.test"]);

        history.clear().await;
        assert!(history.entries().is_empty());
    }
}
