//! Injected draft cache with a load-on-init / write-on-change contract.
//!
//! The cache holds drafts with edits that have not yet reached the database:
//! every edit is written through, and the entry is cleared once a save
//! succeeds. A session that opens after a crash can recover unsaved edits
//! from here. Cache failures are never save failures — callers log and move
//! on.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use uuid::Uuid;

use crate::draft::model::ResumeDraft;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait DraftCache: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<ResumeDraft>, CacheError>;
    async fn store(&self, key: &str, draft: &ResumeDraft) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache key for one user's draft of one resume ("new" before the first save
/// assigns an identifier).
pub fn draft_cache_key(user_id: &str, resume_id: Option<Uuid>) -> String {
    match resume_id {
        Some(id) => format!("draft:{user_id}:{id}"),
        None => format!("draft:{user_id}:new"),
    }
}

/// Redis-backed cache used in production. Entries expire after the
/// configured TTL so abandoned drafts do not accumulate.
pub struct RedisDraftCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisDraftCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl DraftCache for RedisDraftCache {
    async fn load(&self, key: &str) -> Result<Option<ResumeDraft>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, draft: &ResumeDraft) -> Result<(), CacheError> {
        let json = serde_json::to_string(draft)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, json, self.ttl_secs).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// In-memory cache for tests and single-process development.
#[derive(Default)]
pub struct InMemoryDraftCache {
    entries: Mutex<HashMap<String, ResumeDraft>>,
}

#[async_trait]
impl DraftCache for InMemoryDraftCache {
    async fn load(&self, key: &str) -> Result<Option<ResumeDraft>, CacheError> {
        let entries = self.entries.lock().expect("draft cache lock poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn store(&self, key: &str, draft: &ResumeDraft) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("draft cache lock poisoned");
        entries.insert(key.to_string(), draft.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("draft cache lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_cache_roundtrip() {
        let cache = InMemoryDraftCache::default();
        let key = draft_cache_key("user_1", None);

        assert!(cache.load(&key).await.unwrap().is_none());

        let draft = ResumeDraft {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        cache.store(&key, &draft).await.unwrap();
        assert_eq!(cache.load(&key).await.unwrap(), Some(draft));

        cache.remove(&key).await.unwrap();
        assert!(cache.load(&key).await.unwrap().is_none());
    }

    #[test]
    fn test_cache_key_distinguishes_new_from_existing() {
        let id = Uuid::new_v4();
        assert_eq!(draft_cache_key("u", None), "draft:u:new");
        assert_eq!(draft_cache_key("u", Some(id)), format!("draft:u:{id}"));
    }
}
