//! Progress cache implementations

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use templatelab_core::domain::progress::ProgressEntry;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use super::{CacheError, ProgressCache, progress_key};

/// Progress entries as JSON strings under `execution:{id}` with `SET EX`
#[derive(Clone)]
pub struct RedisProgressCache {
    redis: ConnectionManager,
}

impl RedisProgressCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }
}

#[async_trait]
impl ProgressCache for RedisProgressCache {
    async fn set(&self, id: Uuid, entry: ProgressEntry, ttl: Duration) -> Result<(), CacheError> {
        let value = serde_json::to_string(&entry)?;
        let mut redis = self.redis.clone();

        let _: () = redis
            .set_ex(progress_key(id), value, ttl.as_secs().max(1))
            .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ProgressEntry>, CacheError> {
        let mut redis = self.redis.clone();

        let value: Option<String> = redis.get(progress_key(id)).await?;
        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }
}

/// In-process cache used when no Redis is configured
#[derive(Default)]
pub struct InMemoryProgressCache {
    entries: RwLock<HashMap<Uuid, (ProgressEntry, Instant)>>,
}

impl InMemoryProgressCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressCache for InMemoryProgressCache {
    async fn set(&self, id: Uuid, entry: ProgressEntry, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(id, (entry, now + ttl));

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ProgressEntry>, CacheError> {
        let entries = self.entries.read().await;

        Ok(entries
            .get(&id)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(entry, _)| *entry))
    }
}
