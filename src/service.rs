use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::envelope::Delivery;
use crate::error::{QueueError, Result, StoreResult};
use crate::store::{MemoryStore, RedisStore, Store};

/// Public operation surface: composes the queue registry and the selected
/// backend behind the `push`/`pull`/`delete` contract. The backend is
/// injected at construction; callers never see which variant they run on.
pub struct QueueService {
    store: Arc<dyn Store>,
}

impl QueueService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Local variant: envelopes live in process memory.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(MemoryStore::new(config.visibility_timeout)))
    }

    /// Shared-store variant: envelopes live in a Redis sorted set.
    pub fn redis(config: &Config) -> Result<Self> {
        let url = config.redis_url.as_deref().ok_or_else(|| {
            QueueError::InvalidConfig("REDIS_URL is required for the redis store".to_string())
        })?;
        let store = RedisStore::connect(url, config.visibility_timeout)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub async fn push(&self, queue_id: &str, body: &str, priority: i64) -> StoreResult<()> {
        debug!(queue_id, priority, "push");
        self.store.push(queue_id, body, priority).await
    }

    pub async fn pull(&self, queue_id: &str) -> StoreResult<Option<Delivery>> {
        let delivery = self.store.pull(queue_id).await?;
        debug!(queue_id, delivered = delivery.is_some(), "pull");
        Ok(delivery)
    }

    pub async fn delete(&self, queue_id: &str, receipt: &str) -> StoreResult<()> {
        debug!(queue_id, "delete");
        self.store.delete(queue_id, receipt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_service_requires_a_url() {
        let config = Config::default();
        assert!(matches!(
            QueueService::redis(&config),
            Err(QueueError::InvalidConfig(_))
        ));
    }
}
