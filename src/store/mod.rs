use async_trait::async_trait;

use crate::envelope::Delivery;
use crate::error::StoreResult;

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Backend capability set: the three operations every queue backend provides.
/// Implementations must be thread-safe; the backend is chosen at construction
/// time and injected into [`crate::QueueService`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a message to `queue_id`, creating the queue on first use.
    /// Repeated pushes create distinct messages.
    async fn push(&self, queue_id: &str, body: &str, priority: i64) -> StoreResult<()>;

    /// Lease the best eligible message: greatest priority first, oldest
    /// enqueue time within a priority. The message stays in the store,
    /// invisible for the visibility timeout; a detached `(body, receipt)`
    /// copy is returned. `Ok(None)` when the queue is empty or every message
    /// is currently leased — that is a documented outcome, not an error.
    async fn pull(&self, queue_id: &str) -> StoreResult<Option<Delivery>>;

    /// Acknowledge one delivery attempt: permanently remove the envelope
    /// whose current receipt matches and whose lease window is still open.
    /// Unknown, already-deleted, or expired receipts are silent no-ops, so
    /// duplicate acks and acks of a superseded delivery are always safe.
    async fn delete(&self, queue_id: &str, receipt: &str) -> StoreResult<()>;
}
