//! Local backend: envelopes live in process memory.
//!
//! Each queue keeps its envelopes split in two: an eligible max-heap ordered
//! by `(priority desc, enqueued_at asc, seq asc)` and a leased map keyed by
//! `(visible_from, seq)`. Expired leases are woken lazily before each
//! selection, so a pull never re-scans entries that are still inside their
//! lease window.

use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::clock::{Clock, SystemClock};
use crate::envelope::{Delivery, Envelope};
use crate::error::StoreResult;
use crate::store::Store;

/// One envelope plus its push sequence number. The sequence is assigned once
/// at push and keeps FCFS exact even when two pushes read the same clock
/// nanosecond.
#[derive(Debug)]
struct Slot {
    seq: u64,
    env: Envelope,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    /// Max-heap order: the slot that must be delivered first compares
    /// greatest. Priority wins; within a priority the earlier push wins.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.env
            .priority
            .cmp(&other.env.priority)
            .then_with(|| other.env.enqueued_at.cmp(&self.env.enqueued_at))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Per-queue message store. All three operations against one queue serialize
/// on the owning mutex, at the granularity of a single envelope transition.
#[derive(Debug, Default)]
struct QueueState {
    eligible: BinaryHeap<Slot>,
    /// Leased (invisible) envelopes, ordered by expiry so waking stops at the
    /// first still-active lease.
    leased: BTreeMap<(u64, u64), Slot>,
    /// receipt -> leased key, for O(1) delete.
    by_receipt: HashMap<String, (u64, u64)>,
}

impl QueueState {
    /// Move every expired lease back into the eligible heap, clearing its
    /// receipt. Attempts and enqueue time are untouched, so the FCFS
    /// tie-break survives any number of lease/expiry cycles.
    fn wake_expired(&mut self, now_ns: u64) {
        while self
            .leased
            .first_key_value()
            .is_some_and(|(key, _)| key.0 <= now_ns)
        {
            let Some((_, mut slot)) = self.leased.pop_first() else {
                break;
            };
            if let Some(receipt) = slot.env.receipt.take() {
                self.by_receipt.remove(&receipt);
            }
            self.eligible.push(slot);
        }
    }
}

/// In-memory store: a queue registry plus one [`QueueState`] per queue.
/// Queues are fully independent; each has its own mutex, so operations on
/// different queues never contend.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    visibility_timeout_ns: u64,
    queues: RwLock<HashMap<String, Arc<Mutex<QueueState>>>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self::with_clock(visibility_timeout, Arc::new(SystemClock))
    }

    /// Injectable clock, used by tests to drive lease expiry by hand.
    pub fn with_clock(visibility_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            visibility_timeout_ns: visibility_timeout.as_nanos() as u64,
            queues: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Queue registry: return the state for `queue_id`, creating an empty one
    /// on first use. Read-lock fast path; the write path re-checks under the
    /// exclusive lock so concurrent first users of the same id observe
    /// exactly one state.
    fn queue(&self, queue_id: &str) -> Arc<Mutex<QueueState>> {
        if let Some(state) = self.queues.read().get(queue_id) {
            return Arc::clone(state);
        }
        let mut queues = self.queues.write();
        Arc::clone(queues.entry(queue_id.to_string()).or_default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn push(&self, queue_id: &str, body: &str, priority: i64) -> StoreResult<()> {
        let now = self.clock.now();
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let env = Envelope::new(body, priority, now);
        let state = self.queue(queue_id);
        state.lock().eligible.push(Slot { seq, env });
        Ok(())
    }

    async fn pull(&self, queue_id: &str) -> StoreResult<Option<Delivery>> {
        let now = self.clock.now();
        let state = self.queue(queue_id);
        let mut state = state.lock();

        // The select-and-mark transition happens entirely under the queue
        // mutex, so two racing pulls can never lease the same envelope.
        state.wake_expired(now);
        let Some(mut slot) = state.eligible.pop() else {
            return Ok(None);
        };

        let receipt = slot.env.lease(now, self.visibility_timeout_ns);
        let delivery = Delivery {
            body: slot.env.body.clone(),
            receipt: receipt.clone(),
        };
        let key = (slot.env.visible_from, slot.seq);
        state.by_receipt.insert(receipt, key);
        state.leased.insert(key, slot);
        Ok(Some(delivery))
    }

    async fn delete(&self, queue_id: &str, receipt: &str) -> StoreResult<()> {
        let now = self.clock.now();
        let state = self.queue(queue_id);
        let mut state = state.lock();

        let Some(&key) = state.by_receipt.get(receipt) else {
            return Ok(());
        };
        if key.0 <= now {
            // Lease window already elapsed: the envelope is back in (or on
            // its way back to) the eligible pool, and this receipt no longer
            // identifies the current delivery attempt.
            return Ok(());
        }
        state.by_receipt.remove(receipt);
        state.leased.remove(&key);
        Ok(())
    }
}
