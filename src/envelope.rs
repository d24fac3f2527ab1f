use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored representation of one message plus its scheduling and lease
/// metadata. This is the internal unit the stores order and mutate — distinct
/// from the detached [`Delivery`] copy handed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub id: Uuid,
    pub body: String,
    /// Larger values dequeue first.
    pub priority: i64,
    /// Clock nanos at push. FCFS tie-break within a priority; never mutated.
    pub enqueued_at: u64,
    /// Delivery attempts so far. Incremented on each lease, never reset.
    pub attempts: u32,
    /// The envelope is eligible for delivery iff `now >= visible_from`.
    pub visible_from: u64,
    /// Present iff the envelope is currently leased.
    pub receipt: Option<String>,
}

impl Envelope {
    /// A freshly pushed envelope: immediately eligible, no receipt.
    pub fn new(body: impl Into<String>, priority: i64, now_ns: u64) -> Self {
        Self {
            id: Uuid::now_v7(),
            body: body.into(),
            priority,
            enqueued_at: now_ns,
            attempts: 0,
            visible_from: now_ns,
            receipt: None,
        }
    }

    pub fn is_visible_at(&self, now_ns: u64) -> bool {
        now_ns >= self.visible_from
    }

    /// Transition to the leased state: fresh receipt, bumped attempt counter,
    /// invisible until `now + visibility_timeout`. Returns the receipt.
    pub fn lease(&mut self, now_ns: u64, visibility_timeout_ns: u64) -> String {
        let receipt = new_receipt();
        self.receipt = Some(receipt.clone());
        self.attempts += 1;
        self.visible_from = now_ns + visibility_timeout_ns;
        receipt
    }
}

/// Generate a collision-free lease receipt (random 128-bit token).
pub fn new_receipt() -> String {
    Uuid::new_v4().to_string()
}

/// Delivery precedence: greatest priority first, then oldest enqueue time,
/// then message id. Returns `Less` when `a` must be delivered before `b`.
pub fn delivery_order(a: &Envelope, b: &Envelope) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Detached copy returned by `pull`: the payload plus the receipt that scopes
/// a later `delete` to this specific delivery attempt. Mutating it cannot
/// touch store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: String,
    pub receipt: String,
}
