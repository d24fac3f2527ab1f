//! Shared-store backend: each queue is a Redis sorted set whose members are
//! JSON-serialized envelopes, the member itself carrying the mutable
//! receipt/visibility/attempt fields.
//!
//! Redis offers no atomic "read best candidate and replace" primitive, so the
//! lease read-modify-write is guarded by a server-side Lua script that swaps
//! the previously-read member for its leased rewrite in one step. Losing that
//! swap means another consumer claimed the candidate first; the pull then
//! re-selects against a fresh snapshot instead of delivering a duplicate.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{cmd, Script};
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::envelope::{delivery_order, Delivery, Envelope};
use crate::error::{QueueError, StoreError, StoreResult};
use crate::store::Store;

/// How many times `pull` re-selects after losing the claim race before the
/// contention is surfaced to the caller as a transient failure.
const MAX_CLAIM_ATTEMPTS: u32 = 8;

/// Atomically swap a previously-read member for its leased rewrite.
/// `ZREM` returning 0 means the candidate was claimed or deleted after we
/// read it, and the whole swap is abandoned.
const CLAIM_SCRIPT: &str = r"
if redis.call('ZREM', KEYS[1], ARGV[1]) == 1 then
  redis.call('ZADD', KEYS[1], ARGV[2], ARGV[3])
  return 1
end
return 0
";

/// Acknowledge one delivery attempt: remove the exact member, but only while
/// its lease window is still open by the server's clock. Re-checking the
/// expiry in the same atomic step as the `ZREM` means a lease that lapses by
/// pure passage of time between the client's read and the ack can no longer
/// delete a now-eligible message.
const ACK_SCRIPT: &str = r"
local t = redis.call('TIME')
local now_ns = t[1] * 1e9 + t[2] * 1e3
if tonumber(ARGV[2]) > now_ns then
  return redis.call('ZREM', KEYS[1], ARGV[1])
end
return 0
";

fn queue_key(queue_id: &str) -> String {
    format!("prioq:{queue_id}")
}

/// Sorted-set score for an envelope: ascending iteration yields descending
/// priority bands, with enqueue nanos as a fractional hint inside a band.
/// f64 cannot carry full nanosecond precision, so the score only bounds the
/// scan — the normative tie-break is applied client-side in
/// [`select_candidate`] over the deserialized members.
fn score(env: &Envelope) -> f64 {
    -(env.priority as f64) + env.enqueued_at as f64 * 1e-19
}

/// Pick the best eligible candidate by the exact delivery order. Returns the
/// raw member alongside the envelope so the claim script can compare-remove
/// the precise bytes that were read.
fn select_candidate(members: &[String], now_ns: u64) -> StoreResult<Option<(String, Envelope)>> {
    let mut best: Option<(&String, Envelope)> = None;
    for member in members {
        let env: Envelope = serde_json::from_str(member)?;
        if !env.is_visible_at(now_ns) {
            continue;
        }
        let better = match &best {
            None => true,
            Some((_, current)) => delivery_order(&env, current) == Ordering::Less,
        };
        if better {
            best = Some((member, env));
        }
    }
    Ok(best.map(|(member, env)| (member.clone(), env)))
}

/// Redis-backed store. Every lease rewrites the serialized member, so a
/// member value doubles as an optimistic-concurrency token: any state
/// transition invalidates outstanding reads of the old value.
pub struct RedisStore {
    pool: Pool,
    clock: Arc<dyn Clock>,
    visibility_timeout_ns: u64,
    claim: Script,
    ack: Script,
}

impl RedisStore {
    /// Build a pool from a Redis URL and wrap it.
    pub fn connect(url: &str, visibility_timeout: Duration) -> Result<Self, QueueError> {
        let pool = RedisConfig::from_url(url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self::new(pool, visibility_timeout))
    }

    pub fn new(pool: Pool, visibility_timeout: Duration) -> Self {
        Self::with_clock(pool, visibility_timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: Pool, visibility_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            visibility_timeout_ns: visibility_timeout.as_nanos() as u64,
            claim: Script::new(CLAIM_SCRIPT),
            ack: Script::new(ACK_SCRIPT),
        }
    }

    /// Wipe the backing store. Test support: integration tests start from a
    /// clean slate the same way the service has always been exercised.
    pub async fn flush_all(&self) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _: String = cmd("FLUSHALL").query_async(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn push(&self, queue_id: &str, body: &str, priority: i64) -> StoreResult<()> {
        let env = Envelope::new(body, priority, self.clock.now());
        let member = serde_json::to_string(&env)?;
        let mut conn = self.pool.get().await?;
        let _: i64 = cmd("ZADD")
            .arg(queue_key(queue_id))
            .arg(score(&env))
            .arg(&member)
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }

    async fn pull(&self, queue_id: &str) -> StoreResult<Option<Delivery>> {
        let key = queue_key(queue_id);
        let mut conn = self.pool.get().await?;

        for attempt in 0..MAX_CLAIM_ATTEMPTS {
            let now = self.clock.now();
            let members: Vec<String> = cmd("ZRANGE")
                .arg(&key)
                .arg(0)
                .arg(-1)
                .query_async(&mut *conn)
                .await?;

            let Some((member, mut env)) = select_candidate(&members, now)? else {
                return Ok(None);
            };

            let receipt = env.lease(now, self.visibility_timeout_ns);
            let updated = serde_json::to_string(&env)?;
            let claimed: i64 = self
                .claim
                .key(&key)
                .arg(&member)
                .arg(score(&env))
                .arg(&updated)
                .invoke_async(&mut *conn)
                .await?;

            if claimed == 1 {
                return Ok(Some(Delivery {
                    body: env.body,
                    receipt,
                }));
            }
            debug!(queue_id, attempt, "lost lease race, reselecting");
        }

        Err(StoreError::Contended {
            attempts: MAX_CLAIM_ATTEMPTS,
        })
    }

    async fn delete(&self, queue_id: &str, receipt: &str) -> StoreResult<()> {
        let key = queue_key(queue_id);
        let mut conn = self.pool.get().await?;
        let now = self.clock.now();

        let members: Vec<String> = cmd("ZRANGE")
            .arg(&key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await?;

        for member in members {
            let env: Envelope = serde_json::from_str(&member)?;
            if env.receipt.as_deref() == Some(receipt) && !env.is_visible_at(now) {
                // Every lease rewrites the member, so removing this exact
                // value only succeeds while the acknowledged delivery attempt
                // is still the current one. The script re-checks the lease
                // window against the server clock, so a lease lapsing between
                // this read and the removal also ends in a no-op.
                let removed: i64 = self
                    .ack
                    .key(&key)
                    .arg(&member)
                    .arg(env.visible_from)
                    .invoke_async(&mut *conn)
                    .await?;
                if removed == 0 {
                    debug!(queue_id, "lease lapsed or raced a re-lease, nothing deleted");
                }
                return Ok(());
            }
        }
        Ok(())
    }
}
