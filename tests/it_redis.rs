//! Integration tests for the Redis-backed store. These need a reachable
//! server and are ignored by default:
//!
//!     REDIS_URL=redis://127.0.0.1:6379 cargo test --test it_redis -- --ignored

use std::sync::Arc;
use std::time::Duration;

use prioq::{ManualClock, RedisStore, Store};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn fresh_store(visibility_timeout: Duration) -> RedisStore {
    let store = RedisStore::connect(&redis_url(), visibility_timeout).expect("pool");
    store.flush_all().await.expect("flushall");
    store
}

#[tokio::test]
#[ignore = "requires a running Redis (set REDIS_URL)"]
async fn push_pull_delete_roundtrip() {
    let store = fresh_store(Duration::from_secs(30)).await;

    store.push("it-jobs", "payload", 3).await.unwrap();
    let delivery = store.pull("it-jobs").await.unwrap().unwrap();
    assert_eq!(delivery.body, "payload");

    // Leased: invisible to the next pull.
    assert!(store.pull("it-jobs").await.unwrap().is_none());

    store.delete("it-jobs", &delivery.receipt).await.unwrap();
    assert!(store.pull("it-jobs").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis (set REDIS_URL)"]
async fn priority_and_fcfs_order_across_processes_worth_of_state() {
    let store = fresh_store(Duration::from_secs(30)).await;

    store.push("it-order", "low", 1).await.unwrap();
    store.push("it-order", "high-old", 9).await.unwrap();
    store.push("it-order", "high-new", 9).await.unwrap();

    assert_eq!(store.pull("it-order").await.unwrap().unwrap().body, "high-old");
    assert_eq!(store.pull("it-order").await.unwrap().unwrap().body, "high-new");
    assert_eq!(store.pull("it-order").await.unwrap().unwrap().body, "low");
}

#[tokio::test]
#[ignore = "requires a running Redis (set REDIS_URL)"]
async fn expired_lease_is_redelivered_with_a_new_receipt() {
    let store = fresh_store(Duration::from_millis(200)).await;

    store.push("it-expiry", "retry-me", 1).await.unwrap();
    let first = store.pull("it-expiry").await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let second = store.pull("it-expiry").await.unwrap().unwrap();
    assert_eq!(second.body, "retry-me");
    assert_ne!(second.receipt, first.receipt);

    // The stale receipt cannot delete the redelivered copy.
    store.delete("it-expiry", &first.receipt).await.unwrap();
    store.delete("it-expiry", &second.receipt).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(store.pull("it-expiry").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis (set REDIS_URL)"]
async fn delete_rechecks_lease_expiry_on_the_server() {
    // A consumer whose clock has fallen behind still believes its lease is
    // open; by the server's clock the lease lapsed long ago. The delete must
    // be refused server-side — the local visibility check alone cannot see
    // time that passed between the read and the removal.
    let behind = Arc::new(ManualClock::new());
    let pool = deadpool_redis::Config::from_url(&redis_url())
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("pool");
    let store = RedisStore::with_clock(pool, Duration::from_secs(30), behind);
    store.flush_all().await.expect("flushall");

    store.push("it-lagging", "keep-me", 1).await.unwrap();
    let delivery = store.pull("it-lagging").await.unwrap().unwrap();

    // By the lagging clock the lease runs for another 30 seconds; by the
    // server's it expired decades ago. The ack must not remove the message.
    store.delete("it-lagging", &delivery.receipt).await.unwrap();

    let wall = RedisStore::connect(&redis_url(), Duration::from_secs(30)).expect("pool");
    let redelivered = wall.pull("it-lagging").await.unwrap().unwrap();
    assert_eq!(redelivered.body, "keep-me");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires a running Redis (set REDIS_URL)"]
async fn concurrent_pulls_hand_out_one_lease() {
    let store = Arc::new(fresh_store(Duration::from_secs(30)).await);
    store.push("it-race", "single", 1).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move { store.pull("it-race").await }));
    }

    let mut winners = 0;
    for task in tasks {
        // A pull may lose every claim round under heavy contention; that
        // surfaces as a retryable error, never as a duplicate delivery.
        if let Ok(Some(_)) = task.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one pull may win the only message");
}
