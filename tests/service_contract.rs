//! Black-box contract tests against the public service surface, using the
//! in-memory backend.

use prioq::{Config, QueueService};

fn service() -> QueueService {
    prioq::telemetry::init_tracing();
    QueueService::in_memory(&Config::default())
}

#[tokio::test]
async fn push_pull_delete_roundtrip() {
    let svc = service();
    svc.push("jobs", "payload", 3).await.unwrap();

    let delivery = svc.pull("jobs").await.unwrap().unwrap();
    assert_eq!(delivery.body, "payload");
    assert!(!delivery.receipt.is_empty());

    svc.delete("jobs", &delivery.receipt).await.unwrap();
    assert!(svc.pull("jobs").await.unwrap().is_none());
}

#[tokio::test]
async fn pull_on_empty_queue_is_not_an_error() {
    let svc = service();
    assert!(svc.pull("nothing-here").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_with_unmatched_receipt_is_a_noop() {
    let svc = service();
    svc.delete("jobs", "bogus-receipt").await.unwrap();
}

#[tokio::test]
async fn priority_beats_arrival_order_and_leases_hide_messages() {
    let svc = service();
    svc.push("jobs", "A", 1).await.unwrap();
    svc.push("jobs", "B", 2).await.unwrap();

    // B outranks A despite arriving later.
    let b = svc.pull("jobs").await.unwrap().unwrap();
    assert_eq!(b.body, "B");

    // C arrives while B is leased and outranks the still-eligible A.
    svc.push("jobs", "C", 2).await.unwrap();
    let c = svc.pull("jobs").await.unwrap().unwrap();
    assert_eq!(c.body, "C");

    // Acknowledging B removes it for good; only A is left eligible.
    svc.delete("jobs", &b.receipt).await.unwrap();
    let a = svc.pull("jobs").await.unwrap().unwrap();
    assert_eq!(a.body, "A");
    assert!(svc.pull("jobs").await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_pushes_create_distinct_messages() {
    let svc = service();
    svc.push("jobs", "same", 1).await.unwrap();
    svc.push("jobs", "same", 1).await.unwrap();

    let first = svc.pull("jobs").await.unwrap().unwrap();
    let second = svc.pull("jobs").await.unwrap().unwrap();
    assert_eq!(first.body, second.body);
    assert_ne!(first.receipt, second.receipt);
}
