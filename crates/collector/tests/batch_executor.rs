use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use collector::{BatchExecutor, ItemFailure};
use tokio::time::Instant;

struct InflightProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

impl InflightProbe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }

    fn enter(&self) {
        let cur = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(cur, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn limit_two_over_five_items_with_one_failure() {
    let probe = InflightProbe::new();
    let executor = BatchExecutor::new(2);
    let started = Instant::now();

    let results = executor
        .run(vec![1, 2, 3, 4, 5], |item| {
            let probe = Arc::clone(&probe);
            async move {
                probe.enter();
                tokio::time::sleep(Duration::from_millis(40)).await;
                probe.exit();
                if item == 3 {
                    Err(anyhow!("item {item} failed"))
                } else {
                    Ok(item * 100)
                }
            }
        })
        .await;

    assert_eq!(results.len(), 5);
    assert_eq!(probe.completed.load(Ordering::SeqCst), 5);
    assert!(probe.max_active.load(Ordering::SeqCst) <= 2);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 2);
    // Five 40ms items two at a time need at least three rounds.
    assert!(started.elapsed() >= Duration::from_millis(120));

    for (index, result) in results.iter().enumerate() {
        let item = index + 1;
        if item == 3 {
            match result {
                Err(ItemFailure::Operation(err)) => assert_eq!(err.to_string(), "item 3 failed"),
                other => panic!("expected operation failure, got {other:?}"),
            }
        } else {
            assert_eq!(result.as_ref().unwrap(), &(item as i32 * 100));
        }
    }
}

#[tokio::test]
async fn failure_does_not_cancel_slower_siblings() {
    let probe = InflightProbe::new();
    let executor = BatchExecutor::new(3);

    let results = executor
        .run(vec![0u64, 60, 60], |delay| {
            let probe = Arc::clone(&probe);
            async move {
                probe.enter();
                tokio::time::sleep(Duration::from_millis(delay)).await;
                probe.exit();
                if delay == 0 {
                    return Err(anyhow!("fast failure"));
                }
                Ok(delay)
            }
        })
        .await;

    assert!(results[0].is_err());
    assert_eq!(results[1].as_ref().unwrap(), &60);
    assert_eq!(results[2].as_ref().unwrap(), &60);
    assert_eq!(probe.completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn limit_of_one_runs_sequentially() {
    let probe = InflightProbe::new();
    let executor = BatchExecutor::new(0);

    let results = executor
        .run((0..4).collect::<Vec<u32>>(), |item| {
            let probe = Arc::clone(&probe);
            async move {
                probe.enter();
                tokio::task::yield_now().await;
                probe.exit();
                Ok::<_, anyhow::Error>(item)
            }
        })
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
}
