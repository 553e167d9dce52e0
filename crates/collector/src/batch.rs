use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::metrics::{self, InflightGuard};

/// Why a single batch item did not produce a value.
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
    #[error("operation panicked: {0}")]
    Panicked(String),
    #[error("concurrency gate closed")]
    GateClosed,
}

/// Runs independent async operations with at most `limit` in flight.
///
/// Every item yields its own `Result`; a failing or panicking operation
/// never cancels its siblings, and the call returns only once every item
/// has finished. No retries or timeouts are applied here.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    gate: Arc<Semaphore>,
    limit: usize,
}

impl BatchExecutor {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            gate: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Results come back in input order regardless of completion order.
    #[instrument(skip_all, fields(items = items.len(), limit = self.limit))]
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, op: F) -> Vec<Result<R, ItemFailure>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let op = &op;
        let tasks = items.into_iter().enumerate().map(|(index, item)| {
            let gate = Arc::clone(&self.gate);
            async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(ItemFailure::GateClosed),
                };
                let _inflight = InflightGuard::new();
                let outcome = AssertUnwindSafe(async move { op(item).await })
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(ItemFailure::Operation(err)),
                    Err(panic) => Err(ItemFailure::Panicked(panic_message(&*panic))),
                };
                record_outcome(index, &result);
                result
            }
        });
        join_all(tasks).await
    }

    /// Like [`run`](Self::run) but keyed by the item itself. Duplicate keys
    /// run once.
    pub async fn run_keyed<K, R, F, Fut>(
        &self,
        keys: Vec<K>,
        op: F,
    ) -> HashMap<K, Result<R, ItemFailure>>
    where
        K: Eq + Hash + Clone,
        F: Fn(K) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<K> = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        let results = self.run(unique.clone(), op).await;
        unique.into_iter().zip(results).collect()
    }
}

fn record_outcome<R>(index: usize, result: &Result<R, ItemFailure>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(ItemFailure::Panicked(_)) => "panic",
        Err(_) => "error",
    };
    metrics::BATCH_ITEMS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    if let Err(err) = result {
        warn!(index, error = %err, "batch item failed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Duration;

    #[test]
    fn zero_limit_is_clamped() {
        assert_eq!(BatchExecutor::new(0).limit(), 1);
        assert_eq!(BatchExecutor::new(4).limit(), 4);
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        let executor = BatchExecutor::new(3);
        let results = executor
            .run(vec![30u64, 10, 20], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, anyhow::Error>(delay)
            })
            .await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn panic_is_captured_per_item() {
        let executor = BatchExecutor::new(2);
        let results = executor
            .run(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    panic!("boom on {n}");
                }
                Ok::<_, anyhow::Error>(n * 10)
            })
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &10);
        match &results[1] {
            Err(ItemFailure::Panicked(msg)) => assert_eq!(msg, "boom on 2"),
            other => panic!("expected panic failure, got {other:?}"),
        }
        assert_eq!(results[2].as_ref().unwrap(), &30);
    }

    #[tokio::test]
    async fn keyed_results_and_duplicate_keys() {
        let executor = BatchExecutor::new(2);
        let results = executor
            .run_keyed(
                vec!["octo".to_string(), "ghost".to_string(), "octo".to_string()],
                |login| async move {
                    if login == "ghost" {
                        Err(anyhow!("user {login} not found"))
                    } else {
                        Ok::<_, anyhow::Error>(login.len())
                    }
                },
            )
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(*results["octo"].as_ref().unwrap(), 4);
        let err = results["ghost"].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "user ghost not found");
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let executor = BatchExecutor::new(2);
        let results: Vec<Result<(), ItemFailure>> =
            executor.run(Vec::<u8>::new(), |_| async { Ok::<_, anyhow::Error>(()) }).await;
        assert!(results.is_empty());
    }
}
