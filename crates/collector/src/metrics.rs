use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

pub static RUNS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_runs_total",
        "Total number of collection passes attempted"
    )
    .expect("collector runs total")
});

pub static BATCH_ITEMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_batch_items_total",
        "Items completed by the batch executor grouped by outcome (success, error, panic)",
        &["outcome"]
    )
    .expect("collector batch items total")
});

pub static BATCH_INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "collector_batch_inflight",
        "Number of batch operations currently holding a concurrency permit"
    )
    .expect("collector batch inflight gauge")
});

pub static EVENTS_ASSEMBLED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_events_assembled_total",
        "Total number of API event records assembled into events"
    )
    .expect("collector events assembled")
});

pub static RECORDS_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_records_dropped_total",
        "Records dropped because they were malformed or failed conversion, grouped by kind",
        &["kind"]
    )
    .expect("collector records dropped")
});

pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_requests_total",
        "Total number of GitHub API calls grouped by operation and outcome",
        &["op", "outcome"]
    )
    .expect("collector fetch requests total")
});

pub static FETCH_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collector_fetch_latency_seconds",
        "Latency of GitHub API calls grouped by operation",
        &["op"],
        vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .expect("collector fetch latency seconds")
});

pub struct InflightGuard;

impl Default for InflightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InflightGuard {
    pub fn new() -> Self {
        BATCH_INFLIGHT.inc();
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        BATCH_INFLIGHT.dec();
    }
}
