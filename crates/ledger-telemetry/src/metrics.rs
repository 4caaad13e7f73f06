//! Prometheus metrics for the ledger engine.
//!
//! All metrics follow the naming convention: `ledger_<metric>_<unit>`.
//! Collectors count whether or not they are registered; registration only
//! makes them visible to [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Registry every ledger collector is registered in
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    pub static ref TRANSACTIONS_APPLIED: IntCounter = IntCounter::new(
        "ledger_transactions_applied_total",
        "Transactions applied to the state"
    ).expect("metric creation failed");

    /// Rejections by error kind (validation, resource, fatal)
    pub static ref TRANSACTIONS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("ledger_transactions_rejected_total", "Transactions rejected"),
        &["kind"]
    ).expect("metric creation failed");

    pub static ref OPERATIONS_APPLIED: IntCounterVec = IntCounterVec::new(
        Opts::new("ledger_operations_applied_total", "Operations applied by type"),
        &["operation"]
    ).expect("metric creation failed");

    pub static ref TRANSACTION_APPLY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ledger_transaction_apply_seconds",
            "Time spent evaluating and applying one transaction"
        ).buckets(exponential_buckets(0.00005, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCKS
    // =========================================================================

    pub static ref BLOCKS_APPLIED: IntCounter = IntCounter::new(
        "ledger_blocks_applied_total",
        "Blocks applied"
    ).expect("metric creation failed");

    pub static ref BLOCKS_POPPED: IntCounter = IntCounter::new(
        "ledger_blocks_popped_total",
        "Blocks reverted through the undo history"
    ).expect("metric creation failed");

    pub static ref HEAD_BLOCK_NUMBER: IntGauge = IntGauge::new(
        "ledger_head_block_number",
        "Number of the current head block"
    ).expect("metric creation failed");

    pub static ref UNDO_STACK_DEPTH: IntGauge = IntGauge::new(
        "ledger_undo_stack_depth",
        "Undo states held by the object database"
    ).expect("metric creation failed");
}

/// Register all metrics with [`REGISTRY`]. Fails on a second call.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Transactions
        Box::new(TRANSACTIONS_APPLIED.clone()),
        Box::new(TRANSACTIONS_REJECTED.clone()),
        Box::new(OPERATIONS_APPLIED.clone()),
        Box::new(TRANSACTION_APPLY_SECONDS.clone()),
        // Blocks
        Box::new(BLOCKS_APPLIED.clone()),
        Box::new(BLOCKS_POPPED.clone()),
        Box::new(HEAD_BLOCK_NUMBER.clone()),
        Box::new(UNDO_STACK_DEPTH.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_encode() {
        // May already be registered by another test
        let _ = register_metrics();
        TRANSACTIONS_REJECTED.with_label_values(&["validation"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("ledger_transactions_rejected_total"));
    }

    #[test]
    fn test_double_registration_is_an_error() {
        let _ = register_metrics();
        assert!(register_metrics().is_err());
    }

    #[test]
    fn test_counter_increment() {
        let before = BLOCKS_APPLIED.get();
        BLOCKS_APPLIED.inc();
        assert!(BLOCKS_APPLIED.get() > before);
    }

    #[test]
    fn test_histogram_timer() {
        let before = TRANSACTION_APPLY_SECONDS.get_sample_count();
        {
            let _timer = HistogramTimer::new(&TRANSACTION_APPLY_SECONDS);
        }
        assert!(TRANSACTION_APPLY_SECONDS.get_sample_count() > before);
    }
}
