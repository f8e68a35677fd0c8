//! # Contract Errors Metrics
//!
//! Prometheus metrics for the error log and callback pipeline.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-contract-errors = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `contract_errors_stored_total` - Counter of records written to the error log
//! - `contract_errors_callbacks_total` - Counter of callback attempts (by outcome)
//! - `contract_errors_subscriptions_total` - Counter of accepted subscriptions
//! - `contract_errors_pruned_total` - Counter of pruned entries (by collection)
//! - `contract_errors_queue_depth` - Gauge of faults queued in the open block

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Records written to the error log
    pub static ref ERRORS_STORED: IntCounter = register_int_counter!(
        "contract_errors_stored_total",
        "Total number of fault records written to the error log"
    )
    .expect("Failed to create ERRORS_STORED metric");

    /// Callback attempts, labeled by outcome
    pub static ref CALLBACKS: IntCounterVec = register_int_counter_vec!(
        "contract_errors_callbacks_total",
        "Total number of error callback attempts",
        &["outcome"]
    )
    .expect("Failed to create CALLBACKS metric");

    /// Accepted subscriptions
    pub static ref SUBSCRIPTIONS: IntCounter = register_int_counter!(
        "contract_errors_subscriptions_total",
        "Total number of accepted error subscriptions"
    )
    .expect("Failed to create SUBSCRIPTIONS metric");

    /// Pruned entries, labeled by collection
    pub static ref PRUNED: IntCounterVec = register_int_counter_vec!(
        "contract_errors_pruned_total",
        "Total number of pruned entries",
        &["collection"]
    )
    .expect("Failed to create PRUNED metric");

    /// Faults queued in the open block
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "contract_errors_queue_depth",
        "Faults waiting for callback delivery in the open block"
    )
    .expect("Failed to create QUEUE_DEPTH metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a fault written to the error log
#[cfg(feature = "metrics")]
pub fn record_error_stored() {
    ERRORS_STORED.inc();
}

/// Record a callback attempt outcome ("delivered", "failed", "skipped")
#[cfg(feature = "metrics")]
pub fn record_callback(outcome: &str) {
    CALLBACKS.with_label_values(&[outcome]).inc();
}

/// Record an accepted subscription
#[cfg(feature = "metrics")]
pub fn record_subscription() {
    SUBSCRIPTIONS.inc();
}

/// Record pruned entries of a collection
#[cfg(feature = "metrics")]
pub fn record_pruned(collection: &str, count: usize) {
    PRUNED.with_label_values(&[collection]).inc_by(count as u64);
}

/// Update queued faults gauge
#[cfg(feature = "metrics")]
pub fn set_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(depth as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_error_stored() {}

#[cfg(not(feature = "metrics"))]
pub fn record_callback(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_subscription() {}

#[cfg(not(feature = "metrics"))]
pub fn record_pruned(_collection: &str, _count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn set_queue_depth(_depth: usize) {}
