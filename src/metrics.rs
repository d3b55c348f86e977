// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the agent pool provisioner.
//!
//! Every metric carries the `agentpool_provisioner_` prefix.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Garbage collection passes and status reconciles
//! - **Cloud Metrics** - Agent pool API calls by operation and outcome
//! - **Instance Lifecycle Metrics** - Instances created and deleted
//! - **Garbage Collection Metrics** - Leaked pools and Nodes reclaimed
//!
//! # Example
//!
//! ```rust,no_run
//! use agentpool_provisioner::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("GarbageCollection", std::time::Duration::from_secs(1));
//! ```

use prometheus::core::Collector;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::error;

// ============================================================================
// Metric Name Constants
// ============================================================================

const METRICS_NAMESPACE: &str = "agentpool_provisioner";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Registry holding every provisioner metric.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register a collector, logging instead of panicking on duplicates.
fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    if let Err(e) = METRICS_REGISTRY.register(Box::new(collector.clone())) {
        error!(error = %e, "Failed to register metric");
    }
    collector
}

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    register(CounterVec::new(opts, labels).expect("static counter definition is valid"))
}

fn histogram_vec(name: &str, help: &str, labels: &[&str], buckets: Vec<f64>) -> HistogramVec {
    let opts = HistogramOpts::new(format!("{METRICS_NAMESPACE}_{name}"), help).buckets(buckets);
    register(HistogramVec::new(opts, labels).expect("static histogram definition is valid"))
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total reconciliations by controller and status (success/error).
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "reconciliations_total",
        "Total number of reconciliations by controller and status",
        &["controller", "status"],
    )
});

/// Reconciliation duration by controller.
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram_vec(
        "reconciliation_duration_seconds",
        "Duration of reconciliations in seconds by controller",
        &["controller"],
        vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0],
    )
});

// ============================================================================
// Cloud Metrics
// ============================================================================

/// Agent pool API calls by operation and result.
pub static CLOUD_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "cloud_operations_total",
        "Total number of agent pool API operations by operation and result",
        &["operation", "result"],
    )
});

/// Agent pool API call duration, including LRO polling.
pub static CLOUD_OPERATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram_vec(
        "cloud_operation_duration_seconds",
        "Duration of agent pool API operations in seconds, including polling",
        &["operation"],
        vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0],
    )
});

// ============================================================================
// Instance Lifecycle Metrics
// ============================================================================

/// Instances created by cluster variant.
pub static INSTANCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "instances_created_total",
        "Total number of instances created by cluster variant",
        &["variant"],
    )
});

/// Instances deleted by cluster variant.
pub static INSTANCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "instances_deleted_total",
        "Total number of instances deleted by cluster variant",
        &["variant"],
    )
});

/// Time from pool creation finishing to its Node being resolved.
pub static NODE_RESOLUTION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram_vec(
        "node_resolution_duration_seconds",
        "Time spent waiting for the Node of a new agent pool, by outcome",
        &["outcome"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0],
    )
});

// ============================================================================
// Garbage Collection Metrics
// ============================================================================

/// Leaked resources reclaimed by kind (`AgentPool`, `Node`).
pub static GARBAGE_COLLECTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "garbage_collected_total",
        "Total number of leaked resources deleted by the garbage collector",
        &["resource_type"],
    )
});

/// Errors by resource kind and category.
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation.
pub fn record_reconciliation_success(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation.
pub fn record_reconciliation_error(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record one agent pool API call.
///
/// `result` is `success` or a short error label.
pub fn record_cloud_operation(operation: &str, result: &str, duration: Duration) {
    CLOUD_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
    CLOUD_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record an instance creation.
pub fn record_instance_created(variant: &str) {
    INSTANCES_CREATED_TOTAL.with_label_values(&[variant]).inc();
}

/// Record an instance deletion.
pub fn record_instance_deleted(variant: &str) {
    INSTANCES_DELETED_TOTAL.with_label_values(&[variant]).inc();
}

/// Record how long node resolution took (`resolved` or `timeout`).
pub fn record_node_resolution(outcome: &str, duration: Duration) {
    NODE_RESOLUTION_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Record a resource reclaimed by the garbage collector.
pub fn record_garbage_collected(resource_type: &str) {
    GARBAGE_COLLECTED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record an error.
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format.
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
