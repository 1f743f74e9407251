//! Metric instrument factories for redis-unique-queue.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without one installed these are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("redis-unique-queue")
}

/// Counter: queue operations that touched Redis.
/// Labels: `queue`, `operation` ("push" | "pop" | "pop_multi" | "pop_all" | "remove" | ...).
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("unique_queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: transactions that lost the race and were retried.
/// Labels: `queue`.
pub fn transaction_conflicts() -> Counter<u64> {
    meter()
        .u64_counter("unique_queue.transaction.conflicts")
        .with_description("Number of aborted WATCH/MULTI/EXEC commits")
        .build()
}

/// Histogram: operation duration in milliseconds, retries included.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("unique_queue.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
