//! Queue operation span helpers.

use tracing::Span;

/// Start a span for one queue operation.
///
/// `queue.items` is declared empty and filled in by [`record_count`] once
/// the operation knows how many items it moved.
pub fn start_queue_span(queue: &str, operation: &str) -> Span {
    tracing::info_span!(
        "queue.op",
        "queue.name" = queue,
        "queue.operation" = operation,
        "queue.items" = tracing::field::Empty,
    )
}

pub fn record_count(span: &Span, items: usize) {
    span.record("queue.items", items as u64);
}
