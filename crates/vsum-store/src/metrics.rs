//! Cache store metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Cache lookups by collection and outcome (hit/miss).
    pub const LOOKUPS_TOTAL: &str = "vsum_cache_lookups_total";

    /// Cache writes by collection.
    pub const WRITES_TOTAL: &str = "vsum_cache_writes_total";

    /// Transport retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "vsum_cache_retries_total";
}

/// Record a lookup against `collection` ("transcripts" or "summaries").
pub fn record_lookup(collection: &'static str, hit: bool) {
    counter!(
        names::LOOKUPS_TOTAL,
        "collection" => collection,
        "outcome" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_write(collection: &'static str) {
    counter!(names::WRITES_TOTAL, "collection" => collection).increment(1);
}

/// Record a transport retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
