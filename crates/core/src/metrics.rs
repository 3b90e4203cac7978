//! Metric names, recorded through the `metrics` facade.
//!
//! Naming: `shelfshare_` prefix, `_total` suffix for counters.
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(
//!     shelfshare_core::metrics::FAVORITES_REMOTE_REQUESTS_TOTAL,
//!     shelfshare_core::metrics::LABEL_OPERATION => "toggle",
//!     shelfshare_core::metrics::LABEL_RESULT => "success",
//! )
//! .increment(1);
//! ```

// ─── label keys ────────────────────────────────────────────────────

/// Controller operation (load, toggle, add, remove)
pub const LABEL_OPERATION: &str = "operation";

/// success, failure
pub const LABEL_RESULT: &str = "result";

// ─── favorites ─────────────────────────────────────────────────────

/// Remote Store requests (counter, labels: operation, result)
pub const FAVORITES_REMOTE_REQUESTS_TOTAL: &str = "shelfshare_favorites_remote_requests_total";

/// Operations served from the local cache because the Remote Store failed
/// (counter, label: operation)
pub const FAVORITES_OFFLINE_FALLBACKS_TOTAL: &str =
    "shelfshare_favorites_offline_fallbacks_total";

/// Remote responses rejected as malformed (counter, label: operation)
pub const FAVORITES_MALFORMED_RESPONSES_TOTAL: &str =
    "shelfshare_favorites_malformed_responses_total";

/// Local cache writes that failed and were dropped (counter)
pub const FAVORITES_CACHE_WRITE_FAILURES_TOTAL: &str =
    "shelfshare_favorites_cache_write_failures_total";

/// Cache entries that existed but could not be parsed (counter)
pub const FAVORITES_CACHE_CORRUPT_TOTAL: &str = "shelfshare_favorites_cache_corrupt_total";
