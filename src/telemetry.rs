//! Telemetry metric name constants.
//!
//! Centralised metric names for cache operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `rescache_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `entity_type`: configured entity type (e.g. "project", "team")
//! - `outcome`: lookup outcome: "hit", "stale" or "miss"
//! - `kind`: request kind: "entities" or "relation"

/// Total entity lookups answered by the store.
///
/// Labels: `entity_type`, `outcome` ("hit" | "stale" | "miss").
pub const LOOKUPS_TOTAL: &str = "rescache_lookups_total";

/// Total network requests dispatched by the coordinator (after merging and
/// chunking; each relation page counts once).
///
/// Labels: `kind` ("entities" | "relation").
pub const REQUESTS_DISPATCHED_TOTAL: &str = "rescache_requests_dispatched_total";

/// Total fetches dropped because the API call failed.
///
/// Labels: `kind` ("entities" | "relation").
pub const FETCH_ERRORS_TOTAL: &str = "rescache_fetch_errors_total";

/// Number of ids per dispatched entity batch.
pub const BATCH_SIZE: &str = "rescache_batch_size";

/// Total writes rejected because a newer write had already been applied.
///
/// Labels: `entity_type`.
pub const STALE_WRITES_REJECTED_TOTAL: &str = "rescache_stale_writes_rejected_total";
