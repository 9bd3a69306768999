//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::{Value, json};

use rescache::{
    CacheConfig, CacheError, CacheStore, EntityId, Page, ResourceApi, ResourceCache, Result,
    Schema, telemetry,
};

// ============================================================================
// Mock API
// ============================================================================

struct EchoApi;

#[async_trait]
impl ResourceApi for EchoApi {
    async fn fetch_entities(&self, _entity_type: &str, ids: &[EntityId]) -> Result<Vec<Value>> {
        Ok(ids.iter().map(|id| json!({"id": id})).collect())
    }

    async fn fetch_relation_page(
        &self,
        _entity_type: &str,
        _id: &EntityId,
        _relation: &str,
        _cursor: Option<&str>,
    ) -> Result<Page> {
        Err(CacheError::Http("relations unavailable".into()))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a name and, optionally, one label.
fn counter_total(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            label.is_none_or(|(k, v)| {
                key.key()
                    .labels()
                    .any(|label| label.key() == k && label.value() == v)
            })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn histogram_values(snapshot: &SnapshotVec, name: &str) -> Vec<f64> {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
        .flat_map(|(_, _, _, value)| match value {
            DebugValue::Histogram(values) => values.iter().map(|v| v.into_inner()).collect(),
            _ => Vec::new(),
        })
        .collect()
}

// ============================================================================
// Store metrics
// ============================================================================

#[test]
fn lookups_are_counted_by_outcome() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let mut store = CacheStore::new(Schema::community());
        store.read("project", "p1").unwrap();
        store
            .store_entities("project", vec![json!({"id": "p1"})])
            .unwrap();
        store.read("project", "p1").unwrap();
        store.read("project", "p1").unwrap();
        store.invalidate("project", "p1").unwrap();
        store.read("project", "p1").unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let name = telemetry::LOOKUPS_TOTAL;
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "miss"))), 1);
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "hit"))), 2);
    assert_eq!(counter_total(&snapshot, name, Some(("outcome", "stale"))), 1);
    assert_eq!(counter_total(&snapshot, name, Some(("entity_type", "project"))), 4);
}

#[test]
fn rejected_writes_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let mut store = CacheStore::new(Schema::community());
        let older = store.issue_ticket();
        store
            .store_entities("user", vec![json!({"id": 1, "v": "new"})])
            .unwrap();
        let written = store
            .apply_entities("user", vec![json!({"id": 1, "v": "old"})], older)
            .unwrap();
        assert_eq!(written, 0);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::STALE_WRITES_REJECTED_TOTAL, None),
        1
    );
}

// ============================================================================
// Coordinator metrics
// ============================================================================

/// Runs the cache on a current-thread runtime so every spawned task sees the
/// thread-local recorder.
#[test]
fn dispatches_and_failures_are_recorded() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let cache = ResourceCache::builder()
                .api(Arc::new(EchoApi))
                .config(
                    CacheConfig::new()
                        .request_window(Duration::from_millis(10))
                        .response_window(Duration::from_millis(5))
                        .batch_size(2),
                )
                .build()
                .unwrap();
            cache
                .submit([
                    rescache::FetchRequest::entities("user", [1, 2, 3]),
                    rescache::FetchRequest::relation("team", 9, "projects"),
                ])
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let dispatched = telemetry::REQUESTS_DISPATCHED_TOTAL;
    assert_eq!(counter_total(&snapshot, dispatched, Some(("kind", "entities"))), 2);
    assert_eq!(counter_total(&snapshot, dispatched, Some(("kind", "relation"))), 1);
    assert_eq!(
        counter_total(&snapshot, telemetry::FETCH_ERRORS_TOTAL, Some(("kind", "relation"))),
        1
    );

    let mut sizes = histogram_values(&snapshot, telemetry::BATCH_SIZE);
    sizes.sort_by(f64::total_cmp);
    assert_eq!(sizes, vec![1.0, 2.0]);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let mut store = CacheStore::new(Schema::community());
    store.read("team", 1).unwrap();
    store.store_entities("team", vec![json!({"id": 1})]).unwrap();
}
