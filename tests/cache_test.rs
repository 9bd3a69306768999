//! End-to-end tests for [`ResourceCache`] over a mock REST server.

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rescache::{ApiConfig, CacheConfig, CacheError, ResourceCache, Status};

fn fast_config() -> CacheConfig {
    CacheConfig::new()
        .request_window(Duration::from_millis(20))
        .response_window(Duration::from_millis(5))
}

fn cache_for(server: &MockServer) -> ResourceCache {
    ResourceCache::builder()
        .config(fast_config())
        .rest(ApiConfig::new().base_url(server.uri()))
        .build()
        .unwrap()
}

const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// Builder
// =============================================================================

#[tokio::test]
async fn builder_requires_an_api() {
    let err = ResourceCache::builder().build().err().unwrap();
    assert!(matches!(err, CacheError::NoApi));
}

#[tokio::test]
async fn builder_rejects_invalid_settings() {
    let err = ResourceCache::builder()
        .config(CacheConfig::new().batch_size(0))
        .rest(ApiConfig::new())
        .build()
        .err()
        .unwrap();
    assert!(err.is_configuration());

    let err = ResourceCache::builder()
        .rest(ApiConfig::new().base_url("api.glitch.com"))
        .build()
        .err()
        .unwrap();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn unknown_type_surfaces_synchronously() {
    let server = MockServer::start().await;
    let cache = cache_for(&server);
    assert!(matches!(
        cache.get("widget", 1),
        Err(CacheError::UnknownType(_))
    ));
    assert!(cache.get_relation("team", 1, "widgets").is_err());
}

// =============================================================================
// Loading through the API
// =============================================================================

#[tokio::test]
async fn load_fetches_missing_entity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/by/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "p1": {"id": "p1", "domain": "foo"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    assert_eq!(cache.get("project", "p1").unwrap().status, Status::Loading);

    let project = tokio::time::timeout(WAIT, cache.load("project", "p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project, Some(json!({"id": "p1", "domain": "foo"})));

    // Fresh now: served from the store without another request.
    let lookup = cache.get("project", "p1").unwrap();
    assert!(lookup.is_ready());
    assert!(lookup.requests.is_empty());
}

#[tokio::test]
async fn load_relation_pages_through_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/by/id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "74": {"id": 74, "name": "glitch"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/by/id/projects"))
        .and(wiremock::matchers::query_param("cursor", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "c"}],
            "hasMore": false,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/by/id/projects"))
        .and(wiremock::matchers::query_param("id", "74"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "a"}, {"id": "b"}],
            "hasMore": true,
            "nextPage": format!("{}/v1/teams/by/id/projects?cursor=2", server.uri()),
        })))
        .mount(&server)
        .await;

    let cache = cache_for(&server);
    let projects = tokio::time::timeout(WAIT, cache.load_relation("team", 74, "projects"))
        .await
        .unwrap()
        .unwrap();

    let ids: Vec<_> = projects.iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
    assert!(cache.read("team", 74).unwrap().is_ready());
}

// =============================================================================
// Direct writes and notification
// =============================================================================

#[tokio::test]
async fn direct_writes_notify_subscribers() {
    let server = MockServer::start().await;
    let cache = cache_for(&server);
    let mut changes = cache.changes();

    // The stream yields the current generation first.
    assert_eq!(changes.next().await, Some(0));

    cache
        .store_entities("user", [json!({"id": 1, "login": "a"})])
        .unwrap();
    let generation = tokio::time::timeout(WAIT, changes.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation, 1);
    assert_eq!(cache.generation(), 1);
}

#[tokio::test]
async fn invalidate_and_reset() {
    let server = MockServer::start().await;
    let cache = cache_for(&server);

    cache
        .store_relation("collection", "c1", "projects", vec![json!({"id": "a"})])
        .unwrap();
    assert!(cache.read_relation("collection", "c1", "projects").unwrap().is_ready());

    cache.invalidate_relation("collection", "c1", "projects").unwrap();
    let lookup = cache.read_relation("collection", "c1", "projects").unwrap();
    assert_eq!(lookup.status, Status::Loading);
    assert_eq!(lookup.value, vec![json!({"id": "a"})]);

    cache.invalidate("project", "a").unwrap();
    let lookup = cache.read("project", "a").unwrap();
    assert_eq!(lookup.status, Status::Loading);
    assert_eq!(lookup.value, Some(json!({"id": "a"})));

    cache.reset();
    assert_eq!(cache.read("project", "a").unwrap().value, None);
}

#[tokio::test]
async fn clones_share_one_store() {
    let server = MockServer::start().await;
    let cache = cache_for(&server);
    let other = cache.clone();

    other.store_entities("team", [json!({"id": 3})]).unwrap();
    assert!(cache.read("team", 3).unwrap().is_ready());
}
