use std::time::Duration;

use rescache::{CacheError, Result};

#[test]
fn test_error_display() {
    let err = CacheError::UnknownType("widget".to_string());
    assert!(err.to_string().contains("widget"));

    let err = CacheError::UnknownRelation {
        entity_type: "team".into(),
        relation: "followers".into(),
    };
    let message = err.to_string();
    assert!(message.contains("team"));
    assert!(message.contains("followers"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(CacheError::NoApi)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Configuration vs fetch errors
// ============================================================================

#[test]
fn configuration_errors() {
    assert!(CacheError::UnknownType("x".into()).is_configuration());
    assert!(
        CacheError::UnknownRelation {
            entity_type: "x".into(),
            relation: "y".into()
        }
        .is_configuration()
    );
    assert!(CacheError::Configuration("bad".into()).is_configuration());
    assert!(CacheError::NoApi.is_configuration());
}

#[test]
fn fetch_errors_are_not_configuration() {
    assert!(!CacheError::Http("connection reset".into()).is_configuration());
    assert!(
        !CacheError::Api {
            status: 500,
            message: "internal".into()
        }
        .is_configuration()
    );
    assert!(!CacheError::NotFound("team/1".into()).is_configuration());
    assert!(
        !CacheError::RateLimited {
            retry_after: Some(Duration::from_secs(1))
        }
        .is_configuration()
    );
    assert!(!CacheError::Closed.is_configuration());
}

#[test]
fn json_errors_convert() {
    let err: CacheError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, CacheError::Json(_)));
}
