//! Entity identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a cached entity.
///
/// The API mixes numeric ids (users, teams) with string ids (project
/// domains, collection slugs), so both are accepted. Serialises untagged,
/// i.e. as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl EntityId {
    /// Sentinel for "no related entity" (e.g. an absent foreign key).
    ///
    /// Reads with this id resolve immediately to an empty, ready result and
    /// never reach the network.
    pub const NONE: EntityId = EntityId::Int(-1);

    /// Whether this id is a "no entity" sentinel: [`EntityId::NONE`] or an
    /// empty string.
    pub fn is_absent(&self) -> bool {
        match self {
            EntityId::Int(n) => *n == -1,
            EntityId::Str(s) => s.is_empty(),
        }
    }

    /// Extract an id from a JSON value (a number or a string).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EntityId::Int),
            Value::String(s) => Some(EntityId::Str(s.clone())),
            _ => None,
        }
    }

    /// Extract the `id` field of an entity payload.
    pub fn of(entity: &Value) -> Option<Self> {
        entity.get("id").and_then(Self::from_json)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{n}"),
            EntityId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        EntityId::Int(n.into())
    }
}

impl From<u32> for EntityId {
    fn from(n: u32) -> Self {
        EntityId::Int(n.into())
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Str(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Str(s)
    }
}

impl From<&EntityId> for EntityId {
    fn from(id: &EntityId) -> Self {
        id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinels_are_absent() {
        assert!(EntityId::NONE.is_absent());
        assert!(EntityId::from("").is_absent());
        assert!(!EntityId::from(0).is_absent());
        assert!(!EntityId::from("p1").is_absent());
    }

    #[test]
    fn extracts_numeric_and_string_ids() {
        assert_eq!(EntityId::of(&json!({"id": 74})), Some(EntityId::Int(74)));
        assert_eq!(
            EntityId::of(&json!({"id": "p1"})),
            Some(EntityId::Str("p1".into()))
        );
        assert_eq!(EntityId::of(&json!({"name": "no id"})), None);
        assert_eq!(EntityId::of(&json!({"id": true})), None);
    }

    #[test]
    fn displays_as_query_value() {
        assert_eq!(EntityId::from(74).to_string(), "74");
        assert_eq!(EntityId::from("my-project").to_string(), "my-project");
    }

    #[test]
    fn serialises_untagged() {
        assert_eq!(serde_json::to_value(EntityId::from(7)).unwrap(), json!(7));
        let id: EntityId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, EntityId::from("abc"));
    }
}
