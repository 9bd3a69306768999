//! Fetch requests emitted by cache reads.

use serde::{Deserialize, Serialize};

use super::EntityId;

/// Follow-up fetch that a read needs in order to answer more completely.
///
/// Reads never fetch on their own; they return these and the caller submits
/// them to the request coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchRequest {
    /// Fetch entities of one type by id.
    Entities {
        entity_type: String,
        ids: Vec<EntityId>,
    },
    /// Fetch the full ordered id list of a parent's relation.
    Relation {
        entity_type: String,
        id: EntityId,
        relation: String,
    },
}

impl FetchRequest {
    /// Request a single entity.
    pub fn entity(entity_type: impl Into<String>, id: impl Into<EntityId>) -> Self {
        FetchRequest::Entities {
            entity_type: entity_type.into(),
            ids: vec![id.into()],
        }
    }

    /// Request several entities of the same type.
    pub fn entities<I, T>(entity_type: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        FetchRequest::Entities {
            entity_type: entity_type.into(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Request a relation of a parent entity.
    pub fn relation(
        entity_type: impl Into<String>,
        id: impl Into<EntityId>,
        relation: impl Into<String>,
    ) -> Self {
        FetchRequest::Relation {
            entity_type: entity_type.into(),
            id: id.into(),
            relation: relation.into(),
        }
    }

    /// Entity type this request targets (the parent type for relations).
    pub fn entity_type(&self) -> &str {
        match self {
            FetchRequest::Entities { entity_type, .. }
            | FetchRequest::Relation { entity_type, .. } => entity_type,
        }
    }

    /// Metric/log label for this request kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchRequest::Entities { .. } => "entities",
            FetchRequest::Relation { .. } => "relation",
        }
    }
}
