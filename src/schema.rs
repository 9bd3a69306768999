//! Entity types and their reference maps.
//!
//! A [`Schema`] is the closed set of entity types the cache knows about.
//! Each type declares its relations: named, ordered edges to a list of
//! entities of another type (e.g. `team.projects → project`). Reads against
//! an undeclared type or relation fail with a configuration error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{CacheError, Result};

/// Sort direction sent with relation fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Server-side ordering for a relation (`orderKey` / `orderDirection`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationOrder {
    pub key: String,
    pub direction: OrderDirection,
}

impl RelationOrder {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A declared relation of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Entity type of the referenced ids.
    pub target: String,
    /// Ordering requested from the API, if any.
    pub order: Option<RelationOrder>,
}

/// A declared entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Path segment used by the REST API (e.g. `projects` in `/v1/projects/by/id`).
    pub path: String,
    pub relations: HashMap<String, RelationDef>,
}

/// The closed set of entity types and their reference maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    types: HashMap<String, TypeDef>,
}

impl Schema {
    /// Start an empty schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The community site schema: projects, users, teams and collections.
    pub fn community() -> Self {
        Self::builder()
            .entity("project")
            .entity("user")
            .entity("team")
            .entity("collection")
            .relation("project", "users", "user")
            .relation("project", "teams", "team")
            .relation("project", "collections", "collection")
            .ordered_relation("user", "projects", "project", RelationOrder::desc("updatedAt"))
            .relation("user", "teams", "team")
            .ordered_relation(
                "user",
                "collections",
                "collection",
                RelationOrder::desc("updatedAt"),
            )
            .relation("user", "pinnedProjects", "project")
            .ordered_relation(
                "user",
                "deletedProjects",
                "project",
                RelationOrder::desc("deletedAt"),
            )
            .ordered_relation("team", "projects", "project", RelationOrder::desc("updatedAt"))
            .relation("team", "users", "user")
            .ordered_relation(
                "team",
                "collections",
                "collection",
                RelationOrder::desc("updatedAt"),
            )
            .relation("team", "pinnedProjects", "project")
            .relation("collection", "projects", "project")
            .assemble()
    }

    /// Look up a declared entity type.
    pub fn entity(&self, entity_type: &str) -> Result<&TypeDef> {
        self.types
            .get(entity_type)
            .ok_or_else(|| CacheError::UnknownType(entity_type.to_string()))
    }

    /// Look up a declared relation of an entity type.
    pub fn relation(&self, entity_type: &str, relation: &str) -> Result<&RelationDef> {
        self.entity(entity_type)?
            .relations
            .get(relation)
            .ok_or_else(|| CacheError::UnknownRelation {
                entity_type: entity_type.to_string(),
                relation: relation.to_string(),
            })
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.types.contains_key(entity_type)
    }

    /// Declared entity type names, in no particular order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::community()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: HashMap<String, TypeDef>,
    relations: Vec<(String, String, RelationDef)>,
}

impl SchemaBuilder {
    /// Declare an entity type whose API path is its plural name.
    pub fn entity(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = format!("{name}s");
        self.entity_with_path(name, path)
    }

    /// Declare an entity type with an explicit API path segment.
    pub fn entity_with_path(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.types.insert(
            name.into(),
            TypeDef {
                path: path.into(),
                relations: HashMap::new(),
            },
        );
        self
    }

    /// Declare an unordered relation `parent.name → target`.
    pub fn relation(
        mut self,
        parent: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.relations.push((
            parent.into(),
            name.into(),
            RelationDef {
                target: target.into(),
                order: None,
            },
        ));
        self
    }

    /// Declare a relation with a server-side ordering.
    pub fn ordered_relation(
        mut self,
        parent: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        order: RelationOrder,
    ) -> Self {
        self.relations.push((
            parent.into(),
            name.into(),
            RelationDef {
                target: target.into(),
                order: Some(order),
            },
        ));
        self
    }

    /// Validate that every relation connects two declared types.
    pub fn build(self) -> Result<Schema> {
        for (parent, _, def) in &self.relations {
            if !self.types.contains_key(&def.target) {
                return Err(CacheError::UnknownType(def.target.clone()));
            }
            if !self.types.contains_key(parent) {
                return Err(CacheError::UnknownType(parent.clone()));
            }
        }
        Ok(self.assemble())
    }

    /// Attach relations to their parent types. Relations of undeclared
    /// parents are dropped; [`build`](Self::build) rejects them first.
    fn assemble(self) -> Schema {
        let mut types = self.types;
        for (parent, name, def) in self.relations {
            if let Some(parent_def) = types.get_mut(&parent) {
                parent_def.relations.insert(name, def);
            }
        }
        Schema { types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_schema_declares_core_relations() {
        let schema = Schema::community();
        assert_eq!(schema.relation("team", "projects").unwrap().target, "project");
        assert_eq!(schema.relation("team", "pinnedProjects").unwrap().target, "project");
        assert_eq!(schema.relation("collection", "projects").unwrap().target, "project");
        assert_eq!(schema.entity("project").unwrap().path, "projects");
    }

    #[test]
    fn community_relations_all_resolve() {
        let schema = Schema::community();
        let mut relations = 0;
        for entity_type in schema.entity_types() {
            for def in schema.entity(entity_type).unwrap().relations.values() {
                assert!(schema.contains(&def.target), "{entity_type} -> {}", def.target);
                relations += 1;
            }
        }
        assert_eq!(relations, 13);
    }

    #[test]
    fn unknown_type_and_relation_are_errors() {
        let schema = Schema::community();
        assert!(matches!(
            schema.entity("widget"),
            Err(CacheError::UnknownType(t)) if t == "widget"
        ));
        assert!(matches!(
            schema.relation("team", "widgets"),
            Err(CacheError::UnknownRelation { entity_type, relation })
                if entity_type == "team" && relation == "widgets"
        ));
    }

    #[test]
    fn builder_rejects_dangling_target() {
        let result = Schema::builder()
            .entity("team")
            .relation("team", "projects", "project")
            .build();
        assert!(matches!(result, Err(CacheError::UnknownType(t)) if t == "project"));
    }

    #[test]
    fn builder_rejects_undeclared_parent() {
        let result = Schema::builder()
            .entity("project")
            .relation("team", "projects", "project")
            .build();
        assert!(matches!(result, Err(CacheError::UnknownType(t)) if t == "team"));
    }

    #[test]
    fn custom_path_and_order() {
        let schema = Schema::builder()
            .entity_with_path("person", "people")
            .entity("thing")
            .ordered_relation("person", "things", "thing", RelationOrder::asc("name"))
            .build()
            .unwrap();
        assert_eq!(schema.entity("person").unwrap().path, "people");
        let order = schema.relation("person", "things").unwrap().order.clone().unwrap();
        assert_eq!(order.key, "name");
        assert_eq!(order.direction.as_str(), "ASC");
    }
}
