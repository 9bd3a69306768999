//! The REST API seam.
//!
//! [`ResourceApi`] is everything the request coordinator needs from the
//! backend: batched entity lookups and paged relation listings. The
//! [`RestClient`] implementation talks HTTP; tests substitute their own.

mod rest;

pub use rest::RestClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::types::EntityId;

/// One page of a relation listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Referenced entities, in the order the API returned them.
    pub items: Vec<Value>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    /// Cursor (URL) of the next page, present when `has_more` is set.
    #[serde(rename = "nextPage", default)]
    pub next_page: Option<String>,
}

/// Backend operations used by the coordinator.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Fetch entities of one type by id in a single call.
    ///
    /// Ids the backend does not know are simply absent from the result.
    async fn fetch_entities(&self, entity_type: &str, ids: &[EntityId]) -> Result<Vec<Value>>;

    /// Fetch one page of a parent's relation.
    ///
    /// `cursor` is `None` for the first page and the previous page's
    /// `next_page` afterwards.
    async fn fetch_relation_page(
        &self,
        entity_type: &str,
        id: &EntityId,
        relation: &str,
        cursor: Option<&str>,
    ) -> Result<Page>;
}
