//! Entity and relation records held by the store.

use std::collections::HashMap;

use serde_json::Value;
use tokio::time::Instant;

use crate::types::EntityId;

/// Monotonic tag attached to every write.
///
/// Fetches take a ticket when they are dispatched and direct writes take one
/// when they are made. A record refuses writes whose ticket is older than the
/// last one it applied, so a slow response cannot overwrite newer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WriteTicket(pub(crate) u64);

impl WriteTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Freshness of a record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Freshness {
    /// Never populated.
    Missing,
    /// Populated but past its TTL.
    Stale,
    Fresh,
}

/// Cached state of one `(type, id)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityRecord {
    /// Last known payload; `None` until the first write lands.
    pub value: Option<Value>,
    /// Set together with `value`.
    pub expires_at: Option<Instant>,
    /// Ticket of the last applied write or invalidation.
    pub written: u64,
    /// Set by invalidation, cleared by the next write.
    pub invalidated: bool,
    pub references: HashMap<String, RelationRecord>,
}

impl EntityRecord {
    pub fn freshness(&self, now: Instant) -> Freshness {
        match (&self.value, self.expires_at) {
            (Some(_), _) if self.invalidated => Freshness::Stale,
            (Some(_), Some(expires_at)) if now <= expires_at => Freshness::Fresh,
            (Some(_), Some(_)) => Freshness::Stale,
            _ => Freshness::Missing,
        }
    }
}

/// Cached id list of one relation of a record.
///
/// Expires independently of the records it points to.
#[derive(Debug, Clone)]
pub(crate) struct RelationRecord {
    pub ids: Vec<EntityId>,
    pub expires_at: Instant,
    pub written: u64,
    pub invalidated: bool,
}

impl RelationRecord {
    pub fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated && now <= self.expires_at
    }
}
