//! Cache Store: the in-memory table of entities and relations.
//!
//! [`CacheStore`] answers "what do we know about entity X (or X's relation
//! R)?" and reports what must be fetched to answer more completely. Reads
//! are synchronous and side-effect free: follow-up fetches come back in
//! [`Lookup::requests`] for the caller to submit.
//!
//! # Freshness
//!
//! Every populated record and every relation id list carries its own expiry
//! (`now + ttl` at write time). Expired data is still returned
//! (stale-while-revalidate) with status [`Status::Loading`] and a refresh
//! request, so consumers never regress to a blank state.
//!
//! # Write ordering
//!
//! Writes are tagged with a [`WriteTicket`]. A record ignores writes older
//! than the last one it applied; see [`CacheStore::issue_ticket`].

mod record;

pub use record::WriteTicket;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::DEFAULT_TTL;
use crate::schema::Schema;
use crate::telemetry;
use crate::types::{EntityId, FetchRequest, Lookup};
use crate::Result;

use record::{EntityRecord, Freshness, RelationRecord};

/// In-memory, TTL-based, reference-aware entity table.
///
/// Owned explicitly (no global state); share it behind a lock when several
/// tasks need it, as [`ResourceCache`](crate::ResourceCache) does.
pub struct CacheStore {
    schema: Arc<Schema>,
    ttl: Duration,
    tables: HashMap<String, HashMap<EntityId, EntityRecord>>,
    tickets: AtomicU64,
    /// Ticket of the last reset; older writes are discarded.
    reset_floor: u64,
}

impl CacheStore {
    /// Create an empty store with the default TTL (5 minutes).
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            ttl: DEFAULT_TTL,
            tables: HashMap::new(),
            tickets: AtomicU64::new(0),
            reset_floor: 0,
        }
    }

    /// Set how long written data stays fresh.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the next write ticket.
    ///
    /// Tickets increase monotonically. Take one when a fetch is dispatched
    /// and pass it to [`apply_entities`](Self::apply_entities) /
    /// [`apply_relation`](Self::apply_relation) when the response arrives.
    pub fn issue_ticket(&self) -> WriteTicket {
        WriteTicket(self.tickets.fetch_add(1, Ordering::Relaxed) + 1)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read one entity.
    ///
    /// Returns ready with the value when fresh. When missing or stale,
    /// returns loading with the last known value (if any) and a fetch
    /// request for the id. The "no entity" sentinel resolves to a ready
    /// `None` without a request.
    pub fn read(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
    ) -> Result<Lookup<Option<Value>>> {
        self.schema.entity(entity_type)?;
        let id = id.into();
        if id.is_absent() {
            return Ok(Lookup::ready(None));
        }

        let record = self.record(entity_type, &id);
        let freshness = record.map_or(Freshness::Missing, |r| r.freshness(Instant::now()));
        let outcome = match freshness {
            Freshness::Fresh => "hit",
            Freshness::Stale => "stale",
            Freshness::Missing => "miss",
        };
        metrics::counter!(telemetry::LOOKUPS_TOTAL,
            "entity_type" => entity_type.to_owned(),
            "outcome" => outcome,
        )
        .increment(1);

        let value = record.and_then(|r| r.value.clone());
        Ok(match freshness {
            Freshness::Fresh => Lookup::ready(value),
            _ => Lookup::loading(value, vec![FetchRequest::entity(entity_type, id)]),
        })
    }

    /// Read a relation of an entity as the ordered list of referenced values.
    ///
    /// - Parent never seen: loading, requests the parent and the relation.
    /// - Id list missing or stale: loading with whatever referenced values are
    ///   cached, requests the relation.
    /// - Id list fresh: ready only if every referenced entity is fresh;
    ///   otherwise loading with one batched request for exactly the missing
    ///   or stale ids.
    ///
    /// Values follow the stored id order; ids with no cached value are
    /// skipped.
    pub fn read_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<Lookup<Vec<Value>>> {
        let target = self.schema.relation(entity_type, relation)?.target.as_str();
        let id = id.into();
        if id.is_absent() {
            return Ok(Lookup::ready(Vec::new()));
        }

        let Some(parent) = self.record(entity_type, &id) else {
            return Ok(Lookup::loading(
                Vec::new(),
                vec![
                    FetchRequest::entity(entity_type, id.clone()),
                    FetchRequest::relation(entity_type, id, relation),
                ],
            ));
        };

        let Some(edge) = parent.references.get(relation) else {
            return Ok(Lookup::loading(
                Vec::new(),
                vec![FetchRequest::relation(entity_type, id, relation)],
            ));
        };

        let now = Instant::now();
        let mut values = Vec::with_capacity(edge.ids.len());
        let mut refresh = Vec::new();
        for child_id in edge.ids.iter().filter(|c| !c.is_absent()) {
            let child = self.record(target, child_id);
            if let Some(value) = child.and_then(|c| c.value.as_ref()) {
                values.push(value.clone());
            }
            let fresh = child.is_some_and(|c| c.freshness(now) == Freshness::Fresh);
            if !fresh {
                refresh.push(child_id.clone());
            }
        }

        if !edge.is_fresh(now) {
            return Ok(Lookup::loading(
                values,
                vec![FetchRequest::relation(entity_type, id, relation)],
            ));
        }
        if refresh.is_empty() {
            Ok(Lookup::ready(values))
        } else {
            Ok(Lookup::loading(values, vec![FetchRequest::entities(target, refresh)]))
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Upsert entities by their `id` field and mark them fresh.
    ///
    /// A write replaces the whole value (no field merge). Values without an
    /// `id` are skipped. Returns the number of records written.
    pub fn store_entities(
        &mut self,
        entity_type: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<usize> {
        let ticket = self.issue_ticket();
        self.apply_entities(entity_type, values, ticket)
    }

    /// Store a relation's ordered id list and the referenced entities.
    ///
    /// The parent record is created as a placeholder if it has never been
    /// seen, so the relation can be answered before the parent itself loads.
    pub fn store_relation(
        &mut self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let ticket = self.issue_ticket();
        self.apply_relation(entity_type, id, relation, values, ticket)
    }

    /// [`store_entities`](Self::store_entities) with an explicit ticket.
    ///
    /// Records that already applied a newer write or invalidation keep
    /// their value. Writes issued before the last [`reset`](Self::reset)
    /// are dropped entirely.
    pub fn apply_entities(
        &mut self,
        entity_type: &str,
        values: impl IntoIterator<Item = Value>,
        ticket: WriteTicket,
    ) -> Result<usize> {
        self.schema.entity(entity_type)?;
        if ticket.0 < self.reset_floor {
            reject_stale_write(entity_type, ticket, self.reset_floor);
            return Ok(0);
        }
        let expires_at = Instant::now() + self.ttl;
        let table = self.tables.entry(entity_type.to_string()).or_default();

        let mut written = 0;
        for value in values {
            let Some(id) = EntityId::of(&value) else {
                warn!(entity_type, "skipping entity without an id");
                continue;
            };
            let record = table.entry(id).or_default();
            if ticket.0 < record.written {
                reject_stale_write(entity_type, ticket, record.written);
                continue;
            }
            record.value = Some(value);
            record.expires_at = Some(expires_at);
            record.written = ticket.0;
            record.invalidated = false;
            written += 1;
        }
        Ok(written)
    }

    /// [`store_relation`](Self::store_relation) with an explicit ticket.
    pub fn apply_relation(
        &mut self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
        values: Vec<Value>,
        ticket: WriteTicket,
    ) -> Result<()> {
        let target = self.schema.relation(entity_type, relation)?.target.clone();
        if ticket.0 < self.reset_floor {
            reject_stale_write(entity_type, ticket, self.reset_floor);
            return Ok(());
        }
        let id = id.into();
        let ids: Vec<EntityId> = values.iter().filter_map(EntityId::of).collect();
        let expires_at = Instant::now() + self.ttl;

        let parent = self
            .tables
            .entry(entity_type.to_string())
            .or_default()
            .entry(id)
            .or_default();
        match parent.references.get(relation) {
            Some(edge) if ticket.0 < edge.written => {
                reject_stale_write(entity_type, ticket, edge.written);
            }
            _ => {
                parent.references.insert(
                    relation.to_string(),
                    RelationRecord {
                        ids,
                        expires_at,
                        written: ticket.0,
                        invalidated: false,
                    },
                );
            }
        }

        self.apply_entities(&target, values, ticket)?;
        Ok(())
    }

    /// Mark an entity stale, keeping its value. The next read re-requests it.
    ///
    /// Takes a ticket, so responses to fetches dispatched before the
    /// invalidation are rejected.
    pub fn invalidate(&mut self, entity_type: &str, id: impl Into<EntityId>) -> Result<()> {
        self.schema.entity(entity_type)?;
        let ticket = self.issue_ticket();
        if let Some(record) = self.record_mut(entity_type, &id.into()) {
            if record.value.is_some() {
                record.invalidated = true;
                record.written = ticket.0;
            }
        }
        Ok(())
    }

    /// Mark a relation's id list stale, keeping the ids.
    pub fn invalidate_relation(
        &mut self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<()> {
        self.schema.relation(entity_type, relation)?;
        let ticket = self.issue_ticket();
        if let Some(edge) = self
            .record_mut(entity_type, &id.into())
            .and_then(|r| r.references.get_mut(relation))
        {
            edge.invalidated = true;
            edge.written = ticket.0;
        }
        Ok(())
    }

    /// Drop every record, along with any write issued before the reset.
    pub fn reset(&mut self) {
        debug!(records = self.len(), "resetting cache store");
        self.reset_floor = self.issue_ticket().0;
        self.tables.clear();
    }

    /// Number of entity records, placeholders included.
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, entity_type: &str, id: &EntityId) -> Option<&EntityRecord> {
        self.tables.get(entity_type).and_then(|t| t.get(id))
    }

    fn record_mut(&mut self, entity_type: &str, id: &EntityId) -> Option<&mut EntityRecord> {
        self.tables.get_mut(entity_type).and_then(|t| t.get_mut(id))
    }
}

fn reject_stale_write(entity_type: &str, ticket: WriteTicket, current: u64) {
    debug!(
        entity_type,
        ticket = ticket.0,
        current,
        "ignoring write older than the last applied one"
    );
    metrics::counter!(telemetry::STALE_WRITES_REJECTED_TOTAL,
        "entity_type" => entity_type.to_owned(),
    )
    .increment(1);
}
