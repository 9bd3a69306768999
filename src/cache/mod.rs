//! The public cache handle.
//!
//! [`ResourceCache`] bundles the [`CacheStore`](crate::store::CacheStore)
//! and the request coordinator task. Handles are cheap to clone and share
//! one store; the coordinator stops once the last handle is dropped.
//!
//! Reads come in two flavours:
//!
//! - [`read`](ResourceCache::read) / [`read_relation`](ResourceCache::read_relation)
//!   are pure snapshots. Their [`Lookup::requests`] are left for the caller
//!   to [`submit`](ResourceCache::submit).
//! - [`get`](ResourceCache::get) / [`get_relation`](ResourceCache::get_relation)
//!   read and submit in one step, the way a rendering component registers
//!   interest in data.

mod builder;

pub use builder::ResourceCacheBuilder;

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use crate::coordinator::{Command, Shared};
use crate::schema::Schema;
use crate::types::{EntityId, FetchRequest, Lookup};
use crate::{CacheError, Result};

/// Handle to a shared resource cache.
#[derive(Clone)]
pub struct ResourceCache {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ResourceCache {
    /// Create a new builder for configuring the cache.
    pub fn builder() -> ResourceCacheBuilder {
        ResourceCacheBuilder::new()
    }

    pub(crate) fn new(shared: Arc<Shared>, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { shared, commands }
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(self.shared.read().schema())
    }

    // ========================================================================
    // Snapshot reads
    // ========================================================================

    /// Snapshot of one entity; see [`CacheStore::read`](crate::store::CacheStore::read).
    pub fn read(&self, entity_type: &str, id: impl Into<EntityId>) -> Result<Lookup<Option<Value>>> {
        self.shared.read().read(entity_type, id)
    }

    /// Snapshot of a relation; see
    /// [`CacheStore::read_relation`](crate::store::CacheStore::read_relation).
    pub fn read_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<Lookup<Vec<Value>>> {
        self.shared.read().read_relation(entity_type, id, relation)
    }

    /// Queue fetch requests for the next request window.
    ///
    /// Fails only if the coordinator task is gone.
    pub fn submit(&self, requests: impl IntoIterator<Item = FetchRequest>) -> Result<()> {
        let requests: Vec<FetchRequest> = requests.into_iter().collect();
        if requests.is_empty() {
            return Ok(());
        }
        self.commands
            .send(Command::Submit(requests))
            .map_err(|_| CacheError::Closed)
    }

    // ========================================================================
    // Reads that register interest
    // ========================================================================

    /// Read an entity and submit whatever it needs fetched.
    ///
    /// Never fails for data-availability reasons: missing data is reported as
    /// [`Status::Loading`](crate::Status::Loading).
    pub fn get(&self, entity_type: &str, id: impl Into<EntityId>) -> Result<Lookup<Option<Value>>> {
        let lookup = self.read(entity_type, id)?;
        self.submit_quietly(&lookup.requests);
        Ok(lookup)
    }

    /// Read a relation and submit whatever it needs fetched.
    pub fn get_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<Lookup<Vec<Value>>> {
        let lookup = self.read_relation(entity_type, id, relation)?;
        self.submit_quietly(&lookup.requests);
        Ok(lookup)
    }

    fn submit_quietly(&self, requests: &[FetchRequest]) {
        if let Err(e) = self.submit(requests.iter().cloned()) {
            warn!(error = %e, "fetch requests not submitted");
        }
    }

    /// Wait until an entity is ready and return it.
    ///
    /// Re-reads after every store change. A fetch that keeps failing leaves
    /// this pending; bound it with `tokio::time::timeout`.
    pub async fn load(&self, entity_type: &str, id: impl Into<EntityId>) -> Result<Option<Value>> {
        let id = id.into();
        let mut changes = self.subscribe();
        loop {
            let lookup = self.get(entity_type, &id)?;
            if lookup.is_ready() {
                return Ok(lookup.value);
            }
            changes.changed().await.map_err(|_| CacheError::Closed)?;
        }
    }

    /// Wait until a relation and every entity it references are ready.
    pub async fn load_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<Vec<Value>> {
        let id = id.into();
        let mut changes = self.subscribe();
        loop {
            let lookup = self.get_relation(entity_type, &id, relation)?;
            if lookup.is_ready() {
                return Ok(lookup.value);
            }
            changes.changed().await.map_err(|_| CacheError::Closed)?;
        }
    }

    // ========================================================================
    // Direct writes
    // ========================================================================

    /// Seed entities directly, e.g. after a successful local mutation.
    ///
    /// Takes precedence over any fetch already in flight for the same ids.
    pub fn store_entities(
        &self,
        entity_type: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<usize> {
        self.shared.write(|store| store.store_entities(entity_type, values))
    }

    /// Seed a relation's id list and its referenced entities.
    pub fn store_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        self.shared
            .write(|store| store.store_relation(entity_type, id, relation, values))
    }

    /// Mark an entity stale so the next read refreshes it.
    pub fn invalidate(&self, entity_type: &str, id: impl Into<EntityId>) -> Result<()> {
        self.shared.write(|store| store.invalidate(entity_type, id))
    }

    /// Mark a relation's id list stale so the next read refreshes it.
    pub fn invalidate_relation(
        &self,
        entity_type: &str,
        id: impl Into<EntityId>,
        relation: &str,
    ) -> Result<()> {
        self.shared
            .write(|store| store.invalidate_relation(entity_type, id, relation))
    }

    /// Drop every cached record.
    pub fn reset(&self) {
        self.shared.write(|store| store.reset());
    }

    // ========================================================================
    // Change notification
    // ========================================================================

    /// Receiver of the store's change generation, bumped on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }

    /// Stream of change generations, starting with the current one.
    pub fn changes(&self) -> Pin<Box<dyn Stream<Item = u64> + Send>> {
        Box::pin(WatchStream::new(self.subscribe()))
    }

    /// Current change generation.
    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }
}
