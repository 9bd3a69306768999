//! Request Coordinator: turns read-side fetch requests into network calls.
//!
//! # Architecture
//!
//! One task owns two debounced queues:
//!
//! - **Pending requests.** [`FetchRequest`]s submitted by readers accumulate
//!   for `request_window` after the first one arrives. At window close they
//!   are filtered against in-flight fetches, merged (see
//!   [`merge_requests`]) and dispatched, each on its own task.
//! - **Pending responses.** Completed fetches accumulate for
//!   `response_window` and are then applied to the store in one write pass,
//!   which bumps the change generation once.
//!
//! The two windows are independent; nothing orders a dispatch in one
//! request window against an unrelated response window.
//!
//! Failed fetches are dropped. The affected records stay loading until a
//! later read submits the request again.

mod dispatch;
mod merge;

pub use merge::merge_requests;

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::api::ResourceApi;
use crate::config::CacheConfig;
use crate::store::CacheStore;
use crate::types::{EntityId, FetchRequest};

use dispatch::{Completion, Fetched};

/// Store plus change notification, shared by every handle and the
/// coordinator task.
pub(crate) struct Shared {
    store: RwLock<CacheStore>,
    changes: watch::Sender<u64>,
}

impl Shared {
    pub fn new(store: CacheStore) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store: RwLock::new(store),
            changes,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, CacheStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the store and notify subscribers once.
    pub fn write<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        let result = {
            let mut store: RwLockWriteGuard<'_, CacheStore> =
                self.store.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut store)
        };
        self.changes.send_modify(|generation| *generation += 1);
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.changes.borrow()
    }
}

/// Messages accepted by the coordinator task.
#[derive(Debug)]
pub(crate) enum Command {
    Submit(Vec<FetchRequest>),
}

/// Keys with a dispatched fetch whose response has not been applied yet.
#[derive(Debug, Default)]
struct InFlight {
    entities: HashSet<(String, EntityId)>,
    relations: HashSet<(String, EntityId, String)>,
}

impl InFlight {
    /// Drop requests (or ids) that are already being fetched.
    fn exclude(&self, requests: Vec<FetchRequest>) -> Vec<FetchRequest> {
        requests
            .into_iter()
            .filter_map(|request| match request {
                FetchRequest::Entities {
                    entity_type,
                    mut ids,
                } => {
                    ids.retain(|id| !self.entities.contains(&(entity_type.clone(), id.clone())));
                    (!ids.is_empty()).then_some(FetchRequest::Entities { entity_type, ids })
                }
                FetchRequest::Relation {
                    entity_type,
                    id,
                    relation,
                } => {
                    let key = (entity_type, id, relation);
                    (!self.relations.contains(&key)).then(|| FetchRequest::Relation {
                        entity_type: key.0,
                        id: key.1,
                        relation: key.2,
                    })
                }
            })
            .collect()
    }

    fn insert(&mut self, request: &FetchRequest) {
        match request {
            FetchRequest::Entities { entity_type, ids } => {
                for id in ids {
                    self.entities.insert((entity_type.clone(), id.clone()));
                }
            }
            FetchRequest::Relation {
                entity_type,
                id,
                relation,
            } => {
                self.relations
                    .insert((entity_type.clone(), id.clone(), relation.clone()));
            }
        }
    }

    fn release(&mut self, request: &FetchRequest) {
        match request {
            FetchRequest::Entities { entity_type, ids } => {
                for id in ids {
                    self.entities.remove(&(entity_type.clone(), id.clone()));
                }
            }
            FetchRequest::Relation {
                entity_type,
                id,
                relation,
            } => {
                self.relations
                    .remove(&(entity_type.clone(), id.clone(), relation.clone()));
            }
        }
    }

    fn len(&self) -> usize {
        self.entities.len() + self.relations.len()
    }
}

/// The task that owns the request and response queues.
pub(crate) struct Coordinator {
    shared: Arc<Shared>,
    api: Arc<dyn ResourceApi>,
    config: CacheConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    pending: Vec<FetchRequest>,
    responses: Vec<Completion>,
    in_flight: InFlight,
}

impl Coordinator {
    /// Spawn the coordinator task and return its command channel.
    ///
    /// The task stops once every sender has been dropped.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(
        shared: Arc<Shared>,
        api: Arc<dyn ResourceApi>,
        config: CacheConfig,
    ) -> mpsc::UnboundedSender<Command> {
        let (tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let coordinator = Self {
            shared,
            api,
            config,
            commands,
            completions_tx,
            completions,
            pending: Vec::new(),
            responses: Vec::new(),
            in_flight: InFlight::default(),
        };
        tokio::spawn(coordinator.run());
        tx
    }

    async fn run(mut self) {
        let mut request_deadline: Option<Instant> = None;
        let mut response_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Submit(requests)) => {
                        if requests.is_empty() {
                            continue;
                        }
                        self.pending.extend(requests);
                        request_deadline
                            .get_or_insert_with(|| Instant::now() + self.config.request_window);
                    }
                    None => {
                        debug!(in_flight = self.in_flight.len(), "cache handles dropped, stopping coordinator");
                        break;
                    }
                },
                Some(completion) = self.completions.recv() => {
                    self.responses.push(completion);
                    response_deadline
                        .get_or_insert_with(|| Instant::now() + self.config.response_window);
                }
                _ = sleep_until(request_deadline.unwrap_or_else(Instant::now)), if request_deadline.is_some() => {
                    request_deadline = None;
                    self.flush_requests();
                }
                _ = sleep_until(response_deadline.unwrap_or_else(Instant::now)), if response_deadline.is_some() => {
                    response_deadline = None;
                    self.flush_responses();
                }
            }
        }
    }

    /// Close the request window: filter, merge, and dispatch.
    fn flush_requests(&mut self) {
        let submitted = std::mem::take(&mut self.pending);
        let submitted_count = submitted.len();
        let batches = merge_requests(self.in_flight.exclude(submitted), self.config.batch_size);
        debug!(
            submitted = submitted_count,
            dispatched = batches.len(),
            "closing request window"
        );

        for request in batches {
            self.in_flight.insert(&request);
            let ticket = self.shared.read().issue_ticket();
            let api = Arc::clone(&self.api);
            let schema = Arc::clone(self.shared.read().schema());
            let tx = self.completions_tx.clone();
            tokio::spawn(async move {
                let fetched = dispatch::execute(api.as_ref(), &schema, &request).await;
                // The coordinator may have stopped; nothing left to update.
                let _ = tx.send(Completion {
                    request,
                    ticket,
                    fetched,
                });
            });
        }
    }

    /// Close the response window: apply every completion in one write.
    fn flush_responses(&mut self) {
        let completions = std::mem::take(&mut self.responses);
        for completion in &completions {
            self.in_flight.release(&completion.request);
        }
        if completions.iter().all(|c| c.fetched.is_failed()) {
            return;
        }

        debug!(responses = completions.len(), "applying fetched data");
        self.shared.write(|store| {
            for completion in completions {
                let ticket = completion.ticket;
                let applied = match completion.fetched {
                    Fetched::Entities {
                        entity_type,
                        values,
                    } => store.apply_entities(&entity_type, values, ticket).map(|_| ()),
                    Fetched::Relation {
                        entity_type,
                        id,
                        relation,
                        values,
                    } => store.apply_relation(&entity_type, id, &relation, values, ticket),
                    Fetched::Partial { target, values } => {
                        store.apply_entities(&target, values, ticket).map(|_| ())
                    }
                    Fetched::Failed => Ok(()),
                };
                if let Err(e) = applied {
                    warn!(error = %e, "failed to apply fetched data");
                }
            }
        });
    }
}
