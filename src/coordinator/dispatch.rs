//! Executing merged requests against the API.

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ResourceApi;
use crate::schema::Schema;
use crate::store::WriteTicket;
use crate::telemetry;
use crate::CacheError;
use crate::types::{EntityId, FetchRequest};

/// What a dispatched request produced.
#[derive(Debug)]
pub(crate) enum Fetched {
    Entities {
        entity_type: String,
        values: Vec<Value>,
    },
    /// Every page of the relation arrived.
    Relation {
        entity_type: String,
        id: EntityId,
        relation: String,
        values: Vec<Value>,
    },
    /// Relation paging stopped early. The entities from the pages that did
    /// arrive are still worth storing; the id list is not.
    Partial { target: String, values: Vec<Value> },
    Failed,
}

impl Fetched {
    pub fn is_failed(&self) -> bool {
        matches!(self, Fetched::Failed)
    }
}

/// A finished fetch on its way back to the coordinator.
#[derive(Debug)]
pub(crate) struct Completion {
    pub request: FetchRequest,
    pub ticket: WriteTicket,
    pub fetched: Fetched,
}

/// Run one merged request to completion, following relation pages.
///
/// Failures are logged and counted, never returned: the request is simply
/// dropped and the affected records stay loading.
pub(crate) async fn execute(
    api: &dyn ResourceApi,
    schema: &Schema,
    request: &FetchRequest,
) -> Fetched {
    match request {
        FetchRequest::Entities { entity_type, ids } => {
            metrics::counter!(telemetry::REQUESTS_DISPATCHED_TOTAL, "kind" => "entities")
                .increment(1);
            metrics::histogram!(telemetry::BATCH_SIZE).record(ids.len() as f64);
            match api.fetch_entities(entity_type, ids).await {
                Ok(values) => {
                    debug!(
                        %entity_type,
                        requested = ids.len(),
                        received = values.len(),
                        "fetched entities"
                    );
                    Fetched::Entities {
                        entity_type: entity_type.clone(),
                        values,
                    }
                }
                Err(e) => {
                    fetch_failed(request, &e);
                    Fetched::Failed
                }
            }
        }
        FetchRequest::Relation {
            entity_type,
            id,
            relation,
        } => {
            let target = match schema.relation(entity_type, relation) {
                Ok(def) => def.target.clone(),
                Err(e) => {
                    fetch_failed(request, &e);
                    return Fetched::Failed;
                }
            };

            let mut values = Vec::new();
            let mut cursor: Option<String> = None;
            let mut pages = 0u32;
            loop {
                metrics::counter!(telemetry::REQUESTS_DISPATCHED_TOTAL, "kind" => "relation")
                    .increment(1);
                let page = match api
                    .fetch_relation_page(entity_type, id, relation, cursor.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        fetch_failed(request, &e);
                        return partial(target, values);
                    }
                };
                pages += 1;
                values.extend(page.items);

                if !page.has_more {
                    break;
                }
                match page.next_page {
                    Some(next) => cursor = Some(next),
                    None => {
                        warn!(
                            %entity_type,
                            %id,
                            %relation,
                            pages,
                            "relation page reported more results without a cursor"
                        );
                        metrics::counter!(telemetry::FETCH_ERRORS_TOTAL, "kind" => "relation")
                            .increment(1);
                        return partial(target, values);
                    }
                }
            }

            debug!(
                %entity_type,
                %id,
                %relation,
                pages,
                items = values.len(),
                "fetched relation"
            );
            Fetched::Relation {
                entity_type: entity_type.clone(),
                id: id.clone(),
                relation: relation.clone(),
                values,
            }
        }
    }
}

fn partial(target: String, values: Vec<Value>) -> Fetched {
    if values.is_empty() {
        Fetched::Failed
    } else {
        Fetched::Partial { target, values }
    }
}

fn fetch_failed(request: &FetchRequest, error: &CacheError) {
    warn!(
        kind = request.kind(),
        entity_type = request.entity_type(),
        error = %error,
        "dropping failed fetch"
    );
    metrics::counter!(telemetry::FETCH_ERRORS_TOTAL, "kind" => request.kind()).increment(1);
}
