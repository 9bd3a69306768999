//! Request deduplication, merging and chunking.

use std::collections::HashSet;

use crate::types::{EntityId, FetchRequest};

/// Collapse a window's worth of requests into the calls to dispatch.
///
/// - Entity requests of the same type are unioned (distinct ids, first-seen
///   order) and split into chunks of at most `batch_size` ids.
/// - Identical relation requests collapse to one; relations of different
///   parents stay separate.
/// - "No entity" sentinel ids are dropped.
///
/// Entity batches come first (types in first-seen order), then relations.
pub fn merge_requests(
    requests: impl IntoIterator<Item = FetchRequest>,
    batch_size: usize,
) -> Vec<FetchRequest> {
    let mut entity_groups: Vec<(String, Vec<EntityId>, HashSet<EntityId>)> = Vec::new();
    let mut relations = Vec::new();
    let mut seen_relations = HashSet::new();

    for request in requests {
        match request {
            FetchRequest::Entities { entity_type, ids } => {
                let index = match entity_groups.iter().position(|(t, _, _)| *t == entity_type) {
                    Some(index) => index,
                    None => {
                        entity_groups.push((entity_type, Vec::new(), HashSet::new()));
                        entity_groups.len() - 1
                    }
                };
                let (_, ordered, seen) = &mut entity_groups[index];
                for id in ids {
                    if !id.is_absent() && seen.insert(id.clone()) {
                        ordered.push(id);
                    }
                }
            }
            FetchRequest::Relation { id, .. } if id.is_absent() => {}
            relation @ FetchRequest::Relation { .. } => {
                if seen_relations.insert(relation.clone()) {
                    relations.push(relation);
                }
            }
        }
    }

    let batch_size = batch_size.max(1);
    let mut merged = Vec::new();
    for (entity_type, ids, _) in entity_groups {
        for chunk in ids.chunks(batch_size) {
            merged.push(FetchRequest::Entities {
                entity_type: entity_type.clone(),
                ids: chunk.to_vec(),
            });
        }
    }
    merged.extend(relations);
    merged
}
