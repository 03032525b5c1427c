//! Restores caller-requested identifier order on id-based list loads.

use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};

/// Reorder `entities` to match the caller's `ids`, failing fast on the first
/// identifier with no loaded counterpart — partial results are never
/// returned. Duplicate identities in the loaded set resolve last-write-wins;
/// a repeated requested id yields the same entity at each position.
pub fn reorder_by_ids<E: Entity>(ids: &[E::Id], entities: Vec<E>) -> StoreResult<Vec<E>> {
    let mut by_id: HashMap<E::Id, E> = HashMap::with_capacity(entities.len());
    for entity in entities {
        by_id.insert(entity.id(), entity);
    }

    let mut result = Vec::with_capacity(ids.len());
    for id in ids {
        match by_id.get(id) {
            Some(entity) => result.push(entity.clone()),
            None => return Err(StoreError::entity_access::<E>(id)),
        }
    }
    Ok(result)
}
