//! Load request descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;

/// Paging and filtering window for a load or count request.
///
/// `max_results == 0` means "no limit", matching the persistence layers this
/// store fronts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadQuery {
    /// Offset of the first row to return.
    pub first_result: usize,
    /// Maximum number of rows to return; 0 means unbounded.
    pub max_results: usize,
    /// Opaque filter condition, interpreted by the driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl LoadQuery {
    pub fn new(first_result: usize, max_results: usize) -> Self {
        Self {
            first_result,
            max_results,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Describes one load or count request: an optional explicit identifier list
/// and an optional query window for the target entity type.
///
/// Cloning a context derives a modified sub-request (count-only variants,
/// batch sub-ranges) without touching the caller's original. When `ids` is
/// non-empty the query is never used for identity resolution.
#[derive(Clone)]
pub struct LoadContext<E: Entity> {
    ids: Vec<E::Id>,
    query: Option<LoadQuery>,
}

impl<E: Entity> LoadContext<E> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            query: None,
        }
    }

    pub fn with_ids(mut self, ids: Vec<E::Id>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_query(mut self, query: LoadQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn ids(&self) -> &[E::Id] {
        &self.ids
    }

    pub fn query(&self) -> Option<&LoadQuery> {
        self.query.as_ref()
    }

    /// Derive a copy whose query window is replaced. A context without a
    /// query stays query-less.
    pub(crate) fn copy_with_window(&self, first_result: usize, max_results: usize) -> Self {
        let mut copy = self.clone();
        if let Some(query) = &mut copy.query {
            query.first_result = first_result;
            query.max_results = max_results;
        }
        copy
    }
}

impl<E: Entity> Default for LoadContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for LoadContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("entity", &E::entity_name())
            .field("ids", &self.ids)
            .field("query", &self.query)
            .finish()
    }
}
