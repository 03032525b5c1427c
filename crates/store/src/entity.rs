//! Entity abstraction for the loading pipeline.
//!
//! The store never interprets entity contents beyond identity extraction and
//! counting, so the trait surface is deliberately small.

use std::fmt::Debug;
use std::hash::Hash;

/// A persisted value the store can load, count, and reorder by identity.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity type used for explicit-id loads and reordering.
    type Id: Clone + Eq + Hash + Debug + Send + Sync;

    /// Logical entity name, reported in access errors.
    fn entity_name() -> &'static str;

    /// Identity projection.
    fn id(&self) -> Self::Id;
}
