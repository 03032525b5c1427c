//! Persistence and transaction primitives the store orchestrates.
//!
//! The store treats these as black boxes: it decides when they run and how
//! listeners observe their results, never how loading itself works.

use async_trait::async_trait;

use crate::context::LoadContext;
use crate::entity::Entity;
use crate::error::StoreResult;

/// Abstract load/count/transaction capability implemented by a persistence
/// collaborator.
///
/// The transaction handle is opaque: the store threads it from [`begin_load`]
/// to exactly one terminal call. Both terminals take the handle by value, so
/// a second terminal call on the same bracket is ruled out at the type level.
/// A failed commit consumes the handle; cleanup after a failed commit is the
/// driver's responsibility.
///
/// [`begin_load`]: LoadDriver::begin_load
#[async_trait]
pub trait LoadDriver<E: Entity>: Send + Sync {
    /// Opaque transaction handle.
    type Tx: Send;

    /// Load at most one entity matching the context.
    async fn load_one(&self, context: &LoadContext<E>) -> StoreResult<Option<E>>;

    /// Load all entities matching the context.
    async fn load_all(&self, context: &LoadContext<E>) -> StoreResult<Vec<E>>;

    /// Count entities matching the context.
    async fn count_all(&self, context: &LoadContext<E>) -> StoreResult<u64>;

    /// Open a transaction bracket around one load or count operation.
    async fn begin_load(&self, context: &LoadContext<E>) -> StoreResult<Self::Tx>;

    /// Commit the bracket. `affected` is the entity set the operation
    /// settled on after listener filtering.
    async fn commit_load(
        &self,
        tx: Self::Tx,
        context: &LoadContext<E>,
        affected: &[E],
    ) -> StoreResult<()>;

    /// Abort the bracket.
    async fn rollback_load(&self, tx: Self::Tx) -> StoreResult<()>;
}
