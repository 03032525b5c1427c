//! The load orchestrator: sequences lifecycle events, the transaction
//! bracket, and the persistence primitives for single, list, and count
//! operations.
//!
//! The orchestrator is stateless and reentrant. Each call owns its own
//! context, transaction handle, and accumulators; the listener registry is
//! the only shared state and is read-snapshotted per dispatch. Nothing is
//! spawned internally: driver calls are awaited on the caller's task.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::batch::load_list_by_batches;
use crate::config::StoreConfig;
use crate::context::LoadContext;
use crate::driver::LoadDriver;
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::events::{EventDecision, EventKind};
use crate::observers::{ListenerFn, ListenerRegistry};
use crate::reorder::reorder_by_ids;

/// Hook receiving failures the store absorbs instead of propagating.
pub type SwallowedErrorHook = dyn Fn(&StoreError) + Send + Sync;

/// Entity store front: loads, counts, and batches entities through a
/// [`LoadDriver`], dispatching lifecycle events around every primitive call.
///
/// Failure policy: everything that goes wrong between transaction begin and
/// commit is rolled back and absorbed — the caller gets a best-effort
/// (possibly empty) result and cannot tell "loaded nothing" from "failed
/// silently". The one exception is a missing identifier on an explicit-id
/// list load, which fails the call. Absorbed failures are logged and handed
/// to the hook installed via [`with_swallowed_hook`](Self::with_swallowed_hook).
pub struct EntityStore<E: Entity, D: LoadDriver<E>> {
    driver: D,
    listeners: ListenerRegistry<E>,
    config: StoreConfig,
    swallowed_hook: Option<Box<SwallowedErrorHook>>,
}

impl<E: Entity, D: LoadDriver<E>> EntityStore<E, D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, StoreConfig::default())
    }

    pub fn with_config(driver: D, config: StoreConfig) -> Self {
        Self {
            driver,
            listeners: ListenerRegistry::new(),
            config,
            swallowed_hook: None,
        }
    }

    /// Observe failures the swallow policy would otherwise discard.
    pub fn with_swallowed_hook(
        mut self,
        hook: impl Fn(&StoreError) + Send + Sync + 'static,
    ) -> Self {
        self.swallowed_hook = Some(Box::new(hook));
        self
    }

    /// Register a listener for one lifecycle event kind.
    pub fn register_listener(&self, kind: EventKind, listener: Arc<ListenerFn<E>>) {
        self.listeners.register(kind, listener);
    }

    /// Register a before-load gate.
    pub fn on_before_load(
        &self,
        f: impl Fn(&LoadContext<E>) -> EventDecision<E> + Send + Sync + 'static,
    ) {
        self.register_listener(EventKind::BeforeLoad, Arc::new(move |event| f(event.context())));
    }

    /// Register a loaded-batch filter.
    pub fn on_loaded(
        &self,
        f: impl Fn(&LoadContext<E>, &[E]) -> EventDecision<E> + Send + Sync + 'static,
    ) {
        self.register_listener(
            EventKind::Loaded,
            Arc::new(move |event| f(event.context(), event.entities())),
        );
    }

    /// Register a before-count gate.
    pub fn on_before_count(
        &self,
        f: impl Fn(&LoadContext<E>) -> EventDecision<E> + Send + Sync + 'static,
    ) {
        self.register_listener(
            EventKind::BeforeCount,
            Arc::new(move |event| f(event.context())),
        );
    }

    /// Register an after-load rewriter.
    pub fn on_after_load(
        &self,
        f: impl Fn(&LoadContext<E>, &[E]) -> EventDecision<E> + Send + Sync + 'static,
    ) {
        self.register_listener(
            EventKind::AfterLoad,
            Arc::new(move |event| f(event.context(), event.entities())),
        );
    }

    /// Load at most one entity.
    ///
    /// A before-load veto returns `None` without opening a transaction.
    /// Listeners on the loaded event may substitute a different entity or an
    /// empty result; the after-load event observes whatever the loaded event
    /// settled on and produces the returned value.
    pub async fn load(&self, context: &LoadContext<E>) -> Option<E> {
        if self.listeners.fire_before_load(context) {
            debug!(entity = E::entity_name(), "load prevented by listener");
            return None;
        }

        let mut entity: Option<E> = None;
        match self.driver.begin_load(context).await {
            Ok(tx) => match self.driver.load_one(context).await {
                Ok(loaded) => {
                    let survivors = self
                        .listeners
                        .fire_loaded(context, loaded.into_iter().collect());
                    entity = survivors.into_iter().next();
                    let affected: Vec<E> = entity.iter().cloned().collect();
                    if let Err(err) = self.driver.commit_load(tx, context, &affected).await {
                        self.absorb("commit", err);
                    }
                }
                Err(err) => {
                    self.absorb("load-one", err);
                    self.rollback(tx).await;
                }
            },
            Err(err) => self.absorb("begin", err),
        }

        let after = self
            .listeners
            .fire_after_load(context, entity.into_iter().collect());
        after.into_iter().next()
    }

    /// Load a list of entities.
    ///
    /// With an explicit id list the result preserves the requested order and
    /// length; a missing id rolls the bracket back and fails with
    /// [`StoreError::EntityAccess`] — no partial list, no after-load event.
    /// Without ids, listener filtering that shrinks a limited page triggers
    /// batch compensation up to the requested size.
    pub async fn load_list(&self, context: &LoadContext<E>) -> StoreResult<Vec<E>> {
        if self.listeners.fire_before_load(context) {
            debug!(entity = E::entity_name(), "list load prevented by listener");
            return Ok(Vec::new());
        }

        let mut result: Vec<E> = Vec::new();
        match self.driver.begin_load(context).await {
            Ok(tx) => match self.load_list_in_tx(context).await {
                Ok(list) => {
                    result = list;
                    if let Err(err) = self.driver.commit_load(tx, context, &result).await {
                        self.absorb("commit", err);
                    }
                }
                Err(err) => {
                    self.rollback(tx).await;
                    if err.is_entity_access() {
                        return Err(err);
                    }
                    self.absorb("load-list", err);
                }
            },
            Err(err) => self.absorb("begin", err),
        }

        Ok(self.listeners.fire_after_load(context, result))
    }

    /// Count entities matching the context.
    ///
    /// A before-count veto returns 0 without opening a transaction. When a
    /// listener elects item-mode counting, every row is materialized through
    /// the loaded-event pipeline so vetoed or filtered items are reflected in
    /// the count.
    pub async fn get_count(&self, context: &LoadContext<E>) -> u64 {
        let gate = self.listeners.fire_before_count(context);
        if gate.prevented {
            debug!(entity = E::entity_name(), "count prevented by listener");
            return 0;
        }

        let mut count = 0u64;
        match self.driver.begin_load(context).await {
            Ok(tx) => {
                let attempt = if gate.count_by_items {
                    self.count_by_items(context).await
                } else {
                    self.driver.count_all(context).await
                };
                match attempt {
                    Ok(value) => {
                        count = value;
                        if let Err(err) = self.driver.commit_load(tx, context, &[]).await {
                            self.absorb("commit", err);
                        }
                    }
                    Err(err) => {
                        self.absorb("count", err);
                        self.rollback(tx).await;
                    }
                }
            }
            Err(err) => self.absorb("begin", err),
        }
        count
    }

    async fn load_list_in_tx(&self, context: &LoadContext<E>) -> StoreResult<Vec<E>> {
        if context.ids().is_empty() {
            let raw = self.driver.load_all(context).await?;
            let raw_len = raw.len();
            let filtered = self.listeners.fire_loaded(context, raw);

            if filtered.len() != raw_len {
                if let Some(query) = context.query() {
                    if query.max_results != 0 {
                        return load_list_by_batches(
                            &self.driver,
                            &self.listeners,
                            context,
                            query,
                            filtered.len(),
                            self.config.batch_round_limit,
                        )
                        .await;
                    }
                }
            }
            Ok(filtered)
        } else {
            let raw = self.driver.load_all(context).await?;
            let filtered = self.listeners.fire_loaded(context, raw);
            reorder_by_ids::<E>(context.ids(), filtered)
        }
    }

    async fn count_by_items(&self, context: &LoadContext<E>) -> StoreResult<u64> {
        let count_context = context.copy_with_window(0, 0);
        let raw = self.driver.load_all(&count_context).await?;
        // the loaded event carries the caller's context, not the derived one
        let filtered = self.listeners.fire_loaded(context, raw);
        Ok(filtered.len() as u64)
    }

    async fn rollback(&self, tx: D::Tx) {
        if let Err(err) = self.driver.rollback_load(tx).await {
            self.absorb("rollback", err);
        }
    }

    fn absorb(&self, stage: &str, err: StoreError) {
        warn!(
            stage,
            error = %err,
            "load pipeline failure absorbed, continuing with best-effort result"
        );
        if let Some(hook) = &self.swallowed_hook {
            hook(&err);
        }
    }
}
