//! Listener registry: a multimap from event kind to registered listeners.
//!
//! Registration normally happens at configuration time, but dispatch
//! snapshots the listener list under a read lock and releases the lock before
//! any listener runs, so concurrent registration never blocks in-flight
//! loads. A listener added while a load is executing may or may not observe
//! that load's events; per-kind dispatch order is not part of the contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::LoadContext;
use crate::entity::Entity;
use crate::events::{CountMode, EventDecision, EventKind, LoadEvent};

/// Listener callback signature: consume one event, answer one decision.
pub type ListenerFn<E> = dyn Fn(&LoadEvent<'_, E>) -> EventDecision<E> + Send + Sync;

/// Folded outcome of the before-count dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountGate {
    pub prevented: bool,
    pub count_by_items: bool,
}

pub struct ListenerRegistry<E: Entity> {
    listeners: RwLock<HashMap<EventKind, Vec<Arc<ListenerFn<E>>>>>,
}

impl<E: Entity> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Register a listener for one event kind.
    pub fn register(&self, kind: EventKind, listener: Arc<ListenerFn<E>>) {
        let mut guard = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        guard.entry(kind).or_default().push(listener);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        let guard = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&kind).map_or(0, Vec::len)
    }

    fn snapshot(&self, kind: EventKind) -> Vec<Arc<ListenerFn<E>>> {
        let guard = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&kind).cloned().unwrap_or_default()
    }

    /// Fire the before-load event. Returns `true` when any listener vetoes.
    pub fn fire_before_load(&self, context: &LoadContext<E>) -> bool {
        let mut prevented = false;
        for listener in self.snapshot(EventKind::BeforeLoad) {
            let decision = (listener.as_ref())(&LoadEvent::BeforeLoad { context });
            prevented |= decision.prevented;
        }
        prevented
    }

    /// Fire the loaded event, threading the working list through each
    /// listener in turn; a listener replacing the list hands the replacement
    /// to the next one.
    pub fn fire_loaded(&self, context: &LoadContext<E>, mut entities: Vec<E>) -> Vec<E> {
        for listener in self.snapshot(EventKind::Loaded) {
            let decision = {
                let event = LoadEvent::Loaded {
                    context,
                    entities: &entities,
                };
                (listener.as_ref())(&event)
            };
            if let Some(replacement) = decision.result_override {
                entities = replacement;
            }
        }
        entities
    }

    /// Fire the before-count event and fold the gates: any veto prevents,
    /// any election of item mode sticks.
    pub fn fire_before_count(&self, context: &LoadContext<E>) -> CountGate {
        let mut gate = CountGate::default();
        for listener in self.snapshot(EventKind::BeforeCount) {
            let decision = (listener.as_ref())(&LoadEvent::BeforeCount { context });
            gate.prevented |= decision.prevented;
            gate.count_by_items |= decision.count_mode == CountMode::ByItems;
        }
        gate
    }

    /// Fire the after-load event, threading the settled list like
    /// [`fire_loaded`](Self::fire_loaded).
    pub fn fire_after_load(&self, context: &LoadContext<E>, mut entities: Vec<E>) -> Vec<E> {
        for listener in self.snapshot(EventKind::AfterLoad) {
            let decision = {
                let event = LoadEvent::AfterLoad {
                    context,
                    entities: &entities,
                };
                (listener.as_ref())(&event)
            };
            if let Some(replacement) = decision.result_override {
                entities = replacement;
            }
        }
        entities
    }
}

impl<E: Entity> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
