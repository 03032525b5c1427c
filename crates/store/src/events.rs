//! Lifecycle events fired around load and count operations.
//!
//! Events are created immediately before dispatch, consumed synchronously by
//! the registered listeners, and discarded when dispatch returns; they are
//! never stored or queued. Listeners answer with an [`EventDecision`] instead
//! of mutating the event, so each dispatch is an explicit request/response
//! exchange.

use crate::context::LoadContext;
use crate::entity::Entity;

/// Tag identifying which lifecycle point an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired before any load work; listeners may veto the whole operation.
    BeforeLoad,
    /// Fired after each physical load call with the raw batch; listeners may
    /// filter or rewrite it.
    Loaded,
    /// Fired before a count; listeners may veto or elect item-mode counting.
    BeforeCount,
    /// Fired last with the settled result; listeners may rewrite it.
    AfterLoad,
}

/// A lifecycle event, borrowed from the in-flight operation.
pub enum LoadEvent<'a, E: Entity> {
    BeforeLoad {
        context: &'a LoadContext<E>,
    },
    Loaded {
        context: &'a LoadContext<E>,
        entities: &'a [E],
    },
    BeforeCount {
        context: &'a LoadContext<E>,
    },
    AfterLoad {
        context: &'a LoadContext<E>,
        entities: &'a [E],
    },
}

impl<'a, E: Entity> LoadEvent<'a, E> {
    pub fn kind(&self) -> EventKind {
        match self {
            LoadEvent::BeforeLoad { .. } => EventKind::BeforeLoad,
            LoadEvent::Loaded { .. } => EventKind::Loaded,
            LoadEvent::BeforeCount { .. } => EventKind::BeforeCount,
            LoadEvent::AfterLoad { .. } => EventKind::AfterLoad,
        }
    }

    pub fn context(&self) -> &'a LoadContext<E> {
        match self {
            LoadEvent::BeforeLoad { context }
            | LoadEvent::Loaded { context, .. }
            | LoadEvent::BeforeCount { context }
            | LoadEvent::AfterLoad { context, .. } => *context,
        }
    }

    /// Current working entities, empty for the variants that carry none.
    pub fn entities(&self) -> &'a [E] {
        match self {
            LoadEvent::Loaded { entities, .. } | LoadEvent::AfterLoad { entities, .. } => *entities,
            LoadEvent::BeforeLoad { .. } | LoadEvent::BeforeCount { .. } => &[],
        }
    }
}

/// How a count should be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountMode {
    /// Delegate to the driver's count primitive.
    #[default]
    Query,
    /// Materialize every row through the loaded-event pipeline and count the
    /// survivors.
    ByItems,
}

/// A listener's answer to a single event.
#[derive(Clone)]
pub struct EventDecision<E> {
    /// Veto the load or count outright.
    pub prevented: bool,
    /// Replace the working result with this list.
    pub result_override: Option<Vec<E>>,
    /// Count production mode, consulted only for `BeforeCount`.
    pub count_mode: CountMode,
}

impl<E> Default for EventDecision<E> {
    fn default() -> Self {
        Self {
            prevented: false,
            result_override: None,
            count_mode: CountMode::Query,
        }
    }
}

impl<E> EventDecision<E> {
    /// Let the operation proceed untouched.
    pub fn proceed() -> Self {
        Self::default()
    }

    /// Veto the operation.
    pub fn prevent() -> Self {
        Self {
            prevented: true,
            ..Self::default()
        }
    }

    /// Replace the working result list.
    pub fn replace(entities: Vec<E>) -> Self {
        Self {
            result_override: Some(entities),
            ..Self::default()
        }
    }

    /// Replace the working result with a single entity, or clear it.
    pub fn replace_one(entity: Option<E>) -> Self {
        Self::replace(entity.into_iter().collect())
    }

    /// Elect item-mode counting.
    pub fn count_by_items() -> Self {
        Self {
            count_mode: CountMode::ByItems,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: i64,
    }

    impl Entity for Doc {
        type Id = i64;

        fn entity_name() -> &'static str {
            "doc"
        }

        fn id(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn event_kind_mapping() {
        let context = LoadContext::<Doc>::new();
        let entities = [Doc { id: 1 }];

        assert_eq!(
            LoadEvent::BeforeLoad { context: &context }.kind(),
            EventKind::BeforeLoad
        );
        assert_eq!(
            LoadEvent::Loaded {
                context: &context,
                entities: &entities
            }
            .kind(),
            EventKind::Loaded
        );
        assert_eq!(
            LoadEvent::BeforeCount { context: &context }.kind(),
            EventKind::BeforeCount
        );
        assert_eq!(
            LoadEvent::AfterLoad {
                context: &context,
                entities: &entities
            }
            .kind(),
            EventKind::AfterLoad
        );
    }

    #[test]
    fn entities_accessor_is_empty_for_gate_events() {
        let context = LoadContext::<Doc>::new();
        assert!(LoadEvent::BeforeLoad { context: &context }.entities().is_empty());
        assert!(LoadEvent::BeforeCount { context: &context }.entities().is_empty());
    }

    #[test]
    fn decision_constructors() {
        let proceed = EventDecision::<Doc>::proceed();
        assert!(!proceed.prevented);
        assert!(proceed.result_override.is_none());
        assert_eq!(proceed.count_mode, CountMode::Query);

        let prevent = EventDecision::<Doc>::prevent();
        assert!(prevent.prevented);

        let replaced = EventDecision::replace_one(Some(Doc { id: 7 }));
        assert_eq!(replaced.result_override.unwrap(), vec![Doc { id: 7 }]);

        let cleared = EventDecision::<Doc>::replace_one(None);
        assert_eq!(cleared.result_override.unwrap(), Vec::<Doc>::new());

        let by_items = EventDecision::<Doc>::count_by_items();
        assert_eq!(by_items.count_mode, CountMode::ByItems);
    }
}
