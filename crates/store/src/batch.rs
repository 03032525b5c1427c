//! Batch compensation for listener-side row filtering.
//!
//! Listeners can silently drop rows (authorization filtering, for example)
//! after the driver has already decided how many rows to fetch. The
//! compensator re-queries in growing windows until enough surviving rows are
//! collected to satisfy the originally requested page, then slices to the
//! exact page.

use tracing::warn;

use crate::context::{LoadContext, LoadQuery};
use crate::driver::LoadDriver;
use crate::entity::Entity;
use crate::error::StoreResult;
use crate::observers::ListenerRegistry;

/// Accumulate listener-filtered survivors in growing windows until the
/// requested `(first_result, max_results)` page is satisfiable, the source is
/// exhausted, or `round_limit` is hit (a short page is returned, never an
/// error).
///
/// `survivor_count` is the size of the first filtered batch; the growth
/// factor is inversely proportional to its survival rate. Window offsets
/// advance monotonically, so no window is fetched twice. Each raw batch is
/// re-announced through the loaded event so listeners filter incrementally.
pub(crate) async fn load_list_by_batches<E, D>(
    driver: &D,
    listeners: &ListenerRegistry<E>,
    context: &LoadContext<E>,
    query: &LoadQuery,
    survivor_count: usize,
    round_limit: usize,
) -> StoreResult<Vec<E>>
where
    E: Entity,
    D: LoadDriver<E>,
{
    let requested_first = query.first_result;
    let requested_max = query.max_results;

    // Absolute row count needed from offset 0 to satisfy the page.
    let expected_size = requested_first + requested_max;
    let factor = if survivor_count == 0 {
        2
    } else {
        (requested_max / survivor_count * 2).max(1)
    };

    let mut entities: Vec<E> = Vec::new();
    let mut first_result = 0;
    let max_results = (requested_first + requested_max) * factor;
    let mut round = 0;

    while entities.len() < expected_size {
        if round >= round_limit {
            warn!(context = ?context, rounds = round, "batch compensation hit the round ceiling, returning a short page");
            break;
        }
        round += 1;

        let batch_context = context.copy_with_window(first_result, max_results);
        let batch = driver.load_all(&batch_context).await?;
        if batch.is_empty() {
            break;
        }

        let survivors = listeners.fire_loaded(context, batch);
        entities.extend(survivors);
        first_result += max_results;
    }

    // The page owns its elements independently of the accumulator.
    let page: Vec<E> = entities
        .into_iter()
        .skip(requested_first)
        .take(requested_max)
        .collect();
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventDecision, EventKind};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

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

    /// Serves `rows` through the query window and records every window it is
    /// asked for.
    struct PageDriver {
        rows: Vec<Doc>,
        windows: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl PageDriver {
        fn new(row_count: i64) -> Self {
            Self {
                rows: (1..=row_count).map(|id| Doc { id }).collect(),
                windows: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn windows(&self) -> Vec<(usize, usize)> {
            self.windows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LoadDriver<Doc> for PageDriver {
        type Tx = ();

        async fn load_one(&self, _context: &LoadContext<Doc>) -> StoreResult<Option<Doc>> {
            Ok(self.rows.first().cloned())
        }

        async fn load_all(&self, context: &LoadContext<Doc>) -> StoreResult<Vec<Doc>> {
            let (first, max) = context
                .query()
                .map(|q| (q.first_result, q.max_results))
                .unwrap_or((0, 0));
            self.windows.lock().unwrap().push((first, max));
            let take = if max == 0 { usize::MAX } else { max };
            Ok(self.rows.iter().skip(first).take(take).cloned().collect())
        }

        async fn count_all(&self, _context: &LoadContext<Doc>) -> StoreResult<u64> {
            Ok(self.rows.len() as u64)
        }

        async fn begin_load(&self, _context: &LoadContext<Doc>) -> StoreResult<()> {
            Ok(())
        }

        async fn commit_load(
            &self,
            _tx: (),
            _context: &LoadContext<Doc>,
            _affected: &[Doc],
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn rollback_load(&self, _tx: ()) -> StoreResult<()> {
            Ok(())
        }
    }

    fn keep_multiples_of(registry: &ListenerRegistry<Doc>, divisor: i64) {
        registry.register(
            EventKind::Loaded,
            Arc::new(move |event| {
                let kept: Vec<Doc> = event
                    .entities()
                    .iter()
                    .filter(|doc| doc.id % divisor == 0)
                    .cloned()
                    .collect();
                EventDecision::replace(kept)
            }),
        );
    }

    #[tokio::test]
    async fn half_survival_fills_the_page_in_one_enlarged_round() {
        let driver = PageDriver::new(40);
        let registry = ListenerRegistry::new();
        keep_multiples_of(&registry, 2);

        let context = LoadContext::<Doc>::new().with_query(LoadQuery::new(0, 10));
        let query = LoadQuery::new(0, 10);

        // first naive fetch of 10 yielded 5 survivors
        let page = load_list_by_batches(&driver, &registry, &context, &query, 5, 100_000)
            .await
            .unwrap();

        assert_eq!(
            page.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20]
        );
        // factor = 10 / 5 * 2 = 4, so one window of (0 + 10) * 4 = 40
        assert_eq!(driver.windows(), vec![(0, 40)]);
    }

    #[tokio::test]
    async fn zero_survivors_starts_with_factor_two_and_advances_monotonically() {
        let driver = PageDriver::new(200);
        let registry = ListenerRegistry::new();
        keep_multiples_of(&registry, 20);

        let context = LoadContext::<Doc>::new().with_query(LoadQuery::new(0, 5));
        let query = LoadQuery::new(0, 5);

        let page = load_list_by_batches(&driver, &registry, &context, &query, 0, 100_000)
            .await
            .unwrap();

        assert_eq!(
            page.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![20, 40, 60, 80, 100]
        );

        // window size (0 + 5) * 2 = 10, offsets strictly advancing
        let windows = driver.windows();
        assert_eq!(windows.len(), 10);
        for (round, (first, max)) in windows.iter().enumerate() {
            assert_eq!(*first, round * 10);
            assert_eq!(*max, 10);
        }
    }

    #[tokio::test]
    async fn source_exhaustion_returns_a_short_page() {
        let driver = PageDriver::new(30);
        let registry = ListenerRegistry::new();
        keep_multiples_of(&registry, 10);

        let context = LoadContext::<Doc>::new().with_query(LoadQuery::new(0, 8));
        let query = LoadQuery::new(0, 8);

        let page = load_list_by_batches(&driver, &registry, &context, &query, 0, 100_000)
            .await
            .unwrap();

        // only 3 of 30 rows survive; the loop stops on the empty batch
        assert_eq!(
            page.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![10, 20, 30]
        );
    }

    #[tokio::test]
    async fn round_ceiling_stops_the_loop() {
        let driver = PageDriver::new(1000);
        let registry = ListenerRegistry::new();
        // drop everything: the page can never fill from row content
        registry.register(
            EventKind::Loaded,
            Arc::new(|_| EventDecision::replace(Vec::new())),
        );

        let context = LoadContext::<Doc>::new().with_query(LoadQuery::new(0, 5));
        let query = LoadQuery::new(0, 5);

        let page = load_list_by_batches(&driver, &registry, &context, &query, 0, 3)
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(driver.windows().len(), 3);
    }

    #[tokio::test]
    async fn nonzero_offset_is_honored_in_the_final_slice() {
        let driver = PageDriver::new(40);
        let registry = ListenerRegistry::new();
        keep_multiples_of(&registry, 2);

        let context = LoadContext::<Doc>::new().with_query(LoadQuery::new(5, 5));
        let query = LoadQuery::new(5, 5);

        let page = load_list_by_batches(&driver, &registry, &context, &query, 2, 100_000)
            .await
            .unwrap();

        // survivors are 2,4,..,40; page [5, 10) of them
        assert_eq!(
            page.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![12, 14, 16, 18, 20]
        );
    }
}
