//! Aggregator
//!
//! Bounded fan-out/gather: one task per identifier, results reassembled in
//! input order. Either every unit succeeds or the page fails.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn, Instrument};

use crate::error::{AppError, Result};
use crate::hydrate::SummaryFetcher;

// == Constants ==
/// Default number of fetches allowed in flight per run
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

// == Aggregation Unit ==
/// Outcome of one unit of work; `seq` is its input position.
#[derive(Debug)]
pub struct AggregationUnit<T> {
    pub id: i64,
    pub seq: usize,
    pub result: Result<T>,
}

// == Aggregator ==
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    max_concurrency: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl Aggregator {
    /// A limit of 0 is raised to 1.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    // == Run ==
    /// Fetches every id and returns the items in input order.
    ///
    /// All units run to completion even when one fails; the failure with the
    /// lowest `seq` is returned.
    pub async fn run<F>(&self, site_id: i64, ids: &[i64], fetcher: Arc<F>) -> Result<Vec<F::Item>>
    where
        F: SummaryFetcher,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, mut rx) = mpsc::channel::<AggregationUnit<F::Item>>(ids.len());

        for (seq, &id) in ids.iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| AppError::Internal("aggregator semaphore closed".to_string()))?;
            let fetcher = fetcher.clone();
            let tx = tx.clone();

            tokio::spawn(
                async move {
                    let result = fetcher.fetch(site_id, id).await;
                    drop(permit);
                    // Receiver outlives all senders; a failed send means gather gave up
                    let _ = tx.send(AggregationUnit { id, seq, result }).await;
                }
                .instrument(tracing::debug_span!("aggregate_unit", seq, id)),
            );
        }
        drop(tx);

        // Gather
        let mut units = Vec::with_capacity(ids.len());
        while let Some(unit) = rx.recv().await {
            units.push(unit);
        }

        if units.len() != ids.len() {
            warn!(
                expected = ids.len(),
                received = units.len(),
                "aggregation units were lost"
            );
            return Err(AppError::Internal(format!(
                "{} of {} aggregation units did not complete",
                ids.len() - units.len(),
                ids.len()
            )));
        }

        units.sort_by_key(|unit| unit.seq);

        let mut items = Vec::with_capacity(units.len());
        for unit in units {
            match unit.result {
                Ok(item) => items.push(item),
                Err(e) => {
                    debug!(seq = unit.seq, id = unit.id, error = %e, "aggregation unit failed");
                    return Err(AppError::aggregation(unit.seq, unit.id, e));
                }
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the id after a delay that is larger for smaller ids,
    /// so completion order is the reverse of input order.
    struct Echo {
        fail: HashSet<i64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Echo {
        fn failing(fail: &[i64]) -> Self {
            Self {
                fail: fail.iter().copied().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SummaryFetcher for Echo {
        type Item = i64;

        async fn fetch(&self, _site_id: i64, id: i64) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = 40u64.saturating_sub(id.unsigned_abs() % 40);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail.contains(&id) {
                Err(AppError::NotFound(format!("item {id} not found")))
            } else {
                Ok(id * 10)
            }
        }
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let fetcher = Arc::new(Echo::failing(&[]));
        let ids = vec![5, 1, 9, 3, 7, 2];

        let items = Aggregator::new(8).run(1, &ids, fetcher).await.unwrap();

        assert_eq!(items, vec![50, 10, 90, 30, 70, 20]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let fetcher = Arc::new(Echo::failing(&[]));
        let items = Aggregator::default().run(1, &[], fetcher.clone()).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_limit() {
        let fetcher = Arc::new(Echo::failing(&[]));
        let ids: Vec<i64> = (1..=30).collect();

        let items = Aggregator::new(3).run(1, &ids, fetcher.clone()).await.unwrap();

        assert_eq!(items.len(), 30);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_failure_reports_lowest_seq_after_all_units_ran() {
        let fetcher = Arc::new(Echo::failing(&[4, 8]));
        let ids = vec![1, 8, 2, 4];

        let err = Aggregator::new(4).run(1, &ids, fetcher.clone()).await.unwrap_err();

        match err {
            AppError::AggregationFailed { seq, id, source } => {
                assert_eq!(seq, 1);
                assert_eq!(id, 8);
                assert!(matches!(*source, AppError::NotFound(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_limit_is_raised_to_one() {
        let aggregator = Aggregator::new(0);
        assert_eq!(aggregator.max_concurrency(), 1);

        let fetcher = Arc::new(Echo::failing(&[]));
        let items = aggregator.run(1, &[3, 2, 1], fetcher.clone()).await.unwrap();

        assert_eq!(items, vec![30, 20, 10]);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_units_keep_their_cache_writes() {
        use crate::cache::{CacheKey, EntityKind, MemoryBackend, Scope, ScopedCache};
        use crate::db::{tests::profile, Database};
        use crate::hydrate::CachedFetcher;
        use crate::models::ProfileSummary;

        let db = Database::new();
        let existing = db
            .run_in_transaction(|t| Ok(profile(t, 1, 10, "ana")))
            .await
            .unwrap();
        let cache = ScopedCache::new(Arc::new(MemoryBackend::new(100)));
        let fetcher = Arc::new(CachedFetcher::<ProfileSummary, Database>::new(
            cache.clone(),
            Arc::new(db),
            Duration::from_secs(60),
        ));

        let err = Aggregator::new(4)
            .run(1, &[existing, 999], fetcher)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AggregationFailed { seq: 1, id: 999, .. }));

        let key = CacheKey::scoped(EntityKind::Profile, Scope::Summary, existing);
        let kept = cache.get_record::<ProfileSummary>(&key).await;
        assert_eq!(kept.map(|p| p.profile_name), Some("ana".to_string()));
    }
}
