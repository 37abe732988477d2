//! Concurrent crawl of a single ID range.

use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use scratch_top_fetcher::Fetcher;
use scratch_top_models::{FetchOutcome, IdRange, Record};

use crate::admission::AdmissionController;
use crate::progress::ProgressObserver;

/// Fetches every ID in `range` and returns the records that were present.
///
/// One future per ID is scheduled up front; each waits for an admission
/// slot before calling the fetcher, so at most
/// [`AdmissionController::capacity`] requests are in flight. Outcomes are
/// drained in completion order, so the returned records are in no
/// particular order. Each completion, present or absent, advances every
/// observer in `progress` by one.
///
/// Dropping the returned future abandons all in-flight fetches and releases
/// their slots.
pub async fn crawl<F: Fetcher>(
    fetcher: &F,
    admission: &AdmissionController,
    range: IdRange,
    progress: &[Arc<dyn ProgressObserver>],
) -> Vec<Record> {
    let mut pending = range
        .ids()
        .map(|id| async move {
            let Ok(_slot) = admission.admit().await else {
                log::error!("Admission closed; skipping project {id}");
                return FetchOutcome::Absent;
            };
            fetcher.fetch(id).await
        })
        .collect::<FuturesUnordered<_>>();

    let mut records = Vec::new();

    while let Some(outcome) = pending.next().await {
        if let FetchOutcome::Present(record) = outcome {
            records.push(record);
        }
        for observer in progress {
            observer.advance(1);
        }
    }

    log::debug!(
        "Crawled {range}: {} of {} present",
        records.len(),
        range.len()
    );

    records
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use scratch_top_models::Leaderboard;

    use super::*;
    use crate::testing::{CountingProgress, StubFetcher, record};

    fn admission(capacity: usize) -> AdmissionController {
        AdmissionController::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[tokio::test]
    async fn collects_present_records_and_ranks_them() {
        let fetcher = StubFetcher::new([record(1, 10), record(3, 50), record(5, 30)]);
        let range = IdRange::new(1, 5).unwrap();

        let records = crawl(&fetcher, &admission(4), range, &[]).await;
        assert_eq!(records.len(), 3);

        let board = Leaderboard::rank(records, 2);
        let top: Vec<(u64, u64)> = board.iter().map(|r| (r.id, r.views)).collect();
        assert_eq!(top, vec![(3, 50), (5, 30)]);
    }

    #[tokio::test]
    async fn fetches_every_id_once() {
        let fetcher = StubFetcher::dense(1..=200);
        let range = IdRange::new(1, 300).unwrap();

        let mut records = crawl(&fetcher, &admission(16), range, &[]).await;
        records.sort_by_key(|r| r.id);

        assert_eq!(fetcher.calls(), 300);
        assert_eq!(
            records.iter().map(|r| r.id).collect::<Vec<_>>(),
            (1..=200).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn respects_admission_capacity() {
        let fetcher = StubFetcher::dense(0..100).with_delay(Duration::from_millis(2));
        let admission = admission(5);

        crawl(&fetcher, &admission, IdRange::new(0, 99).unwrap(), &[]).await;

        assert!(fetcher.peak() <= 5, "peak was {}", fetcher.peak());
        assert!(fetcher.peak() > 1, "fetches never overlapped");
        assert_eq!(admission.in_flight(), 0);
    }

    #[tokio::test]
    async fn ticks_every_observer_per_id() {
        let fetcher = StubFetcher::new([record(2, 1)]);
        let chunk = Arc::new(CountingProgress::default());
        let total = Arc::new(CountingProgress::default());
        let observers: Vec<Arc<dyn ProgressObserver>> = vec![chunk.clone(), total.clone()];

        crawl(&fetcher, &admission(2), IdRange::new(1, 9).unwrap(), &observers).await;

        assert_eq!(chunk.ticks(), 9);
        assert_eq!(total.ticks(), 9);
    }

    #[tokio::test]
    async fn all_absent_yields_nothing() {
        let fetcher = StubFetcher::default();
        let records = crawl(&fetcher, &admission(3), IdRange::new(10, 20).unwrap(), &[]).await;
        assert!(records.is_empty());
    }
}
