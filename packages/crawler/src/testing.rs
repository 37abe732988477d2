//! Test doubles shared by the engine's unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use scratch_top_fetcher::Fetcher;
use scratch_top_models::{FetchOutcome, Record};

use crate::progress::ProgressObserver;

pub fn record(id: u64, views: u64) -> Record {
    Record {
        id,
        title: format!("Project {id}"),
        creator: format!("user{id}"),
        views,
    }
}

/// Serves canned records; every other ID is absent.
#[derive(Default)]
pub struct StubFetcher {
    records: BTreeMap<u64, Record>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            ..Self::default()
        }
    }

    /// Every ID in `ids` is present with views derived from the ID.
    pub fn dense(ids: impl IntoIterator<Item = u64>) -> Self {
        Self::new(ids.into_iter().map(|id| record(id, id * 7 % 1_000)))
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for StubFetcher {
    async fn fetch(&self, id: u64) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.records
            .get(&id)
            .cloned()
            .map_or(FetchOutcome::Absent, FetchOutcome::Present)
    }
}

/// Records every progress call.
#[derive(Default)]
pub struct CountingProgress {
    pub ticks: AtomicU64,
    pub total: AtomicU64,
    pub messages: Mutex<Vec<String>>,
    pub finished: AtomicUsize,
}

impl CountingProgress {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for CountingProgress {
    fn begin(&self, ids: u64, label: String) {
        self.total.store(ids, Ordering::SeqCst);
        self.ticks.store(0, Ordering::SeqCst);
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(label);
    }

    fn advance(&self, ids: u64) {
        self.ticks.fetch_add(ids, Ordering::SeqCst);
    }

    fn end(&self, _summary: String) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}
