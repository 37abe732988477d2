//! Crawl progress, counted in project IDs.
//!
//! A crawl drives two observers: one spans the whole requested range and one
//! is restarted for every chunk. Both advance once per finished fetch,
//! whether the project turned out present or absent. A chunk skipped on
//! resume advances only the range observer, by the chunk's full length.

use std::sync::Arc;

/// Receives ID counts from a running crawl.
///
/// [`advance`](Self::advance) is called from every in-flight fetch of a
/// chunk, so implementations must take `&self` and tolerate interleaving.
pub trait ProgressObserver: Send + Sync {
    /// Restarts at zero out of `ids`, labelled `label`.
    fn begin(&self, ids: u64, label: String);

    /// `ids` more IDs have been accounted for.
    fn advance(&self, ids: u64);

    /// The span is done; leave `summary` on display.
    fn end(&self, summary: String);

    /// The span is done and nothing should stay on display.
    fn dismiss(&self);
}

/// Discards every update.
pub struct Silent;

impl ProgressObserver for Silent {
    fn begin(&self, _ids: u64, _label: String) {}
    fn advance(&self, _ids: u64) {}
    fn end(&self, _summary: String) {}
    fn dismiss(&self) {}
}

#[must_use]
pub fn silent() -> Arc<dyn ProgressObserver> {
    Arc::new(Silent)
}

/// The pair of observers a crawl reports to.
#[derive(Clone)]
pub struct CrawlProgress {
    /// Restarted for each chunk; sized to that chunk.
    pub chunk: Arc<dyn ProgressObserver>,
    /// Sized to the full range.
    pub total: Arc<dyn ProgressObserver>,
}

impl CrawlProgress {
    #[must_use]
    pub fn silent() -> Self {
        Self {
            chunk: silent(),
            total: silent(),
        }
    }

    /// Both observers, for ticking once per fetch.
    #[must_use]
    pub fn per_fetch(&self) -> [Arc<dyn ProgressObserver>; 2] {
        [self.chunk.clone(), self.total.clone()]
    }
}

impl Default for CrawlProgress {
    fn default() -> Self {
        Self::silent()
    }
}
