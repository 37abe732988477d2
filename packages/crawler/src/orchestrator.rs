//! Sequential, chunk-at-a-time crawl of a large ID range.
//!
//! Each chunk moves through `Crawling -> Ranking -> Persisted` before the
//! next chunk starts. Only fetches within a chunk overlap. If the crawl is
//! dropped part-way, every chunk persisted so far stays valid and the chunk
//! in progress leaves nothing behind.

use std::num::NonZeroU64;
use std::time::{Duration, Instant};

use scratch_top_fetcher::Fetcher;
use scratch_top_models::{IdRange, Leaderboard};

use crate::CrawlError;
use crate::admission::AdmissionController;
use crate::crawl::crawl;
use crate::progress::CrawlProgress;
use crate::store::{ArtifactStore, CrawlManifest};

/// What to do with artifacts already present in the store when a chunked
/// crawl starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingArtifacts {
    /// Refuse to start, so stale chunks never leak into the merge.
    #[default]
    Fail,
    /// Keep them and skip their chunks (resume an interrupted crawl). Only
    /// allowed when the store's manifest matches the crawl exactly.
    Reuse,
    /// Delete them before crawling.
    Replace,
}

/// Counters describing a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Chunks fetched during this run.
    pub chunks_crawled: usize,
    /// Chunks skipped because their artifact already existed.
    pub chunks_reused: usize,
    /// IDs fetched during this run.
    pub ids_attempted: u64,
    /// IDs that produced a record during this run.
    pub records_found: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

/// Drives a range through the crawler one chunk at a time, persisting each
/// chunk's leaderboard to an [`ArtifactStore`].
pub struct ChunkOrchestrator<'a, F, S: ?Sized> {
    fetcher: &'a F,
    admission: &'a AdmissionController,
    store: &'a S,
    progress: CrawlProgress,
}

impl<'a, F: Fetcher, S: ArtifactStore + ?Sized> ChunkOrchestrator<'a, F, S> {
    #[must_use]
    pub fn new(fetcher: &'a F, admission: &'a AdmissionController, store: &'a S) -> Self {
        Self {
            fetcher,
            admission,
            store,
            progress: CrawlProgress::silent(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: CrawlProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Crawls `range` in chunks of `chunk_size`, keeping the top `limit`
    /// records of each chunk as that chunk's artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::ArtifactsPresent`] if the store is not empty
    /// and `existing` is [`ExistingArtifacts::Fail`].
    /// [`ExistingArtifacts::Reuse`] fails with
    /// [`CrawlError::UnknownArtifacts`] or [`CrawlError::ManifestMismatch`]
    /// unless the store's manifest describes this exact crawl. Returns
    /// [`CrawlError::Store`] if an artifact cannot be listed, cleared, or
    /// written. Chunks persisted before the error remain in the store.
    pub async fn run(
        &self,
        range: IdRange,
        chunk_size: NonZeroU64,
        limit: usize,
        existing: ExistingArtifacts,
    ) -> Result<CrawlSummary, CrawlError> {
        let start = Instant::now();
        let chunk_count = range.chunk_count(chunk_size);

        let manifest = CrawlManifest::new(range, chunk_size, limit);
        let persisted = self.prepare_store(&manifest, existing)?;

        log::info!(
            "Crawling {range} in {chunk_count} chunk(s) of up to {chunk_size} IDs \
             (concurrency={}, top={limit})",
            self.admission.capacity()
        );

        self.progress
            .total
            .begin(range.len(), format!("Total crawl progress {range}"));

        let observers = self.progress.per_fetch();
        let mut summary = CrawlSummary::default();

        for chunk in range.chunks(chunk_size) {
            let label = format!("Chunk {}/{chunk_count}", chunk.index + 1);

            if persisted.binary_search(&chunk.index).is_ok() {
                log::info!("{label} ({}) already persisted, skipping", chunk.range);
                self.progress.total.advance(chunk.range.len());
                summary.chunks_reused += 1;
                continue;
            }

            self.progress
                .chunk
                .begin(chunk.range.len(), format!("{label}: crawling {}", chunk.range));

            log::debug!("{label}: crawling {}", chunk.range);
            let records = crawl(self.fetcher, self.admission, chunk.range, &observers).await;
            let found = records.len();

            log::debug!("{label}: ranking {found} record(s)");
            let board = Leaderboard::rank(records, limit);

            self.store.put(chunk.index, &board)?;
            log::info!(
                "{label} ({}) persisted: {found} of {} IDs present, kept {}",
                chunk.range,
                chunk.range.len(),
                board.len()
            );

            summary.chunks_crawled += 1;
            summary.ids_attempted += chunk.range.len();
            summary.records_found += found as u64;
        }

        summary.elapsed = start.elapsed();

        self.progress.chunk.dismiss();
        self.progress.total.end(format!(
            "Crawled {} chunk(s), reused {}",
            summary.chunks_crawled, summary.chunks_reused
        ));

        Ok(summary)
    }

    /// Applies the [`ExistingArtifacts`] policy, records `manifest` for
    /// a fresh store, and returns the sorted indices that should be skipped.
    fn prepare_store(
        &self,
        manifest: &CrawlManifest,
        existing: ExistingArtifacts,
    ) -> Result<Vec<usize>, CrawlError> {
        let persisted = self.store.list()?;
        if persisted.is_empty() {
            self.store.set_manifest(manifest)?;
            return Ok(persisted);
        }

        match existing {
            ExistingArtifacts::Fail => Err(CrawlError::ArtifactsPresent {
                count: persisted.len(),
            }),
            ExistingArtifacts::Reuse => match self.store.manifest()? {
                None => Err(CrawlError::UnknownArtifacts {
                    count: persisted.len(),
                }),
                Some(found) if found != *manifest => Err(CrawlError::ManifestMismatch {
                    expected: *manifest,
                    found,
                }),
                Some(_) => {
                    log::info!("Resuming: {} chunk artifact(s) present", persisted.len());
                    Ok(persisted)
                }
            },
            ExistingArtifacts::Replace => {
                log::info!("Removing {} existing chunk artifact(s)", persisted.len());
                self.store.clear()?;
                self.store.set_manifest(manifest)?;
                Ok(Vec::new())
            }
        }
    }
}
