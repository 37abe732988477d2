#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crawl engine for the Scratch project leaderboard.
//!
//! Walks an ID range, fetching every ID through a [`Fetcher`] under an
//! [`AdmissionController`], and reduces the present records into a single
//! [`Leaderboard`]:
//!
//! * ranges that fit in one chunk are crawled and ranked directly;
//! * larger ranges go through the [`ChunkOrchestrator`], which persists one
//!   ranked artifact per chunk to an [`ArtifactStore`], and are then
//!   [`merge`](merge::merge)d.
//!
//! Individual fetch failures never surface here. The only errors are
//! storage failures and refusing to mix with stale artifacts.

pub mod admission;
pub mod config;
pub mod crawl;
pub mod csv_file;
pub mod merge;
pub mod orchestrator;
pub mod progress;
pub mod store;

#[cfg(test)]
mod testing;

use std::num::NonZeroU64;
use std::time::Instant;

use scratch_top_fetcher::Fetcher;
use scratch_top_models::{IdRange, Leaderboard};

pub use admission::AdmissionController;
pub use orchestrator::{ChunkOrchestrator, CrawlSummary, ExistingArtifacts};
pub use progress::CrawlProgress;
pub use store::{ArtifactStore, CrawlManifest, CsvArtifactStore, MemoryArtifactStore, StoreError};

/// Errors that can abort a crawl.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Reading or writing a chunk artifact failed.
    #[error("artifact store error: {0}")]
    Store(#[from] StoreError),

    /// The artifact store already holds chunks from an earlier crawl.
    #[error(
        "artifact store already holds {count} chunk artifact(s); resume the crawl or replace them"
    )]
    ArtifactsPresent {
        /// Number of artifacts found.
        count: usize,
    },

    /// Resuming was requested but the store does not record which crawl
    /// its artifacts belong to.
    #[error(
        "artifact store holds {count} chunk artifact(s) from an unknown crawl; replace them instead of resuming"
    )]
    UnknownArtifacts {
        /// Number of artifacts found.
        count: usize,
    },

    /// Resuming was requested but the store's artifacts belong to a
    /// different range, chunk size, or limit.
    #[error(
        "artifact store holds chunks of crawl {found}, not {expected}; resume with the same settings or replace them"
    )]
    ManifestMismatch {
        /// The crawl being started.
        expected: CrawlManifest,
        /// The crawl recorded in the store.
        found: CrawlManifest,
    },
}

/// Everything needed to crawl a range into a leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlPlan {
    /// IDs to crawl.
    pub range: IdRange,
    /// Maximum IDs per chunk.
    pub chunk_size: NonZeroU64,
    /// Maximum records kept at every ranking stage.
    pub top_n: usize,
    /// Policy for artifacts left by an earlier run.
    pub existing: ExistingArtifacts,
}

impl CrawlPlan {
    /// Whether the range is small enough to skip chunking and merging.
    #[must_use]
    pub const fn is_single_chunk(&self) -> bool {
        self.range.len() <= self.chunk_size.get()
    }

    /// Number of chunks the range splits into.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        usize::try_from(self.range.chunk_count(self.chunk_size)).unwrap_or(usize::MAX)
    }
}

/// Crawls `plan.range` and returns the global top-`plan.top_n` leaderboard.
///
/// A range that fits in one chunk is crawled and ranked in memory without
/// touching `store`. Otherwise every chunk is persisted to `store` and the
/// result is the merge of this crawl's chunks.
///
/// # Errors
///
/// Returns [`CrawlError`] if the store refuses the crawl or fails.
pub async fn crawl_leaderboard<F, S>(
    fetcher: &F,
    admission: &AdmissionController,
    store: &S,
    plan: &CrawlPlan,
    progress: CrawlProgress,
) -> Result<(Leaderboard, CrawlSummary), CrawlError>
where
    F: Fetcher,
    S: ArtifactStore + ?Sized,
{
    if plan.is_single_chunk() {
        return Ok(crawl_single(fetcher, admission, plan, &progress).await);
    }

    let summary = ChunkOrchestrator::new(fetcher, admission, store)
        .with_progress(progress)
        .run(plan.range, plan.chunk_size, plan.top_n, plan.existing)
        .await?;

    let board = merge::merge_chunks(store, plan.chunk_count(), plan.top_n)?;
    Ok((board, summary))
}

async fn crawl_single<F: Fetcher>(
    fetcher: &F,
    admission: &AdmissionController,
    plan: &CrawlPlan,
    progress: &CrawlProgress,
) -> (Leaderboard, CrawlSummary) {
    let start = Instant::now();
    let range = plan.range;

    log::info!(
        "Crawling {range} ({} IDs, concurrency={})",
        range.len(),
        admission.capacity()
    );

    progress
        .total
        .begin(range.len(), format!("Crawling Scratch projects {range}"));

    let records = crawl::crawl(fetcher, admission, range, &[progress.total.clone()]).await;
    let found = records.len() as u64;
    let board = Leaderboard::rank(records, plan.top_n);

    progress.chunk.dismiss();
    progress.total.end(format!("Found {found} project(s)"));

    let summary = CrawlSummary {
        chunks_crawled: 1,
        chunks_reused: 0,
        ids_attempted: range.len(),
        records_found: found,
        elapsed: start.elapsed(),
    };

    (board, summary)
}
