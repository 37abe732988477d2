//! Crawl and merge runs wired to the real HTTP fetcher, CSV artifact
//! directory, and terminal progress bars.

use scratch_top_cli_utils::{MultiProgress, crawl_progress};
use scratch_top_crawler::config::CrawlConfig;
use scratch_top_crawler::csv_file::write_leaderboard;
use scratch_top_crawler::{
    AdmissionController, ArtifactStore, CrawlPlan, CsvArtifactStore, ExistingArtifacts,
    MemoryArtifactStore, crawl_leaderboard, merge,
};
use scratch_top_fetcher::HttpFetcher;
use scratch_top_models::IdRange;

/// Crawls `range` and writes the final leaderboard to `config.output`.
///
/// Ctrl-C abandons the chunk in progress and returns `Ok(())`; chunk
/// artifacts persisted before the interrupt stay in `config.chunk_dir`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP client cannot
/// be built, or an artifact or the output cannot be written.
pub async fn crawl(
    multi: &MultiProgress,
    config: &CrawlConfig,
    range: IdRange,
    existing: ExistingArtifacts,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.validate()?;

    let plan = CrawlPlan {
        range,
        chunk_size: settings.chunk_size,
        top_n: settings.top_n,
        existing,
    };

    let fetcher = HttpFetcher::new(&config.url_template, settings.request_timeout)?;
    let admission = AdmissionController::new(settings.concurrency);

    // Single-chunk crawls never touch the artifact directory.
    let store: Box<dyn ArtifactStore> = if plan.is_single_chunk() {
        Box::new(MemoryArtifactStore::new())
    } else {
        Box::new(CsvArtifactStore::open(&config.chunk_dir)?)
    };

    let progress = crawl_progress(multi);

    tokio::select! {
        result = crawl_leaderboard(&fetcher, &admission, store.as_ref(), &plan, progress) => {
            let (board, summary) = result?;
            write_leaderboard(&config.output, &board)?;
            log::info!(
                "Done! Saved top {} project(s) to {} ({} found across {} IDs, {} chunk(s) reused, {:.1}s)",
                board.len(),
                config.output.display(),
                summary.records_found,
                summary.ids_attempted,
                summary.chunks_reused,
                summary.elapsed.as_secs_f64(),
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            multi.clear().ok();
            if plan.is_single_chunk() {
                log::warn!("Crawl interrupted.");
            } else {
                log::warn!(
                    "Crawl interrupted. Chunk artifacts in {} are kept; rerun with the same range and \
                     settings plus --resume to continue, or run `merge` to rank what was collected.",
                    config.chunk_dir.display()
                );
            }
        }
    }

    Ok(())
}

/// Merges the artifacts in `config.chunk_dir` into `config.output`.
///
/// When the directory records the crawl that wrote it, only that crawl's
/// chunks are read.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the artifact directory
/// cannot be listed, or the output cannot be written.
pub fn merge(config: &CrawlConfig) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.validate()?;

    let store = CsvArtifactStore::open(&config.chunk_dir)?;
    let board = match store.manifest()? {
        Some(manifest) => {
            log::info!("Merging chunk artifacts of crawl {manifest}");
            let chunks = manifest.chunk_count().unwrap_or(usize::MAX);
            merge::merge_chunks(&store, chunks, settings.top_n)?
        }
        None => {
            log::warn!(
                "{} records no crawl; merging every chunk artifact",
                config.chunk_dir.display()
            );
            merge::merge(&store, settings.top_n)?
        }
    };
    write_leaderboard(&config.output, &board)?;

    log::info!(
        "Final leaderboard of {} project(s) saved to {}",
        board.len(),
        config.output.display()
    );
    Ok(())
}
