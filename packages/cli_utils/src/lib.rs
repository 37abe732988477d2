#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the Scratch leaderboard crawler.
//!
//! Provides `indicatif` bars behind the engine's [`ProgressObserver`] trait
//! and [`init_logger`], which routes `log` output through
//! `indicatif-log-bridge` so log lines are printed above the bars instead of
//! tearing them.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scratch_top_crawler::CrawlProgress;
use scratch_top_crawler::progress::ProgressObserver;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that counts crawled IDs.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied once `begin()` provides a length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Bar for the whole crawl range. Spins until the range size is known.
    #[must_use]
    pub fn total_bar(multi: &MultiProgress) -> Arc<dyn ProgressObserver> {
        Self::spinner_then_bar(
            multi,
            "{spinner:.green} {msg}",
            "{msg} {wide_bar:.green/dim} {pos}/{len} {percent}% [{elapsed_precise} / {eta}]",
        )
    }

    /// Bar for the chunk currently being crawled. Reset for every chunk.
    #[must_use]
    pub fn chunk_bar(multi: &MultiProgress) -> Arc<dyn ProgressObserver> {
        Self::spinner_then_bar(
            multi,
            "{spinner:.cyan} {msg}",
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} {per_sec} [{eta}]",
        )
    }

    fn spinner_then_bar(
        multi: &MultiProgress,
        spinner_template: &str,
        bar_template: &str,
    ) -> Arc<dyn ProgressObserver> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(spinner_template)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let bar_style = ProgressStyle::with_template(bar_template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressObserver for IndicatifProgress {
    fn begin(&self, ids: u64, label: String) {
        self.bar.set_length(ids);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
        self.bar.set_message(label);
    }

    fn advance(&self, ids: u64) {
        self.bar.inc(ids);
    }

    fn end(&self, summary: String) {
        self.bar.finish_with_message(summary);
    }

    fn dismiss(&self) {
        self.bar.finish_and_clear();
    }
}

/// Builds the total and per-chunk bars for a crawl, total on top.
#[must_use]
pub fn crawl_progress(multi: &MultiProgress) -> CrawlProgress {
    let total = IndicatifProgress::total_bar(multi);
    let chunk = IndicatifProgress::chunk_bar(multi);
    CrawlProgress { chunk, total }
}

/// Installs a `pretty_env_logger` logger (configured from `RUST_LOG`)
/// wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already initialised (e.g. in tests)

    log::set_max_level(level);

    multi
}
