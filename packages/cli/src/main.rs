#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `scratch_top`: crawl a range of Scratch project IDs and rank the projects
//! that exist by view count.
//!
//! Run without a subcommand to be prompted for the ID range.

mod interactive;
mod pipeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use scratch_top_crawler::ExistingArtifacts;
use scratch_top_crawler::config::CrawlConfig;
use scratch_top_models::IdRange;

#[derive(Parser)]
#[command(
    name = "scratch_top",
    about = "Crawl Scratch project IDs into a view-count leaderboard"
)]
struct Cli {
    /// TOML config file. `SCRATCH_TOP_*` environment variables and flags
    /// take precedence over it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl an inclusive ID range and write the leaderboard
    Crawl {
        /// First project ID to crawl
        #[arg(long)]
        start: String,
        /// Final project ID to crawl
        #[arg(long)]
        end: String,
        /// Keep chunk artifacts from an interrupted crawl and skip their chunks
        #[arg(long, conflicts_with = "fresh")]
        resume: bool,
        /// Delete existing chunk artifacts before crawling
        #[arg(long)]
        fresh: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Merge whatever chunk artifacts exist into the final leaderboard
    Merge {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Per-run overrides for [`CrawlConfig`].
#[derive(Args, Default)]
struct SettingsArgs {
    /// Maximum IDs per chunk
    #[arg(long)]
    chunk_size: Option<u64>,
    /// Maximum records kept per chunk and in the final leaderboard
    #[arg(long)]
    top_n: Option<usize>,
    /// Maximum concurrent requests
    #[arg(long)]
    concurrency: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Project URL with an `{id}` placeholder
    #[arg(long)]
    url_template: Option<String>,
    /// Directory for chunk artifacts
    #[arg(long)]
    chunk_dir: Option<PathBuf>,
    /// Final leaderboard CSV
    #[arg(long)]
    output: Option<PathBuf>,
}

impl SettingsArgs {
    fn apply(self, config: &mut CrawlConfig) {
        if let Some(value) = self.chunk_size {
            config.chunk_size = value;
        }
        if let Some(value) = self.top_n {
            config.top_n = value;
        }
        if let Some(value) = self.concurrency {
            config.concurrency_limit = value;
        }
        if let Some(value) = self.timeout_secs {
            config.request_timeout_secs = value;
        }
        if let Some(value) = self.url_template {
            config.url_template = value;
        }
        if let Some(value) = self.chunk_dir {
            config.chunk_dir = value;
        }
        if let Some(value) = self.output {
            config.output = value;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = scratch_top_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = CrawlConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&multi, config).await;
    };

    match command {
        Commands::Crawl {
            start,
            end,
            resume,
            fresh,
            settings,
        } => {
            settings.apply(&mut config);
            let range = IdRange::parse(&start, &end)?;
            let existing = if resume {
                ExistingArtifacts::Reuse
            } else if fresh {
                ExistingArtifacts::Replace
            } else {
                ExistingArtifacts::Fail
            };
            pipeline::crawl(&multi, &config, range, existing).await?;
        }
        Commands::Merge { settings } => {
            settings.apply(&mut config);
            pipeline::merge(&config)?;
        }
    }

    Ok(())
}
