//! Prompt-driven crawl for when no subcommand is given.

use dialoguer::{Input, Select};
use scratch_top_cli_utils::MultiProgress;
use scratch_top_crawler::config::CrawlConfig;
use scratch_top_crawler::{ArtifactStore, CsvArtifactStore, ExistingArtifacts};
use scratch_top_models::IdRange;

use crate::pipeline;

/// How to treat chunk artifacts left over from an earlier crawl.
enum Leftovers {
    Resume,
    Replace,
    Cancel,
}

impl Leftovers {
    const ALL: &[Self] = &[Self::Resume, Self::Replace, Self::Cancel];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Resume => "Resume (skip chunks already crawled)",
            Self::Replace => "Start over (delete existing chunks)",
            Self::Cancel => "Cancel",
        }
    }
}

/// Prompts for the ID range, then crawls it.
///
/// # Errors
///
/// Returns an error if a prompt fails, the range is invalid, or the crawl
/// fails.
pub async fn run(
    multi: &MultiProgress,
    config: CrawlConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let start: String = Input::new()
        .with_prompt("Enter the first project ID to crawl (e.g., 104)")
        .interact_text()?;
    let end: String = Input::new()
        .with_prompt("Enter the final project ID to crawl (e.g., 10000)")
        .interact_text()?;

    let range = IdRange::parse(&start, &end)?;

    let settings = config.validate()?;

    let existing = if range.len() <= settings.chunk_size.get() {
        ExistingArtifacts::Fail
    } else {
        let Some(existing) = ask_about_leftovers(&config)? else {
            log::info!("Cancelled; chunk artifacts left untouched");
            return Ok(());
        };
        existing
    };

    pipeline::crawl(multi, &config, range, existing).await
}

/// Asks what to do if the artifact directory already holds chunks.
///
/// Returns `None` if the user cancels.
fn ask_about_leftovers(
    config: &CrawlConfig,
) -> Result<Option<ExistingArtifacts>, Box<dyn std::error::Error>> {
    let store = CsvArtifactStore::open(&config.chunk_dir)?;
    let count = store.list()?.len();
    if count == 0 {
        return Ok(Some(ExistingArtifacts::Fail));
    }

    let origin = store
        .manifest()?
        .map_or_else(|| "an unknown crawl".to_owned(), |m| format!("crawl {m}"));

    let labels: Vec<&str> = Leftovers::ALL.iter().map(Leftovers::label).collect();
    let idx = Select::new()
        .with_prompt(format!(
            "{} already holds {count} chunk artifact(s) of {origin}",
            config.chunk_dir.display()
        ))
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(match Leftovers::ALL[idx] {
        Leftovers::Resume => Some(ExistingArtifacts::Reuse),
        Leftovers::Replace => Some(ExistingArtifacts::Replace),
        Leftovers::Cancel => None,
    })
}
