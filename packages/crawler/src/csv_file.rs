//! Leaderboard CSV encoding.
//!
//! Chunk artifacts and the final output share one format: a header row
//! `ID,Title,Creator,Views` followed by one row per record in rank order.
//! The crawl manifest kept beside the artifacts is a single-row CSV.

use std::path::{Path, PathBuf};

use scratch_top_models::{Leaderboard, Record};

use crate::store::{CrawlManifest, StoreError};

/// Column headers, in file order.
pub const HEADERS: [&str; 4] = ["ID", "Title", "Creator", "Views"];

/// Writes `board` to `path`, replacing any existing file.
///
/// The rows go to a sibling temporary file that is renamed into place once
/// fully flushed, so readers never observe a partial file.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be written or renamed.
pub fn write_leaderboard(path: &Path, board: &Leaderboard) -> Result<(), StoreError> {
    write_atomically(path, |tmp| write_rows(tmp, board))?;
    log::debug!("Wrote {} rows to {}", board.len(), path.display());
    Ok(())
}

/// Writes `manifest` to `path` the same way [`write_leaderboard`] writes a
/// board.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be written or renamed.
pub fn write_manifest(path: &Path, manifest: &CrawlManifest) -> Result<(), StoreError> {
    write_atomically(path, |tmp| {
        let mut writer = csv::Writer::from_path(tmp)?;
        writer.serialize(manifest)?;
        writer.flush()?;
        Ok(())
    })
}

/// Reads a manifest written by [`write_manifest`]. A file with a header
/// but no row yields `None`.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be opened or the row does not
/// decode.
pub fn read_manifest(path: &Path) -> Result<Option<CrawlManifest>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    Ok(reader.deserialize::<CrawlManifest>().next().transpose()?)
}

fn write_atomically(
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);

    if let Err(e) = write(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn write_rows(path: &Path, board: &Leaderboard) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(HEADERS)?;
    for record in board {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a leaderboard file written by [`write_leaderboard`].
///
/// Rows are re-ranked on load, so a hand-edited or reordered file still
/// yields a valid [`Leaderboard`].
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be opened or a row does not
/// decode into a [`Record`].
pub fn read_leaderboard(path: &Path) -> Result<Leaderboard, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<Record>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Leaderboard::rank(records, usize::MAX))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
