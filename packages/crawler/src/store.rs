//! Indexed storage for per-chunk leaderboards.
//!
//! The orchestrator writes one artifact per chunk and the merger reads them
//! back through [`ArtifactStore`], so neither depends on filesystem
//! enumeration. [`CsvArtifactStore`] keeps artifacts as CSV files in a
//! directory; [`MemoryArtifactStore`] keeps them in memory.
//!
//! Alongside the artifacts a store keeps a [`CrawlManifest`] naming the
//! range, chunk size and limit they were produced with. Chunk indices only
//! mean something relative to those three.

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use scratch_top_models::{IdRange, Leaderboard};
use serde::{Deserialize, Serialize};

use crate::csv_file::{read_leaderboard, read_manifest, write_leaderboard, write_manifest};

/// Errors that can occur while reading or writing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An artifact for this chunk index has already been written.
    #[error("artifact for chunk {0} already exists")]
    Exists(usize),

    /// No artifact exists for this chunk index.
    #[error("no artifact for chunk {0}")]
    NotFound(usize),
}

/// The crawl a store's artifacts belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlManifest {
    /// First ID of the crawled range.
    pub start: u64,
    /// Final ID of the crawled range.
    pub end: u64,
    /// Maximum IDs per chunk.
    pub chunk_size: u64,
    /// Records kept per chunk.
    pub top_n: usize,
}

impl CrawlManifest {
    #[must_use]
    pub const fn new(range: IdRange, chunk_size: NonZeroU64, top_n: usize) -> Self {
        Self {
            start: range.start(),
            end: range.end(),
            chunk_size: chunk_size.get(),
            top_n,
        }
    }

    /// Number of chunks the described crawl has, or `None` if the manifest
    /// does not describe a valid crawl.
    #[must_use]
    pub fn chunk_count(&self) -> Option<usize> {
        let range = IdRange::new(self.start, self.end).ok()?;
        let size = NonZeroU64::new(self.chunk_size)?;
        usize::try_from(range.chunk_count(size)).ok()
    }
}

impl std::fmt::Display for CrawlManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\u{2013}{} in chunks of {}, top {}",
            self.start, self.end, self.chunk_size, self.top_n
        )
    }
}

/// Write-once storage of chunk leaderboards keyed by chunk index.
pub trait ArtifactStore: Send + Sync {
    /// Persists the leaderboard for chunk `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Exists`] if the index was already written, or
    /// an I/O error if persisting fails. A failed put leaves no artifact.
    fn put(&self, index: usize, board: &Leaderboard) -> Result<(), StoreError>;

    /// Returns the indices of every stored artifact in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be listed.
    fn list(&self) -> Result<Vec<usize>, StoreError>;

    /// Loads the leaderboard for chunk `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing was stored under `index`,
    /// or a decode error if the artifact is unreadable.
    fn get(&self, index: usize) -> Result<Leaderboard, StoreError>;

    /// Returns the manifest of the crawl the artifacts belong to, if one
    /// was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a recorded manifest cannot be read.
    fn manifest(&self) -> Result<Option<CrawlManifest>, StoreError>;

    /// Records the crawl that subsequent artifacts belong to, replacing any
    /// earlier manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the manifest cannot be persisted.
    fn set_manifest(&self, manifest: &CrawlManifest) -> Result<(), StoreError>;

    /// Removes every artifact and the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an artifact cannot be removed.
    fn clear(&self) -> Result<(), StoreError>;
}

const ARTIFACT_PREFIX: &str = "top_";
const ARTIFACT_SUFFIX: &str = ".csv";
const MANIFEST_FILE: &str = "manifest.csv";

/// Stores each artifact as `top_{index:010}.csv` inside a directory.
///
/// Zero-padding keeps lexicographic directory listings in chunk order for
/// anyone inspecting the directory by hand.
#[derive(Debug, Clone)]
pub struct CsvArtifactStore {
    dir: PathBuf,
}

impl CsvArtifactStore {
    /// Opens (creating if needed) an artifact directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the artifact file for chunk `index`.
    #[must_use]
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{index:010}{ARTIFACT_SUFFIX}"))
    }

    fn parse_index(file_name: &str) -> Option<usize> {
        let digits = file_name
            .strip_prefix(ARTIFACT_PREFIX)?
            .strip_suffix(ARTIFACT_SUFFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl ArtifactStore for CsvArtifactStore {
    fn put(&self, index: usize, board: &Leaderboard) -> Result<(), StoreError> {
        let path = self.artifact_path(index);
        if path.exists() {
            return Err(StoreError::Exists(index));
        }
        write_leaderboard(&path, board)
    }

    fn list(&self) -> Result<Vec<usize>, StoreError> {
        let mut indices = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(index) = entry.file_name().to_str().and_then(Self::parse_index) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    fn get(&self, index: usize) -> Result<Leaderboard, StoreError> {
        let path = self.artifact_path(index);
        if !path.is_file() {
            return Err(StoreError::NotFound(index));
        }
        read_leaderboard(&path)
    }

    fn manifest(&self) -> Result<Option<CrawlManifest>, StoreError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_manifest(&path)
    }

    fn set_manifest(&self, manifest: &CrawlManifest) -> Result<(), StoreError> {
        write_manifest(&self.dir.join(MANIFEST_FILE), manifest)
    }

    fn clear(&self) -> Result<(), StoreError> {
        for index in self.list()? {
            std::fs::remove_file(self.artifact_path(index))?;
        }
        let manifest = self.dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            std::fs::remove_file(manifest)?;
        }
        Ok(())
    }
}

/// Keeps artifacts in memory. Useful for tests and single-process runs that
/// do not need resumability.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<BTreeMap<usize, Leaderboard>>,
    manifest: Mutex<Option<CrawlManifest>>,
}

impl MemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<usize, Leaderboard>> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, index: usize, board: &Leaderboard) -> Result<(), StoreError> {
        let mut artifacts = self.lock();
        if artifacts.contains_key(&index) {
            return Err(StoreError::Exists(index));
        }
        artifacts.insert(index, board.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<usize>, StoreError> {
        Ok(self.lock().keys().copied().collect())
    }

    fn get(&self, index: usize) -> Result<Leaderboard, StoreError> {
        self.lock()
            .get(&index)
            .cloned()
            .ok_or(StoreError::NotFound(index))
    }

    fn manifest(&self) -> Result<Option<CrawlManifest>, StoreError> {
        Ok(*self.manifest.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_manifest(&self, manifest: &CrawlManifest) -> Result<(), StoreError> {
        *self.manifest.lock().unwrap_or_else(PoisonError::into_inner) = Some(*manifest);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock().clear();
        *self.manifest.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
