#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core types for the Scratch project leaderboard crawler.
//!
//! A crawl walks an inclusive [`IdRange`] of project IDs, turns every fetch
//! into a [`FetchOutcome`], and keeps the [`Record`]s that were present. The
//! range is split into [`Chunk`]s so memory stays bounded, and each chunk's
//! records are reduced into a [`Leaderboard`].

pub mod leaderboard;

use std::num::{NonZeroU64, ParseIntError};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub use leaderboard::Leaderboard;

/// A single project extracted from a successful fetch.
///
/// Field names serialize as the CSV column headers used by chunk artifacts
/// and the final leaderboard file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// The project ID that was requested.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Project title.
    #[serde(rename = "Title")]
    pub title: String,
    /// Username of the project author.
    #[serde(rename = "Creator")]
    pub creator: String,
    /// View count, the popularity field the leaderboard is ranked by.
    #[serde(rename = "Views")]
    pub views: u64,
}

/// Result of fetching a single ID.
///
/// Every failure mode (non-success status, transport error, timeout,
/// malformed payload) collapses into [`FetchOutcome::Absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The ID resolved to a well-formed project.
    Present(Record),
    /// The ID did not yield a usable record.
    Absent,
}

/// Errors produced while validating crawl range input.
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// One of the bounds is not a valid integer.
    #[error("'{input}' is not a valid project ID: {source}")]
    InvalidId {
        /// The raw text that failed to parse.
        input: String,
        /// Underlying parse failure.
        source: ParseIntError,
    },

    /// The start bound is greater than the end bound.
    #[error("start ID {start} is greater than end ID {end}")]
    Inverted {
        /// Requested first ID.
        start: u64,
        /// Requested final ID.
        end: u64,
    },
}

/// An inclusive range of project IDs with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRange {
    start: u64,
    end: u64,
}

impl IdRange {
    /// Creates a range covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Inverted`] if `start > end`.
    pub const fn new(start: u64, end: u64) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses both bounds from user-supplied text.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidId`] if either bound is not an unsigned
    /// integer, or [`RangeError::Inverted`] if `start > end`.
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        Self::new(parse_id(start)?, parse_id(end)?)
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of IDs in the range.
    ///
    /// Saturates at `u64::MAX` for the full `0..=u64::MAX` range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Always `false`; a valid range holds at least one ID.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterates every ID in ascending order.
    #[must_use]
    pub const fn ids(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Splits the range into contiguous chunks of at most `size` IDs, in
    /// ascending order.
    #[must_use]
    pub const fn chunks(&self, size: NonZeroU64) -> Chunks {
        Chunks {
            next_start: Some(self.start),
            end: self.end,
            size: size.get(),
            index: 0,
        }
    }

    /// Number of chunks [`Self::chunks`] yields for the given size.
    #[must_use]
    pub const fn chunk_count(&self, size: NonZeroU64) -> u64 {
        self.len().div_ceil(size.get())
    }
}

impl std::fmt::Display for IdRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\u{2013}{}", self.start, self.end)
    }
}

fn parse_id(input: &str) -> Result<u64, RangeError> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|source| RangeError::InvalidId {
            input: input.to_owned(),
            source,
        })
}

/// A contiguous sub-range of a crawl, tagged with its zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position of this chunk within the full crawl range.
    pub index: usize,
    /// IDs covered by this chunk.
    pub range: IdRange,
}

/// Iterator over the [`Chunk`]s of an [`IdRange`].
#[derive(Debug, Clone)]
pub struct Chunks {
    next_start: Option<u64>,
    end: u64,
    size: u64,
    index: usize,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let end = start.saturating_add(self.size - 1).min(self.end);

        self.next_start = if end == self.end { None } else { Some(end + 1) };

        let chunk = Chunk {
            index: self.index,
            range: IdRange { start, end },
        };
        self.index += 1;
        Some(chunk)
    }
}
