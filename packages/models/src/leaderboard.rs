//! Ranked, truncated record lists.
//!
//! A [`Leaderboard`] can only be built by ranking, so every instance is
//! sorted by views descending with ties broken by ascending ID, and holds no
//! more records than the limit it was ranked with.

use std::cmp::Ordering;

use crate::Record;

/// Records sorted by views descending, then ID ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    records: Vec<Record>,
}

impl Leaderboard {
    /// Ranks `records` and keeps the top `limit`.
    ///
    /// Output length is `min(records.len(), limit)`. Ranking an existing
    /// leaderboard's records again with the same limit yields the same
    /// leaderboard.
    #[must_use]
    pub fn rank(mut records: Vec<Record>, limit: usize) -> Self {
        if limit == 0 {
            records.clear();
            return Self { records };
        }

        if records.len() > limit {
            records.select_nth_unstable_by(limit - 1, ranking_order);
            records.truncate(limit);
        }
        records.sort_unstable_by(ranking_order);

        Self { records }
    }

    /// Concatenates several leaderboards and re-ranks the union.
    #[must_use]
    pub fn merge(boards: impl IntoIterator<Item = Self>, limit: usize) -> Self {
        let records = boards
            .into_iter()
            .flat_map(Self::into_records)
            .collect::<Vec<_>>();
        Self::rank(records, limit)
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Leaderboard {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Views descending, then ID ascending.
fn ranking_order(a: &Record, b: &Record) -> Ordering {
    b.views.cmp(&a.views).then_with(|| a.id.cmp(&b.id))
}
