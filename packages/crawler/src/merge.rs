//! Cross-chunk merge of persisted leaderboards.

use scratch_top_models::Leaderboard;

use crate::store::{ArtifactStore, StoreError};

/// Ranks the union of every artifact in `store` and keeps the top `limit`.
///
/// Works on whatever artifacts exist, so a store left behind by an
/// interrupted crawl merges fine. Artifacts that fail to load are logged
/// and skipped. Artifacts are folded in one at a time, which bounds memory
/// at roughly two leaderboards of `limit` records.
///
/// # Errors
///
/// Returns [`StoreError`] only if the store cannot be listed.
pub fn merge(
    store: &(impl ArtifactStore + ?Sized),
    limit: usize,
) -> Result<Leaderboard, StoreError> {
    let indices = store.list()?;
    Ok(fold(store, &indices, limit))
}

/// Like [`merge`], but only reads chunks `0..chunk_count`.
///
/// Used at the end of a crawl so that artifacts with indices beyond the
/// crawl's last chunk never reach its leaderboard.
///
/// # Errors
///
/// Returns [`StoreError`] only if the store cannot be listed.
pub fn merge_chunks(
    store: &(impl ArtifactStore + ?Sized),
    chunk_count: usize,
    limit: usize,
) -> Result<Leaderboard, StoreError> {
    let mut indices = store.list()?;
    let listed = indices.len();
    indices.retain(|&index| index < chunk_count);

    if indices.len() < listed {
        log::warn!(
            "Ignoring {} chunk artifact(s) past chunk {chunk_count}",
            listed - indices.len()
        );
    }

    Ok(fold(store, &indices, limit))
}

fn fold(store: &(impl ArtifactStore + ?Sized), indices: &[usize], limit: usize) -> Leaderboard {
    let mut merged = Leaderboard::default();
    let mut used = 0usize;

    for index in indices {
        match store.get(*index) {
            Ok(board) => {
                merged = Leaderboard::merge([merged, board], limit);
                used += 1;
            }
            Err(e) => log::warn!("Skipping chunk artifact {index}: {e}"),
        }
    }

    log::info!(
        "Merged {used}/{} chunk artifact(s) into {} ranked records",
        indices.len(),
        merged.len()
    );

    merged
}
