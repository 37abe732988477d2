//! Admission control for in-flight fetches.

use std::num::NonZeroUsize;

use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Default number of fetches allowed in flight at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 125;

/// Counting semaphore that caps how many fetches run concurrently.
///
/// Callers hold an [`Admission`] for the duration of a fetch. The slot is
/// returned when the admission is dropped, which covers success, failure,
/// timeout, and the enclosing future being cancelled.
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Semaphore,
    capacity: usize,
}

/// A held admission slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the admission is dropped"]
pub struct Admission<'a> {
    _permit: SemaphorePermit<'a>,
}

impl AdmissionController {
    /// Creates a controller with `capacity` slots, clamped to
    /// [`Semaphore::MAX_PERMITS`].
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get().min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError`] only if the underlying semaphore is closed.
    /// The controller never closes it, so a crawl sees this only as a
    /// broken invariant.
    pub async fn admit(&self) -> Result<Admission<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;
        Ok(Admission { _permit: permit })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CONCURRENCY_LIMIT).unwrap_or(NonZeroUsize::MIN))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::StreamExt as _;
    use futures::stream::FuturesUnordered;

    use super::*;

    fn controller(capacity: usize) -> AdmissionController {
        AdmissionController::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn default_capacity() {
        assert_eq!(AdmissionController::default().capacity(), 125);
    }

    #[tokio::test]
    async fn never_exceeds_capacity() {
        let admission = controller(3);
        let peak = AtomicUsize::new(0);

        let mut tasks: FuturesUnordered<_> = (0..20)
            .map(|_| async {
                let _slot = admission.admit().await.unwrap();
                peak.fetch_max(admission.in_flight(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            })
            .collect();
        while tasks.next().await.is_some() {}

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(admission.in_flight(), 0);
    }

    #[tokio::test]
    async fn releases_slot_when_holder_is_cancelled() {
        let admission = controller(1);

        let stuck = async {
            let _slot = admission.admit().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        let timed_out = tokio::time::timeout(Duration::from_millis(10), stuck).await;

        assert!(timed_out.is_err());
        assert_eq!(admission.in_flight(), 0);
        let _slot = admission.admit().await.unwrap();
        assert_eq!(admission.in_flight(), 1);
    }
}
