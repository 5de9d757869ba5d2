//! Release barrier for synchronized dispatch
//!
//! Holds a fixed number of participant tasks until a single controller opens
//! the gate, so every request becomes runnable at the same logical instant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::domain::errors::BarrierError;

/// Single-use gate shared by one controller and `expected` participants
///
/// Built on two `watch` channels (arrival count and release flag), so neither
/// an early nor a late arrival can miss the release.
///
/// # Examples
///
/// ```
/// use raceprobe::application::ReleaseBarrier;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), raceprobe::domain::BarrierError> {
/// let barrier = ReleaseBarrier::arm(2)?;
/// let tasks: Vec<_> = (0..2)
///     .map(|_| {
///         let barrier = barrier.clone();
///         tokio::spawn(async move { barrier.await_release().await })
///     })
///     .collect();
///
/// barrier.wait_for_participants(Duration::from_secs(1)).await?;
/// barrier.release()?;
/// for task in tasks {
///     task.await.unwrap();
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReleaseBarrier {
    inner: Arc<Inner>,
}

struct Inner {
    expected: usize,
    arrived_tx: watch::Sender<usize>,
    release_tx: watch::Sender<bool>,
    released: AtomicBool,
    released_at: OnceLock<Instant>,
}

impl ReleaseBarrier {
    /// Arm a barrier for `expected` participants
    pub fn arm(expected: usize) -> Result<Self, BarrierError> {
        if expected == 0 {
            return Err(BarrierError::NoParticipants);
        }

        let (arrived_tx, _) = watch::channel(0usize);
        let (release_tx, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                expected,
                arrived_tx,
                release_tx,
                released: AtomicBool::new(false),
                released_at: OnceLock::new(),
            }),
        })
    }

    /// Number of participants the barrier was armed for
    pub fn expected(&self) -> usize {
        self.inner.expected
    }

    /// Participants that have reached the barrier so far
    pub fn arrived(&self) -> usize {
        *self.inner.arrived_tx.borrow()
    }

    /// Whether `release` has opened the gate
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Instant at which `release` opened the gate
    pub fn released_at(&self) -> Option<Instant> {
        self.inner.released_at.get().copied()
    }

    /// Register arrival and suspend until the barrier is released
    pub async fn await_release(&self) {
        // Subscribe before announcing arrival so the release cannot slip past us
        let mut release_rx = self.inner.release_tx.subscribe();
        self.inner.arrived_tx.send_modify(|arrived| *arrived += 1);

        // The sender lives in `inner`, which outlives this borrow, so this only
        // returns once the flag flips.
        let _ = release_rx.wait_for(|released| *released).await;
    }

    /// Wait until every expected participant is parked, at most `limit`
    pub async fn wait_for_participants(&self, limit: Duration) -> Result<(), BarrierError> {
        let expected = self.inner.expected;
        let mut arrived_rx = self.inner.arrived_tx.subscribe();

        let gathered = tokio::time::timeout(limit, arrived_rx.wait_for(|n| *n >= expected))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false);

        if gathered {
            Ok(())
        } else {
            Err(BarrierError::ParticipantsMissing {
                arrived: self.arrived(),
                expected,
            })
        }
    }

    /// Open the gate for every current and future participant
    ///
    /// Must be called exactly once; a second call is rejected.
    pub fn release(&self) -> Result<Instant, BarrierError> {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return Err(BarrierError::AlreadyReleased);
        }

        // Stamp before opening so no participant can observe an earlier release
        let now = Instant::now();
        let released_at = *self.inner.released_at.get_or_init(|| now);
        self.inner.release_tx.send_replace(true);
        Ok(released_at)
    }
}

impl std::fmt::Debug for ReleaseBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseBarrier")
            .field("expected", &self.inner.expected)
            .field("arrived", &self.arrived())
            .field("released", &self.is_released())
            .finish()
    }
}
