//! Render admission control.
//!
//! A single-slot gate in front of the render path. The first submission in a
//! cadence window is accepted and rendered once the window elapses; every
//! other submission in that window is dropped. Nothing is queued, so a
//! sustained flood thins the picture instead of growing memory or lag.
//!
//! Time is passed in by the caller. The owning loop asks for
//! [`FrameScheduler::next_deadline`], sleeps until then (or until the next
//! event), and calls [`FrameScheduler::poll`].

use std::time::{Duration, Instant};

/// Default cadence window (~20 rows per second).
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(50);

/// Outcome of [`FrameScheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The gate was open; a render is now scheduled.
    Accepted,
    /// A render is already in flight for this window.
    Dropped,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub accepted: u64,
    pub dropped: u64,
    pub released: u64,
    pub cancelled: u64,
}

struct Pending<T> {
    item: T,
    deadline: Instant,
}

/// First-submission-in-window-wins render gate.
pub struct FrameScheduler<T> {
    cadence: Duration,
    pending: Option<Pending<T>>,
    stats: SchedulerStats,
}

impl<T> FrameScheduler<T> {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            pending: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// True when the next submission would be accepted.
    pub fn is_open(&self) -> bool {
        self.pending.is_none()
    }

    /// Offer an item for rendering. Never blocks.
    ///
    /// An item whose deadline has passed keeps the slot until [`poll`] takes
    /// it, so callers poll at `now` before submitting.
    ///
    /// [`poll`]: FrameScheduler::poll
    pub fn submit(&mut self, item: T, now: Instant) -> Admission {
        if self.pending.is_some() {
            self.stats.dropped += 1;
            log::debug!("render in flight, dropping frame");
            return Admission::Dropped;
        }
        self.pending = Some(Pending {
            item,
            deadline: now + self.cadence,
        });
        self.stats.accepted += 1;
        Admission::Accepted
    }

    /// When the in-flight render is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Release the accepted item once its window has elapsed, reopening the gate.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some(p) if now >= p.deadline);
        if !due {
            return None;
        }
        self.stats.released += 1;
        self.pending.take().map(|p| p.item)
    }

    /// Discard the in-flight render, if any. The gate is open afterwards.
    pub fn cancel(&mut self) -> bool {
        let had = self.pending.take().is_some();
        if had {
            self.stats.cancelled += 1;
        }
        had
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CADENCE)
    }
}
