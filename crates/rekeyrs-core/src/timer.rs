// Rekeyrs Timer Queue
// One-shot timers on an explicit clock so taps can be timed deterministically

use std::fmt;
use std::time::Duration;

/// Identity of an armed timer. Never reused within one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct PendingTimer<O> {
    handle: TimerHandle,
    deadline: Duration,
    owner: O,
}

/// Pending one-shot timers ordered by deadline.
///
/// Time is a `Duration` measured from the host's epoch. The queue never
/// reads a clock itself: callers pass `now` to [`arm`](Self::arm) and
/// [`pop_due`](Self::pop_due), which keeps firing and cancellation on
/// the caller's thread and in the caller's order.
#[derive(Debug, Clone)]
pub struct TimerQueue<O> {
    pending: Vec<PendingTimer<O>>,
    next_id: u64,
}

impl<O> Default for TimerQueue<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> TimerQueue<O> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Arm a timer that becomes due `after` the given `now`
    pub fn arm(&mut self, now: Duration, after: Duration, owner: O) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let deadline = now.saturating_add(after);

        // Keep sorted by deadline; equal deadlines stay in arm order
        let pos = self
            .pending
            .partition_point(|timer| timer.deadline <= deadline);
        self.pending.insert(
            pos,
            PendingTimer {
                handle,
                deadline,
                owner,
            },
        );
        handle
    }

    /// Cancel a pending timer.
    ///
    /// Returns true only if the timer was still pending. A cancelled timer
    /// is never returned by [`pop_due`](Self::pop_due).
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending.iter().position(|timer| timer.handle == handle) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove and return every timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Duration) -> Vec<(TimerHandle, O)> {
        let due = self.pending.partition_point(|timer| timer.deadline <= now);
        self.pending
            .drain(..due)
            .map(|timer| (timer.handle, timer.owner))
            .collect()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.first().map(|timer| timer.deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
