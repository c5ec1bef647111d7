//! Cooperative timer queue on a virtual millisecond clock.
//!
//! Every entry remembers the [`Epoch`] it was scheduled in. `cancel_all`
//! drops the queue and moves to a new epoch; anything still carrying an old
//! epoch is discarded when it comes due instead of being delivered.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Generation counter, advanced by every `cancel_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    /// Raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A timer that came due in the current epoch.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<A> {
    pub due_ms: u64,
    pub action: A,
}

#[derive(Debug)]
struct Entry<A> {
    due_ms: u64,
    seq: u64,
    epoch: Epoch,
    action: A,
}

// Min-heap on (due_ms, seq): earliest first, ties in scheduling order.
impl<A> Ord for Entry<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due_ms, other.seq).cmp(&(self.due_ms, self.seq))
    }
}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<A> Eq for Entry<A> {}

/// Single-threaded one-shot timer queue.
#[derive(Debug)]
pub struct TimerQueue<A> {
    now_ms: u64,
    epoch: Epoch,
    next_seq: u64,
    heap: BinaryHeap<Entry<A>>,
    discarded: u64,
}

impl<A> TimerQueue<A> {
    /// Empty queue at time zero, epoch zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            epoch: Epoch::default(),
            next_seq: 0,
            heap: BinaryHeap::new(),
            discarded: 0,
        }
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Current epoch.
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Schedules `action` to fire `delay_ms` from now in the current epoch.
    pub fn schedule(&mut self, delay_ms: u64, action: A) {
        self.schedule_in(self.epoch, delay_ms, action);
    }

    /// Schedules `action` on behalf of work that started in `epoch`.
    ///
    /// If `epoch` is no longer current the entry is queued but will be
    /// discarded when it comes due.
    pub fn schedule_in(&mut self, epoch: Epoch, delay_ms: u64, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq,
            epoch,
            action,
        });
    }

    /// Drops every outstanding timer and starts a new epoch.
    ///
    /// Returns how many timers were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.heap.len();
        self.heap.clear();
        self.epoch = self.epoch.next();
        cancelled
    }

    /// Due time of the earliest outstanding timer.
    #[must_use]
    pub fn next_due_ms(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.due_ms)
    }

    /// Pops the next timer due at or before `until_ms`, advancing the clock to
    /// its due time. Stale-epoch entries are skipped.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired<A>> {
        loop {
            if self.heap.peek()?.due_ms > until_ms {
                return None;
            }
            let entry = self.heap.pop()?;
            self.now_ms = self.now_ms.max(entry.due_ms);
            if entry.epoch != self.epoch {
                self.discarded += 1;
                warn!(
                    due_ms = entry.due_ms,
                    entry_epoch = entry.epoch.value(),
                    current_epoch = self.epoch.value(),
                    "discarding timer from stale epoch"
                );
                continue;
            }
            return Some(Fired {
                due_ms: entry.due_ms,
                action: entry.action,
            });
        }
    }

    /// Moves the clock forward to `ms`. The clock never goes backwards.
    pub fn set_now(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    /// Number of outstanding timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// How many stale entries have been discarded so far.
    #[must_use]
    pub const fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(q: &mut TimerQueue<&'static str>, until: u64) -> Vec<(u64, &'static str)> {
        let mut out = Vec::new();
        while let Some(f) = q.pop_due(until) {
            out.push((f.due_ms, f.action));
        }
        q.set_now(until);
        out
    }

    #[test]
    fn fires_in_due_order_then_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule(500, "b");
        q.schedule(100, "a");
        q.schedule(500, "c");
        assert_eq!(q.next_due_ms(), Some(100));

        assert!(drain(&mut q, 99).is_empty());
        assert_eq!(drain(&mut q, 500), vec![(100, "a"), (500, "b"), (500, "c")]);
        assert!(q.is_empty());
        assert_eq!(q.now_ms(), 500);
    }

    #[test]
    fn delays_are_relative_to_the_clock() {
        let mut q = TimerQueue::new();
        q.set_now(1000);
        q.schedule(200, "x");
        assert_eq!(q.next_due_ms(), Some(1200));
        q.set_now(10);
        assert_eq!(q.now_ms(), 1000);
    }

    #[test]
    fn clock_tracks_fired_entry_while_draining() {
        let mut q = TimerQueue::new();
        q.schedule(100, "first");
        let fired = q.pop_due(1000).unwrap();
        assert_eq!(fired.due_ms, 100);
        assert_eq!(q.now_ms(), 100);
        // A follow-up scheduled from inside a callback is relative to 100.
        q.schedule(100, "second");
        assert_eq!(q.next_due_ms(), Some(200));
    }

    #[test]
    fn cancel_all_clears_and_bumps_epoch() {
        let mut q = TimerQueue::new();
        q.schedule(10, "a");
        q.schedule(20, "b");
        let before = q.epoch();
        assert_eq!(q.cancel_all(), 2);
        assert!(q.epoch() > before);
        assert!(drain(&mut q, 1000).is_empty());
    }

    #[test]
    fn stale_epoch_entries_are_discarded() {
        let mut q = TimerQueue::new();
        let old = q.epoch();
        q.cancel_all();
        q.schedule_in(old, 10, "stale");
        q.schedule(20, "fresh");

        assert_eq!(drain(&mut q, 100), vec![(20, "fresh")]);
        assert_eq!(q.discarded(), 1);
    }
}
