//! Deterministic periodic timers on the audio clock.
//!
//! The engine's periodic work (scheduler flush, groove advance, fill
//! polling) is expressed as timers on a [`TimerHost`]. The host is pumped
//! by whoever owns the audio clock: the render loop in real time, or a
//! test driving virtual time directly.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a registered periodic timer.
    pub struct TimerId;
}

/// The periodic jobs the live rig runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Dispatch scheduler requests inside the lookahead horizon.
    Flush,
    /// Advance the groove step machine.
    Groove,
    /// Drain raw interaction events into immediate fills.
    Fills,
}

/// A clock plus periodic timers.
pub trait TimerHost {
    /// Current audio-clock time in seconds.
    fn now(&self) -> f64;
    /// Fire `task` every `period` seconds, first at `now() + period`.
    fn every(&mut self, period: f64, task: Task) -> TimerId;
    /// Remove a timer. Returns false if it was not active.
    fn cancel(&mut self, id: TimerId) -> bool;
    /// Number of active timers.
    fn active_count(&self) -> usize;
}

#[derive(Clone, Debug)]
struct Periodic {
    period: f64,
    next_due: f64,
    task: Task,
    /// Registration order, breaks ties between timers due together.
    seq: u64,
}

/// Virtual-time timer queue.
///
/// `now` only moves forward: through [`TimerQueue::next_due`] (to each
/// timer's due time) or [`TimerQueue::set_now`].
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    timers: SlotMap<TimerId, Periodic>,
    now: f64,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward to `time` (never backward).
    pub fn set_now(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Pop the earliest timer due at or before `until`.
    ///
    /// The clock moves to that timer's due time and the timer is re-armed
    /// one period later. Call repeatedly to drain everything due.
    pub fn next_due(&mut self, until: f64) -> Option<(TimerId, Task)> {
        let (id, _) = self
            .timers
            .iter()
            .filter(|(_, t)| t.next_due <= until)
            .min_by(|(_, a), (_, b)| {
                a.next_due
                    .total_cmp(&b.next_due)
                    .then(a.seq.cmp(&b.seq))
            })?;
        let timer = self.timers.get_mut(id)?;
        let due = timer.next_due;
        timer.next_due += timer.period;
        let task = timer.task;
        self.set_now(due);
        Some((id, task))
    }

    /// Number of active timers running `task`.
    pub fn count_task(&self, task: Task) -> usize {
        self.timers.values().filter(|t| t.task == task).count()
    }
}

impl TimerHost for TimerQueue {
    fn now(&self) -> f64 {
        self.now
    }

    fn every(&mut self, period: f64, task: Task) -> TimerId {
        // Guard against a zero period spinning `next_due` forever.
        let period = if period.is_finite() && period > 0.0 { period } else { 1e-3 };
        let seq = self.seq;
        self.seq += 1;
        self.timers.insert(Periodic {
            period,
            next_due: self.now + period,
            task,
            seq,
        })
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    fn active_count(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn drain(q: &mut TimerQueue, until: f64) -> Vec<(f64, Task)> {
        let mut fired = Vec::new();
        while let Some((_, task)) = q.next_due(until) {
            fired.push((q.now(), task));
        }
        q.set_now(until);
        fired
    }

    #[test]
    fn fires_at_each_period() {
        let mut q = TimerQueue::new();
        q.every(0.25, Task::Flush);
        let fired = drain(&mut q, 1.0);
        assert_eq!(fired.len(), 4);
        assert_eq!(fired[0].0, 0.25);
        assert_eq!(fired[3].0, 1.0);
        assert_eq!(q.now(), 1.0);
    }

    #[test]
    fn interleaves_by_due_time_then_registration() {
        let mut q = TimerQueue::new();
        q.every(0.02, Task::Groove);
        q.every(0.01, Task::Flush);
        let fired: Vec<Task> = drain(&mut q, 0.02).into_iter().map(|(_, t)| t).collect();
        // Both due at 0.02: Groove was registered first
        assert_eq!(fired, [Task::Flush, Task::Groove, Task::Flush]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let id = q.every(0.1, Task::Fills);
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert_eq!(q.active_count(), 0);
        assert!(drain(&mut q, 1.0).is_empty());
    }

    #[test]
    fn clock_never_moves_backward() {
        let mut q = TimerQueue::new();
        q.set_now(2.0);
        q.set_now(1.0);
        assert_eq!(q.now(), 2.0);
    }

    #[test]
    fn new_timer_starts_from_current_time() {
        let mut q = TimerQueue::new();
        q.set_now(5.0);
        q.every(0.5, Task::Groove);
        assert!(q.next_due(5.4).is_none());
        assert!(q.next_due(5.5).is_some());
    }
}
