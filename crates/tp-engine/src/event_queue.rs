//! Bounded queue of pending trigger requests.

use alloc::collections::VecDeque;
use tp_ir::{Origin, TriggerRequest};

/// Default bound on pending requests.
pub const DEFAULT_CAPACITY: usize = 256;

/// Pending trigger requests in enqueue order.
///
/// Bounded: when full, the oldest immediate fill is evicted first, then
/// the oldest request of any origin. Storage is reserved up front so the
/// flush path never reallocates.
#[derive(Clone, Debug)]
pub struct EventQueue {
    events: VecDeque<TriggerRequest>,
    capacity: usize,
    /// Requests evicted by the overflow policy since creation.
    dropped: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a request, returning whatever the overflow policy evicted.
    pub fn push(&mut self, request: TriggerRequest) -> Option<TriggerRequest> {
        let evicted = if self.events.len() >= self.capacity {
            let victim = self
                .events
                .iter()
                .position(|e| e.origin == Origin::Fill)
                .unwrap_or(0);
            self.dropped += 1;
            self.events.remove(victim)
        } else {
            None
        };
        self.events.push_back(request);
        evicted
    }

    /// Remove every request with `time <= horizon`, handing each to
    /// `dispatch` in enqueue order. Later requests keep their order.
    ///
    /// A request is out of the queue before `dispatch` sees it, so it can
    /// never be handed out twice.
    pub fn flush_until<F: FnMut(TriggerRequest)>(&mut self, horizon: f64, mut dispatch: F) -> usize {
        let mut fired = 0;
        for _ in 0..self.events.len() {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            if event.time <= horizon {
                dispatch(event);
                fired += 1;
            } else {
                self.events.push_back(event);
            }
        }
        fired
    }

    /// Iterate pending requests in enqueue order.
    pub fn iter(&self) -> impl Iterator<Item = &TriggerRequest> {
        self.events.iter()
    }

    /// Clear all pending requests.
    /// Remove every request of `origin`, keeping the rest in order.
    /// Returns how many were removed.
    pub fn discard(&mut self, origin: Origin) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.origin != origin);
        before - self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of pending requests.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn req(name: &str, time: f64) -> TriggerRequest {
        TriggerRequest::new(name, time, 0.5)
    }

    #[test]
    fn flush_dispatches_due_in_enqueue_order() {
        let mut queue = EventQueue::new();
        queue.push(req("snare", 0.3));
        queue.push(req("kick", 0.1));
        queue.push(req("hat", 0.9));
        queue.push(req("bass", 0.2));

        let mut seen = Vec::new();
        let n = queue.flush_until(0.5, |r| seen.push(r.instrument));
        assert_eq!(n, 3);
        let names: Vec<&str> = seen.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["snare", "kick", "bass"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().instrument.as_str(), "hat");
    }

    #[test]
    fn flush_keeps_exactly_the_future() {
        let mut queue = EventQueue::new();
        for i in 0..20 {
            queue.push(req("hat", i as f64 * 0.1));
        }
        queue.flush_until(1.0, |_| {});
        assert!(queue.iter().all(|r| r.time > 1.0));
        assert_eq!(queue.len(), 9);
    }

    #[test]
    fn flushed_requests_are_not_redispatched() {
        let mut queue = EventQueue::new();
        queue.push(req("kick", 0.0));
        assert_eq!(queue.flush_until(1.0, |_| {}), 1);
        assert_eq!(queue.flush_until(1.0, |_| {}), 0);
    }

    #[test]
    fn remaining_order_is_preserved() {
        let mut queue = EventQueue::new();
        queue.push(req("a", 2.0));
        queue.push(req("b", 0.0));
        queue.push(req("c", 3.0));
        queue.push(req("d", 1.0));
        queue.flush_until(0.5, |_| {});
        let names: Vec<&str> = queue.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, ["a", "c", "d"]);
    }

    #[test]
    fn discard_removes_one_origin_only() {
        let mut queue = EventQueue::new();
        queue.push(req("kick", 1.0));
        queue.push(req("lead", 1.1).with_origin(Origin::Fill));
        queue.push(req("hat", 1.2));
        assert_eq!(queue.discard(Origin::Groove), 2);
        let names: Vec<&str> = queue.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, ["lead"]);
        assert_eq!(queue.discard(Origin::Groove), 0);
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn overflow_evicts_oldest_fill_first() {
        let mut queue = EventQueue::with_capacity(3);
        queue.push(req("kick", 1.0));
        queue.push(req("lead", 1.1).with_origin(Origin::Fill));
        queue.push(req("hat", 1.2));
        let evicted = queue.push(req("snare", 1.3));
        assert_eq!(evicted.unwrap().instrument.as_str(), "lead");
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn overflow_without_fills_evicts_oldest() {
        let mut queue = EventQueue::with_capacity(2);
        queue.push(req("kick", 1.0));
        queue.push(req("hat", 1.1));
        let evicted = queue.push(req("snare", 1.2));
        assert_eq!(evicted.unwrap().instrument.as_str(), "kick");
        let names: Vec<&str> = queue.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(names, ["hat", "snare"]);
    }
}
