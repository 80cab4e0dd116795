//! Lookahead event scheduler.
//!
//! Holds time-stamped trigger requests until they fall inside a rolling
//! horizon of the audio clock, then dispatches them to registered
//! instruments. Polling is coarse (a periodic [`Task::Flush`] timer) but
//! each dispatched request still carries its exact target time into the
//! voice, which places the note sample-accurately in the output graph.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use tp_ir::{InstrumentName, Origin, TriggerRequest, VoiceMode};
use tracing::{debug, info, trace, warn};

use crate::event_queue::{EventQueue, DEFAULT_CAPACITY};
use crate::graph::OutputGraph;
use crate::timer::{Task, TimerHost, TimerId};
use crate::voice::Instrument;

/// Default flush cadence and horizon, in milliseconds.
pub const DEFAULT_LOOKAHEAD_MS: f64 = 25.0;

pub struct Scheduler {
    queue: EventQueue,
    lookahead_ms: f64,
    timer: Option<TimerId>,
    instruments: BTreeMap<InstrumentName, Box<dyn Instrument>>,
    released: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: EventQueue::with_capacity(capacity),
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            timer: None,
            instruments: BTreeMap::new(),
            released: false,
        }
    }

    /// Bind `voice` to `name`, replacing any previous binding.
    pub fn register_instrument(&mut self, name: impl Into<InstrumentName>, voice: Box<dyn Instrument>) {
        let name = name.into();
        if self.instruments.insert(name, voice).is_some() {
            debug!(instrument = %name, "replaced instrument");
        }
        self.released = false;
    }

    pub fn has_instrument(&self, name: &str) -> bool {
        self.instruments.contains_key(&InstrumentName::new(name))
    }

    /// Queue a request for the next flush whose horizon covers it.
    ///
    /// Requests already in the past go out on the very next flush.
    pub fn schedule(&mut self, request: TriggerRequest) {
        if !request.time.is_finite() {
            debug!(instrument = %request.instrument, "dropped request with non-finite time");
            return;
        }
        if let Some(evicted) = self.queue.push(request) {
            warn!(
                instrument = %evicted.instrument,
                time = evicted.time,
                dropped = self.queue.dropped(),
                "scheduler queue full, evicted request"
            );
        }
    }

    /// Begin periodic flushing. A second call while running is a no-op.
    pub fn start<H: TimerHost + ?Sized>(&mut self, host: &mut H) {
        if self.timer.is_some() {
            return;
        }
        self.timer = Some(host.every(self.lookahead_ms / 1000.0, Task::Flush));
        info!(lookahead_ms = self.lookahead_ms, "scheduler started");
    }

    /// Stop periodic flushing. Queued requests are kept.
    pub fn stop<H: TimerHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(id) = self.timer.take() {
            host.cancel(id);
            info!(pending = self.queue.len(), "scheduler stopped");
        }
    }

    /// Change the flush cadence and horizon.
    ///
    /// If running, the old timer is swapped for one at the new cadence;
    /// queued requests are untouched. Non-positive values are ignored.
    pub fn set_lookahead<H: TimerHost + ?Sized>(&mut self, host: &mut H, ms: f64) {
        if !(ms.is_finite() && ms > 0.0) {
            warn!(ms, "ignored invalid lookahead");
            return;
        }
        self.lookahead_ms = ms;
        if let Some(old) = self.timer.take() {
            host.cancel(old);
            self.timer = Some(host.every(ms / 1000.0, Task::Flush));
        }
        debug!(lookahead_ms = ms, running = self.timer.is_some(), "lookahead changed");
    }

    pub fn lookahead_ms(&self) -> f64 {
        self.lookahead_ms
    }

    /// Dispatch every request with `time <= now + lookahead`, in enqueue
    /// order. Returns the number dispatched.
    pub fn flush(&mut self, now: f64, graph: &mut OutputGraph) -> usize {
        let horizon = now + self.lookahead_ms / 1000.0;
        let instruments = &mut self.instruments;
        self.queue
            .flush_until(horizon, |req| dispatch(instruments, graph, &req))
    }

    /// Trigger an instrument directly, bypassing the queue.
    ///
    /// Unknown names are a silent no-op.
    pub fn trigger(
        &mut self,
        graph: &mut OutputGraph,
        name: &str,
        time: f64,
        velocity: f32,
        note: Option<i32>,
    ) {
        let mut request = TriggerRequest::new(name, time, velocity);
        request.note = note;
        dispatch(&mut self.instruments, graph, &request);
    }

    /// Forward a mode change to the named voice. Unknown names are ignored.
    pub fn set_mode(&mut self, name: &str, mode: VoiceMode) {
        if let Some(voice) = self.instruments.get_mut(&InstrumentName::new(name)) {
            voice.set_mode(mode);
        }
    }

    /// Drop every queued request of `origin`.
    pub fn discard(&mut self, origin: Origin) -> usize {
        let removed = self.queue.discard(origin);
        if removed > 0 {
            debug!(?origin, removed, "discarded queued requests");
        }
        removed
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> impl Iterator<Item = &TriggerRequest> {
        self.queue.iter()
    }

    /// Requests evicted by the overflow policy.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Stop, clear the queue and release every instrument. Idempotent, and
    /// safe without a prior `start`.
    pub fn dispose<H: TimerHost + ?Sized>(&mut self, host: &mut H) {
        self.stop(host);
        self.queue.clear();
        if !self.released {
            self.instruments.clear();
            self.released = true;
            info!("scheduler released instruments");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(
    instruments: &mut BTreeMap<InstrumentName, Box<dyn Instrument>>,
    graph: &mut OutputGraph,
    req: &TriggerRequest,
) {
    match instruments.get_mut(&req.instrument) {
        Some(voice) => voice.trigger(graph, req.time, req.velocity, req.note),
        None => trace!(instrument = %req.instrument, "no such instrument"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerQueue;
    use crate::voice::Kick;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    /// Counts triggers without producing sound.
    struct Probe(Arc<AtomicUsize>);

    impl Instrument for Probe {
        fn trigger(&mut self, _: &mut OutputGraph, _: f64, _: f32, _: Option<i32>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn probed() -> (Scheduler, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut s = Scheduler::new();
        s.register_instrument("probe", Box::new(Probe(Arc::clone(&hits))));
        (s, hits)
    }

    #[test]
    fn flush_respects_horizon() {
        let (mut s, hits) = probed();
        let mut graph = OutputGraph::new(8_000);
        s.schedule(TriggerRequest::new("probe", 1.02, 1.0));
        s.schedule(TriggerRequest::new("probe", 1.03, 1.0));
        assert_eq!(s.flush(1.0, &mut graph), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(s.pending(), 1);
    }

    #[test]
    fn past_requests_fire_on_next_flush() {
        let (mut s, hits) = probed();
        let mut graph = OutputGraph::new(8_000);
        s.schedule(TriggerRequest::new("probe", 0.5, 1.0));
        s.flush(2.0, &mut graph);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        s.flush(3.0, &mut graph);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn double_start_keeps_one_timer() {
        let mut host = TimerQueue::new();
        let mut s = Scheduler::new();
        s.start(&mut host);
        s.start(&mut host);
        assert_eq!(host.active_count(), 1);
        s.stop(&mut host);
        s.stop(&mut host);
        assert_eq!(host.active_count(), 0);
    }

    #[test]
    fn set_lookahead_while_stopped_does_not_start() {
        let mut host = TimerQueue::new();
        let mut s = Scheduler::new();
        s.set_lookahead(&mut host, 40.0);
        assert!(!s.is_running());
        assert_eq!(host.active_count(), 0);
        s.start(&mut host);
        assert_eq!(host.active_count(), 1);
    }

    #[test]
    fn invalid_lookahead_is_ignored() {
        let mut host = TimerQueue::new();
        let mut s = Scheduler::new();
        s.set_lookahead(&mut host, 0.0);
        s.set_lookahead(&mut host, f64::NAN);
        assert_eq!(s.lookahead_ms(), DEFAULT_LOOKAHEAD_MS);
    }

    #[test]
    fn unknown_instrument_is_a_no_op() {
        let mut s = Scheduler::new();
        let mut graph = OutputGraph::new(8_000);
        s.trigger(&mut graph, "ghost", 0.0, 1.0, None);
        s.schedule(TriggerRequest::new("ghost", 0.0, 1.0));
        assert_eq!(s.flush(0.0, &mut graph), 1);
        assert_eq!(graph.active_notes(), 0);
    }

    #[test]
    fn reregistering_replaces_voice() {
        let (mut s, hits) = probed();
        let mut graph = OutputGraph::new(8_000);
        s.register_instrument("probe", Box::new(Kick));
        s.trigger(&mut graph, "probe", 0.0, 1.0, None);
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(graph.active_notes(), 1);
    }

    #[test]
    fn non_finite_time_is_not_queued() {
        let mut s = Scheduler::new();
        s.schedule(TriggerRequest::new("kick", f64::INFINITY, 1.0));
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut host = TimerQueue::new();
        let (mut s, _) = probed();
        s.dispose(&mut host);
        s.start(&mut host);
        s.schedule(TriggerRequest::new("probe", 1.0, 1.0));
        s.dispose(&mut host);
        s.dispose(&mut host);
        assert_eq!(host.active_count(), 0);
        assert_eq!(s.pending(), 0);
        assert!(!s.has_instrument("probe"));
    }
}
