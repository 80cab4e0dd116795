//! The live mapper: wires snapshot, directive and raw events into the
//! groove, scheduler and voice bank on one audio clock.
//!
//! Three periodic timers drive the rig: scheduler flush, groove advance
//! and immediate-fill polling. They share no state beyond "last write
//! wins" on the groove record, so their interleaving does not matter.

use heapless::Deque;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tp_ir::{
    clamp01, ControlParams, Directive, DirectiveError, InteractionEvent, InteractionSnapshot,
    Origin, Role, TriggerRequest, VoiceMode,
};
use tracing::{debug, info, warn};

use crate::control::derive_params;
use crate::frame::Frame;
use crate::graph::OutputGraph;
use crate::groove::{run_groove, GrooveState, DEFAULT_WINDOW};
use crate::harmony::{degree_to_midi, key_to_degree};
use crate::scheduler::{Scheduler, DEFAULT_LOOKAHEAD_MS};
use crate::timer::{Task, TimerHost, TimerId, TimerQueue};
use crate::voice::VoiceBank;

/// Raw events held between fill polls.
pub const INBOX_CAPACITY: usize = 512;

/// Timing and sizing for a [`Rig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigConfig {
    pub sample_rate: u32,
    pub lookahead_ms: f64,
    /// Seconds between groove cycles.
    pub groove_interval: f64,
    /// Seconds between immediate-fill polls.
    pub fill_interval: f64,
    /// Groove lookahead window in seconds.
    pub groove_window: f64,
    pub queue_capacity: usize,
    pub seed: u64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            groove_interval: 0.045,
            fill_interval: 0.035,
            groove_window: DEFAULT_WINDOW,
            queue_capacity: crate::event_queue::DEFAULT_CAPACITY,
            seed: 0x7469_6465,
        }
    }
}

pub struct Rig {
    config: RigConfig,
    timers: TimerQueue,
    scheduler: Scheduler,
    graph: OutputGraph,
    groove: GrooveState,
    snapshot: InteractionSnapshot,
    inbox: Deque<InteractionEvent, INBOX_CAPACITY>,
    inbox_dropped: u64,
    rng: Pcg32,
    groove_timer: Option<TimerId>,
    fill_timer: Option<TimerId>,
}

impl Rig {
    pub fn new(config: RigConfig) -> Self {
        let mut timers = TimerQueue::new();
        let mut scheduler = Scheduler::with_capacity(config.queue_capacity);
        scheduler.set_lookahead(&mut timers, config.lookahead_ms);
        VoiceBank::standard(config.sample_rate, config.seed).register_all(&mut scheduler);
        Self {
            config,
            timers,
            scheduler,
            graph: OutputGraph::new(config.sample_rate),
            groove: GrooveState::new(0.0, ControlParams::default(), Directive::default()),
            snapshot: InteractionSnapshot::default(),
            inbox: Deque::new(),
            inbox_dropped: 0,
            rng: Pcg32::seed_from_u64(config.seed.wrapping_add(1)),
            groove_timer: None,
            fill_timer: None,
        }
    }

    /// Start the flush, groove and fill timers. The groove restarts at
    /// step 0, placed on the first flush; groove requests still queued
    /// from an earlier run are dropped. No-op while running.
    pub fn start(&mut self) {
        if self.groove_timer.is_some() {
            return;
        }
        self.scheduler.discard(Origin::Groove);
        self.scheduler.start(&mut self.timers);
        let now = self.timers.now();
        let first_step = now + self.scheduler.lookahead_ms() / 1000.0;
        self.groove = self.groove.restart(first_step);
        self.groove_timer = Some(self.timers.every(self.config.groove_interval, Task::Groove));
        self.fill_timer = Some(self.timers.every(self.config.fill_interval, Task::Fills));
        self.groove_cycle(now);
        info!(now, bpm = self.groove.params.bpm, "rig started");
    }

    /// Cancel every timer. Queued requests and sounding notes are kept.
    pub fn stop(&mut self) {
        self.scheduler.stop(&mut self.timers);
        let groove = self.groove_timer.take();
        let fills = self.fill_timer.take();
        for id in groove.into_iter().chain(fills) {
            self.timers.cancel(id);
        }
    }

    /// Stop and release all synthesis resources. Idempotent.
    pub fn dispose(&mut self) {
        self.stop();
        self.scheduler.dispose(&mut self.timers);
        self.graph.clear();
        self.inbox.clear();
    }

    pub fn is_running(&self) -> bool {
        self.groove_timer.is_some()
    }

    pub fn update_snapshot(&mut self, snapshot: InteractionSnapshot) {
        self.snapshot = snapshot;
    }

    /// Replace the directive wholesale and retune the melodic voices.
    ///
    /// An invalid directive is discarded and the previous one retained.
    pub fn update_directive(&mut self, directive: Directive) -> Result<(), DirectiveError> {
        if let Err(err) = directive.validate() {
            warn!(%err, "rejected directive, keeping previous");
            return Err(err);
        }
        self.groove = self.groove.with_directive(directive);
        for mode in directive.voice_modes() {
            self.scheduler.set_mode(mode_role(mode).name(), mode);
        }
        debug!(bpm = directive.bpm, scale = ?directive.scale, mood = ?directive.mood, "directive applied");
        Ok(())
    }

    /// Queue a raw interaction event for the next fill poll. When the inbox
    /// is full the oldest event is dropped.
    pub fn push_event(&mut self, event: InteractionEvent) {
        if self.inbox.is_full() {
            self.inbox.pop_front();
            self.inbox_dropped += 1;
            debug!(dropped = self.inbox_dropped, "interaction inbox full");
        }
        let _ = self.inbox.push_back(event);
    }

    /// Queue a request on the scheduler.
    pub fn schedule(&mut self, request: TriggerRequest) {
        self.scheduler.schedule(request);
    }

    /// Trigger an instrument immediately. Unknown names are ignored.
    pub fn trigger(&mut self, name: &str, time: f64, velocity: f32, note: Option<i32>) {
        self.scheduler.trigger(&mut self.graph, name, time, velocity, note);
    }

    pub fn set_lookahead(&mut self, ms: f64) {
        self.scheduler.set_lookahead(&mut self.timers, ms);
    }

    /// Audio-clock time of the timers.
    pub fn now(&self) -> f64 {
        self.timers.now()
    }

    /// Run every timer due up to `time`, in due order, then move the clock
    /// to `time`.
    pub fn advance_to(&mut self, time: f64) {
        while let Some((_, task)) = self.timers.next_due(time) {
            let now = self.timers.now();
            match task {
                Task::Flush => {
                    self.scheduler.flush(now, &mut self.graph);
                }
                Task::Groove => self.groove_cycle(now),
                Task::Fills => self.fill_cycle(now),
            }
        }
        self.timers.set_now(time);
    }

    /// Render the next block: timers first up to the block's end, then
    /// audio.
    pub fn render(&mut self, out: &mut [Frame]) {
        let end = self.graph.now() + out.len() as f64 / self.graph.sample_rate() as f64;
        self.advance_to(end);
        self.graph.render(out);
    }

    fn groove_cycle(&mut self, now: f64) {
        let params = derive_params(&self.snapshot, &self.groove.directive);
        let state = self.groove.with_params(params);
        let scheduler = &mut self.scheduler;
        self.groove = run_groove(state, now, self.config.groove_window, &mut self.rng, |req| {
            scheduler.schedule(req)
        });
    }

    fn fill_cycle(&mut self, now: f64) {
        let snapshot = self.snapshot.clamped();
        while let Some(event) = self.inbox.pop_front() {
            match event {
                InteractionEvent::PointerDown { speed } => {
                    let speed = if speed.is_finite() { speed } else { 0.0 };
                    self.fill(Role::Kick, now, clamp01(0.45 + 0.8 * speed), None);
                    if snapshot.chaos > 0.4 {
                        self.fill(Role::Snare, now + 0.04, 0.4 + 0.3 * snapshot.chaos, None);
                    }
                }
                InteractionEvent::KeyPress { key } => {
                    let degree = key_to_degree(Some(key), &mut self.rng);
                    if (self.groove.step() + degree as u64) % 4 == 0 {
                        self.fill(Role::Texture, now, 0.25 + 0.2 * snapshot.density, None);
                    } else {
                        let note =
                            degree_to_midi(self.groove.params.root, degree, self.groove.directive.scale);
                        self.fill(Role::Lead, now, 0.55 + 0.35 * snapshot.energy, Some(note));
                    }
                }
                InteractionEvent::PointerUp | InteractionEvent::PointerMove { .. } => {}
            }
        }
    }

    fn fill(&mut self, role: Role, time: f64, velocity: f32, note: Option<i32>) {
        let mut request = TriggerRequest::new(role.instrument(), time, velocity).with_origin(Origin::Fill);
        request.note = note;
        self.scheduler.schedule(request);
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn groove(&self) -> &GrooveState {
        &self.groove
    }

    pub fn params(&self) -> &ControlParams {
        &self.groove.params
    }

    pub fn directive(&self) -> &Directive {
        &self.groove.directive
    }

    pub fn snapshot(&self) -> &InteractionSnapshot {
        &self.snapshot
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn graph(&self) -> &OutputGraph {
        &self.graph
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    pub fn inbox_dropped(&self) -> u64 {
        self.inbox_dropped
    }
}

fn mode_role(mode: VoiceMode) -> Role {
    match mode {
        VoiceMode::Lead(_) => Role::Lead,
        VoiceMode::Bass(_) => Role::Bass,
        VoiceMode::Texture(_) => Role::Texture,
    }
}
