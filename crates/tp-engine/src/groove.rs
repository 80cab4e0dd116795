//! The groove step machine.
//!
//! There is no enumerated state: `step mod 16` (bar position) together
//! with the control parameters fully determines what fires. Each call to
//! [`run_groove`] emits every step whose start falls before the end of the
//! lookahead window, so a late poll catches up instead of skipping.

use rand::Rng;
use tp_ir::{clamp01, ControlParams, Directive, Role, TriggerRequest};
use tracing::warn;

use crate::control::round_half_up;
use crate::harmony::{chord_root, degree_to_midi};

/// Default groove lookahead window in seconds.
pub const DEFAULT_WINDOW: f64 = 0.25;

pub const STEPS_PER_BAR: u64 = 16;

/// Groove position plus the controls it plays with. Replaced wholesale.
///
/// Step times are measured from an anchor: the session start at first,
/// moved to the next pending step whenever the tempo changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrooveState {
    pub params: ControlParams,
    pub directive: Directive,
    step: u64,
    anchor_step: u64,
    anchor_time: f64,
}

impl GrooveState {
    /// A fresh session whose step 0 falls at `start`.
    pub fn new(start: f64, params: ControlParams, directive: Directive) -> Self {
        Self {
            params,
            directive,
            step: 0,
            anchor_step: 0,
            anchor_time: start,
        }
    }

    /// Next step to be emitted.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Audio-clock start of `step` at the current tempo.
    pub fn step_time(&self, step: u64) -> f64 {
        let offset = step as f64 - self.anchor_step as f64;
        self.anchor_time + offset * self.params.step_duration()
    }

    /// Same position with new controls. A tempo change re-anchors at the
    /// pending step so no step is skipped or replayed.
    pub fn with_params(self, params: ControlParams) -> Self {
        if params.bpm == self.params.bpm {
            return Self { params, ..self };
        }
        Self {
            params,
            anchor_step: self.step,
            anchor_time: self.step_time(self.step),
            ..self
        }
    }

    pub fn with_directive(self, directive: Directive) -> Self {
        Self { directive, ..self }
    }

    /// Back to step 0, starting at `start`.
    pub fn restart(self, start: f64) -> Self {
        Self::new(start, self.params, self.directive)
    }

    /// Root of the chord for `step` (one chord per bar).
    pub fn chord_base(&self, step: u64) -> i32 {
        chord_root(self.params.root, step / STEPS_PER_BAR, self.directive.mood)
    }
}

/// Emit every step starting before `now + window`, then return the
/// advanced state.
///
/// A non-positive or non-finite step duration, or a non-finite horizon,
/// emits nothing and leaves the state untouched.
pub fn run_groove<R, F>(state: GrooveState, now: f64, window: f64, rng: &mut R, mut emit: F) -> GrooveState
where
    R: Rng + ?Sized,
    F: FnMut(TriggerRequest),
{
    let mut state = state;
    let horizon = now + window;
    let dur = state.params.step_duration();
    if !(dur.is_finite() && dur > 0.0 && horizon.is_finite()) {
        warn!(bpm = state.params.bpm, horizon, "groove cannot advance");
        return state;
    }
    while state.step_time(state.step) < horizon {
        play_step(&state, rng, &mut emit);
        state.step += 1;
    }
    state
}

fn play_step<R, F>(state: &GrooveState, rng: &mut R, emit: &mut F)
where
    R: Rng + ?Sized,
    F: FnMut(TriggerRequest),
{
    let step = state.step;
    let bar_pos = step % STEPS_PER_BAR;
    let t = state.step_time(step);
    let p = &state.params;
    let density = p.density;
    let scale = state.directive.scale;
    let hit = |role: Role, time: f64, velocity: f32| TriggerRequest::new(role.instrument(), time, velocity);

    if bar_pos == 0 {
        emit(hit(Role::Kick, t, 0.9));
    } else if bar_pos == 4 && density > 0.4 {
        emit(hit(Role::Kick, t, 0.7));
    }

    if bar_pos == 8 || (density > 0.6 && bar_pos == 12) {
        emit(hit(Role::Snare, t + 0.01, 0.72));
    }

    if step % 2 == 0 {
        // Hats sit on eighths; the off-beat eighth takes the swing.
        let swing = if step % 4 == 2 {
            p.swing as f64 * p.step_duration()
        } else {
            0.0
        };
        emit(hit(Role::Hat, t + swing, clamp01(0.3 + 0.5 * density)));
    }

    let chord_base = state.chord_base(step);

    if step % 4 == 0 {
        let drop = if step % 32 == 16 { -5 } else { 0 };
        emit(hit(Role::Bass, t, 0.5 + 0.3 * density).with_note(chord_base + drop));
    }

    if step % 8 == 0 && density > 0.25 {
        let pitch = clamp01(state.directive.mapping_adjustments.pitch_influence);
        let degree = 4 + round_half_up(2.0 + pitch * 4.0) as i32;
        let note = degree_to_midi(chord_base, degree, scale);
        emit(hit(Role::Lead, t + 0.02, 0.4 + 0.35 * density).with_note(note));
    }

    if bar_pos > 12 && rng.random::<f32>() < p.fill_chance {
        emit(hit(Role::Snare, t + 0.03, 0.5));
        emit(hit(Role::Hat, t + 0.04, 0.55));
    }

    if bar_pos == 0 && density > 0.2 {
        emit(hit(Role::Texture, t, 0.28 + 0.2 * density));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use tp_ir::Scale;

    fn params(bpm: f32, density: f32, swing: f32, fill_chance: f32) -> ControlParams {
        ControlParams { bpm, density, swing, fill_chance, root: 48 }
    }

    fn collect(state: GrooveState, now: f64) -> (GrooveState, Vec<TriggerRequest>) {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut out = Vec::new();
        let next = run_groove(state, now, DEFAULT_WINDOW, &mut rng, |r| out.push(r));
        (next, out)
    }

    fn named<'a>(reqs: &'a [TriggerRequest], name: &'a str) -> impl Iterator<Item = &'a TriggerRequest> {
        reqs.iter().filter(move |r| r.instrument.as_str() == name)
    }

    #[test]
    fn first_poll_fills_the_window() {
        // 120 bpm: 0.125 s steps, window 0.25 s covers steps 0 and 1.
        let state = GrooveState::new(0.0, params(120.0, 0.0, 0.0, 0.0), Directive::default());
        let (next, _) = collect(state, 0.0);
        assert_eq!(next.step(), 2);
    }

    #[test]
    fn late_poll_catches_up_without_skipping() {
        let state = GrooveState::new(0.0, params(120.0, 0.0, 0.0, 0.0), Directive::default());
        let (next, reqs) = collect(state, 1.0);
        assert_eq!(next.step(), 10);
        assert_eq!(named(&reqs, "hat").count(), 5);
    }

    #[test]
    fn dense_bar_has_extra_kick_and_snare() {
        let state = GrooveState::new(0.0, params(96.0, 0.8, 0.0, 0.0), Directive::default());
        let (_, reqs) = collect(state, 2.25);
        assert_eq!(named(&reqs, "kick").count(), 2);
        assert_eq!(named(&reqs, "snare").count(), 2);
        assert_eq!(named(&reqs, "lead").count(), 2);
        assert_eq!(named(&reqs, "texture").count(), 1);
    }

    #[test]
    fn swing_shifts_offbeat_hats_only() {
        let p = params(120.0, 0.0, 0.2, 0.0);
        let state = GrooveState::new(0.0, p, Directive::default());
        let (_, reqs) = collect(state, 0.25);
        let hats: Vec<f64> = named(&reqs, "hat").map(|r| r.time).collect();
        assert_eq!(hats.len(), 2);
        assert_eq!(hats[0], 0.0);
        assert!((hats[1] - (0.25 + 0.2 * 0.125)).abs() < 1e-6);
    }

    #[test]
    fn bass_drops_a_fourth_in_second_bar_half() {
        let state = GrooveState::new(0.0, params(160.0, 0.0, 0.0, 0.0), Directive::default());
        let (_, reqs) = collect(state, 2.0);
        let bass: Vec<(f64, i32)> = named(&reqs, "bass")
            .map(|r| (r.time, r.note.unwrap_or_default()))
            .collect();
        let at_16 = state.chord_base(16) - 5;
        assert!(bass.iter().any(|&(_, n)| n == at_16));
    }

    #[test]
    fn lead_degree_widens_with_pitch_influence() {
        let mut d = Directive { scale: Scale::Minor, ..Directive::default() };
        d.mapping_adjustments.pitch_influence = 1.0;
        let state = GrooveState::new(0.0, params(96.0, 0.5, 0.0, 0.0), d);
        let (_, reqs) = collect(state, 0.0);
        let lead = named(&reqs, "lead").next().and_then(|r| r.note);
        // degree 4 + 6 = 10 in a six-step scale: one octave plus step 4.
        assert_eq!(lead, Some(state.chord_base(0) + 12 + 7));
    }

    #[test]
    fn tempo_change_reanchors_at_pending_step() {
        let state = GrooveState::new(1.0, params(120.0, 0.0, 0.0, 0.0), Directive::default());
        let (state, _) = collect(state, 1.0);
        assert_eq!(state.step(), 2);
        let pending = state.step_time(2);
        let faster = state.with_params(params(150.0, 0.0, 0.0, 0.0));
        assert_eq!(faster.step_time(2), pending);
        assert!((faster.step_time(3) - (pending + 0.1)).abs() < 1e-12);
        assert_eq!(faster.step(), 2);
    }

    #[test]
    fn degenerate_tempo_or_horizon_emits_nothing() {
        for bpm in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let state = GrooveState::new(0.0, params(bpm, 0.5, 0.0, 0.0), Directive::default());
            let (next, reqs) = collect(state, 1.0);
            assert!(reqs.is_empty(), "bpm {bpm}");
            assert_eq!(next.step(), 0);
        }
        let state = GrooveState::new(0.0, params(120.0, 0.5, 0.0, 0.0), Directive::default());
        let (next, reqs) = collect(state, f64::INFINITY);
        assert!(reqs.is_empty());
        assert_eq!(next.step(), 0);
    }

    #[test]
    fn same_seed_same_fills() {
        let p = params(140.0, 0.5, 0.0, 0.5);
        let state = GrooveState::new(0.0, p, Directive::default());
        let (_, a) = collect(state, 4.0);
        let (_, b) = collect(state, 4.0);
        assert_eq!(a, b);
    }

    #[test]
    fn certain_fill_fires_on_last_three_steps() {
        let state = GrooveState::new(0.0, params(96.0, 0.0, 0.0, 1.0), Directive::default());
        let (_, reqs) = collect(state, 2.25);
        let fills = named(&reqs, "snare").filter(|r| r.velocity == 0.5).count();
        assert_eq!(fills, 3);
    }
}
