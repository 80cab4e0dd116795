//! Synthesis recipes: a fully specified note plus its render state.
//!
//! A [`Note`] captures every parameter at trigger time, so changing a
//! voice's mode afterwards never touches a note already in flight.

use alloc::sync::Arc;
use core::f32::consts::{PI, TAU};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Square,
}

impl Waveform {
    /// Sample at `phase` in 0..1.
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => libm::sinf(phase * TAU),
            Waveform::Triangle => 1.0 - 4.0 * libm::fabsf(phase - 0.5),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Exponential,
}

/// A value moving from `from` to `to` over `duration` seconds, then holding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ramp {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
    pub curve: Curve,
}

impl Ramp {
    pub const fn hold(value: f32) -> Self {
        Self { from: value, to: value, duration: 0.0, curve: Curve::Linear }
    }

    pub const fn linear(from: f32, to: f32, duration: f32) -> Self {
        Self { from, to, duration, curve: Curve::Linear }
    }

    /// Exponential ramp; both endpoints must be positive.
    pub const fn exponential(from: f32, to: f32, duration: f32) -> Self {
        Self { from, to, duration, curve: Curve::Exponential }
    }

    pub fn value(&self, t: f32) -> f32 {
        if t >= self.duration || self.duration <= 0.0 {
            return self.to;
        }
        let x = (t / self.duration).max(0.0);
        match self.curve {
            Curve::Linear => self.from + (self.to - self.from) * x,
            Curve::Exponential => self.from * libm::powf(self.to / self.from, x),
        }
    }

    fn is_valid(&self) -> bool {
        let finite = self.from.is_finite() && self.to.is_finite() && self.duration.is_finite();
        match self.curve {
            Curve::Linear => finite,
            Curve::Exponential => finite && self.from > 0.0 && self.to > 0.0,
        }
    }
}

/// Amplitude envelope, times in seconds from note start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Envelope {
    /// Linear 0 → peak → sustain·peak → 0; release follows decay directly.
    Adsr {
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    },
    /// Linear attack then exponential decay to roughly -40 dB at `decay`.
    Percussive { attack: f32, decay: f32 },
}

impl Envelope {
    pub fn level(&self, t: f32, peak: f32) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        match *self {
            Envelope::Adsr { attack, decay, sustain, release } => {
                let sus = (sustain * peak).clamp(0.0, 1.0);
                if t < attack {
                    peak * t / attack
                } else if t < attack + decay {
                    peak + (sus - peak) * (t - attack) / decay
                } else if t < attack + decay + release {
                    sus * (1.0 - (t - attack - decay) / release)
                } else {
                    0.0
                }
            }
            Envelope::Percussive { attack, decay } => {
                if t < attack {
                    peak * t / attack
                } else if t < attack + decay {
                    peak * libm::expf(-4.6 * (t - attack) / decay)
                } else {
                    0.0
                }
            }
        }
    }

    /// Time after which the envelope is silent.
    pub fn duration(&self) -> f32 {
        match *self {
            Envelope::Adsr { attack, decay, release, .. } => attack + decay + release,
            Envelope::Percussive { attack, decay } => attack + decay,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Filter with a (possibly moving) cutoff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSweep {
    pub kind: FilterKind,
    pub cutoff: Ramp,
    pub q: f32,
}

impl FilterSweep {
    pub fn new(kind: FilterKind, cutoff: Ramp) -> Self {
        Self { kind, cutoff, q: 0.707 }
    }

    pub fn with_q(mut self, q: f32) -> Self {
        self.q = q;
        self
    }
}

/// Topology-preserving state-variable filter state.
#[derive(Clone, Copy, Debug, Default)]
struct Svf {
    ic1eq: f32,
    ic2eq: f32,
}

impl Svf {
    fn process(&mut self, x: f32, kind: FilterKind, cutoff: f32, q: f32, sample_rate: f32) -> f32 {
        let fc = cutoff.clamp(10.0, sample_rate * 0.45);
        let g = libm::tanf(PI * fc / sample_rate);
        let k = 1.0 / q.max(0.05);
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;
        let v3 = x - self.ic2eq;
        let v1 = a1 * self.ic1eq + a2 * v3;
        let v2 = self.ic2eq + a2 * self.ic1eq + a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        match kind {
            FilterKind::Lowpass => v2,
            FilterKind::Bandpass => v1,
            FilterKind::Highpass => x - k * v1 - v2,
        }
    }
}

/// Frequency-modulation sidechain: a sine modulator added to the carrier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fm {
    /// Modulator frequency as a multiple of the carrier.
    pub ratio: f32,
    /// Modulation depth as a multiple of the carrier frequency (Hz/Hz).
    pub index: f32,
    /// Seconds after note start at which the modulator stops.
    pub stop: f32,
}

#[derive(Clone, Debug)]
pub enum Source {
    Osc {
        wave: Waveform,
        freq: Ramp,
        fm: Option<Fm>,
    },
    /// Pre-rendered noise played from the start, silent past its end.
    Noise(Arc<[f32]>),
}

/// One sounding event in the output graph.
#[derive(Clone, Debug)]
pub struct Note {
    /// Absolute start on the audio clock, seconds.
    pub start: f64,
    /// Seconds until the note is removed.
    pub length: f32,
    pub peak: f32,
    /// -1 (left) ..= 1 (right).
    pub pan: f32,
    pub envelope: Envelope,
    pub source: Source,
    pub filter: Option<FilterSweep>,
    phase: f32,
    mod_phase: f32,
    cursor: usize,
    svf: Svf,
}

impl Note {
    pub fn new(start: f64, length: f32, peak: f32, envelope: Envelope, source: Source) -> Self {
        Self {
            start,
            length,
            peak,
            pan: 0.0,
            envelope,
            source,
            filter: None,
            phase: 0.0,
            mod_phase: 0.0,
            cursor: 0,
            svf: Svf::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterSweep) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan.clamp(-1.0, 1.0);
        self
    }

    /// Absolute time after which the note is finished.
    pub fn end(&self) -> f64 {
        self.start + self.length as f64
    }

    /// Whether every parameter is finite and renderable.
    pub fn is_playable(&self) -> bool {
        let source_ok = match &self.source {
            Source::Osc { freq, fm, .. } => {
                freq.is_valid()
                    && freq.from > 0.0
                    && fm.map_or(true, |fm| fm.ratio.is_finite() && fm.index.is_finite())
            }
            Source::Noise(buf) => !buf.is_empty(),
        };
        source_ok
            && self.start.is_finite()
            && self.length.is_finite()
            && self.length > 0.0
            && self.peak.is_finite()
            && self.filter.map_or(true, |f| f.cutoff.is_valid() && f.q.is_finite())
    }

    /// Render one mono sample at `local` seconds after start.
    pub fn tick(&mut self, local: f32, sample_rate: f32) -> f32 {
        let raw = match &self.source {
            Source::Osc { wave, freq, fm } => {
                let base = freq.value(local);
                let mut f = base;
                if let Some(fm) = fm {
                    if local < fm.stop {
                        f += libm::sinf(self.mod_phase * TAU) * fm.index * base;
                        self.mod_phase = wrap(self.mod_phase + base * fm.ratio / sample_rate);
                    }
                }
                let s = wave.sample(self.phase);
                self.phase = wrap(self.phase + f / sample_rate);
                s
            }
            Source::Noise(buf) => {
                let s = buf.get(self.cursor).copied().unwrap_or(0.0);
                self.cursor += 1;
                s
            }
        };
        let shaped = match self.filter {
            Some(f) => self.svf.process(raw, f.kind, f.cutoff.value(local), f.q, sample_rate),
            None => raw,
        };
        shaped * self.envelope.level(local, self.peak)
    }
}

#[inline]
fn wrap(phase: f32) -> f32 {
    let p = phase - libm::floorf(phase);
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const ADSR: Envelope = Envelope::Adsr { attack: 0.1, decay: 0.2, sustain: 0.5, release: 0.4 };

    #[test]
    fn adsr_segments() {
        assert_eq!(ADSR.level(0.0, 1.0), 0.0);
        assert!((ADSR.level(0.05, 1.0) - 0.5).abs() < 1e-6);
        assert!((ADSR.level(0.1, 1.0) - 1.0).abs() < 1e-6);
        assert!((ADSR.level(0.3, 1.0) - 0.5).abs() < 1e-6);
        assert!((ADSR.level(0.5, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(ADSR.level(0.8, 1.0), 0.0);
        assert!((ADSR.duration() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn percussive_decays_monotonically() {
        let env = Envelope::Percussive { attack: 0.002, decay: 0.3 };
        let mut last = env.level(0.002, 1.0);
        for i in 1..30 {
            let v = env.level(0.002 + i as f32 * 0.01, 1.0);
            assert!(v < last);
            last = v;
        }
        assert_eq!(env.level(0.31, 1.0), 0.0);
    }

    #[test]
    fn exponential_ramp_hits_endpoints() {
        let r = Ramp::exponential(150.0, 45.0, 0.12);
        assert!((r.value(0.0) - 150.0).abs() < 1e-3);
        assert!((r.value(0.12) - 45.0).abs() < 1e-3);
        assert!(r.value(0.06) < 150.0 && r.value(0.06) > 45.0);
        assert_eq!(r.value(1.0), 45.0);
    }

    #[test]
    fn exponential_ramp_rejects_zero() {
        assert!(!Ramp::exponential(0.0, 10.0, 1.0).is_valid());
    }

    #[test]
    fn infinite_frequency_is_unplayable() {
        let note = Note::new(
            0.0,
            1.0,
            0.5,
            ADSR,
            Source::Osc { wave: Waveform::Sine, freq: Ramp::hold(f32::INFINITY), fm: None },
        );
        assert!(!note.is_playable());
    }

    #[test]
    fn sine_note_produces_signal() {
        let mut note = Note::new(
            0.0,
            1.0,
            0.8,
            ADSR,
            Source::Osc { wave: Waveform::Sine, freq: Ramp::hold(440.0), fm: None },
        );
        let energy: f32 = (0..4410).map(|i| note.tick(i as f32 / 44100.0, 44100.0).abs()).sum();
        assert!(energy > 1.0);
    }

    #[test]
    fn noise_source_goes_silent_past_buffer_end() {
        let buf: Arc<[f32]> = vec![1.0; 4].into();
        let env = Envelope::Percussive { attack: 0.0, decay: 1.0 };
        let mut note = Note::new(0.0, 1.0, 1.0, env, Source::Noise(buf));
        for i in 0..4 {
            assert!(note.tick(i as f32 * 1e-4, 44100.0) > 0.0);
        }
        assert_eq!(note.tick(5e-4, 44100.0), 0.0);
    }

    #[test]
    fn lowpass_attenuates_high_frequency() {
        let mut svf = Svf::default();
        let mut peak: f32 = 0.0;
        for i in 0..4410 {
            // Nyquist-rate square: +1, -1, ...
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = svf.process(x, FilterKind::Lowpass, 200.0, 0.707, 44100.0);
            if i > 100 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05);
    }
}
