//! Mode-polymorphic melodic voices.
//!
//! Each voice stores its mode as plain data and reads it when building a
//! note, so a mode change only affects the next trigger.

use alloc::sync::Arc;
use tp_ir::{clamp01, BassMode, LeadMode, TextureMode, VoiceMode};

use super::noise::NoiseBank;
use super::recipe::{Envelope, FilterKind, FilterSweep, Fm, Note, Ramp, Source, Waveform};
use super::Instrument;
use crate::graph::OutputGraph;
use crate::harmony::midi_to_freq;

#[derive(Debug, Default)]
pub struct Lead {
    mode: LeadMode,
}

impl Lead {
    pub const DEFAULT_NOTE: i32 = 64;
    const LENGTH: f32 = 1.2;

    pub fn mode(&self) -> LeadMode {
        self.mode
    }

    fn build(&self, time: f64, velocity: f32, note: i32) -> Note {
        let freq = midi_to_freq(note);
        let (wave, cutoff, envelope) = match self.mode {
            LeadMode::Pluck => (
                Waveform::Saw,
                Ramp::exponential(3200.0, 800.0, 0.25),
                Envelope::Adsr { attack: 0.01, decay: 0.12, sustain: 0.2, release: 0.4 },
            ),
            LeadMode::Triangle => (
                Waveform::Triangle,
                Ramp::linear(1800.0, 900.0, 0.35),
                Envelope::Adsr { attack: 0.01, decay: 0.16, sustain: 0.35, release: 0.5 },
            ),
            LeadMode::Sine | LeadMode::Fm => (
                Waveform::Sine,
                Ramp::linear(2400.0, 1400.0, 0.4),
                Envelope::Adsr { attack: 0.015, decay: 0.2, sustain: 0.25, release: 0.55 },
            ),
        };
        let fm = match self.mode {
            LeadMode::Fm => Some(Fm { ratio: 2.0, index: 0.4, stop: 0.8 }),
            _ => None,
        };
        Note::new(
            time,
            Self::LENGTH,
            clamp01(velocity),
            envelope,
            Source::Osc { wave, freq: Ramp::hold(freq), fm },
        )
        .with_filter(FilterSweep::new(FilterKind::Lowpass, cutoff))
    }
}

impl Instrument for Lead {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, note: Option<i32>) {
        graph.play(self.build(time, velocity, note.unwrap_or(Self::DEFAULT_NOTE)));
    }

    fn set_mode(&mut self, mode: VoiceMode) {
        if let VoiceMode::Lead(mode) = mode {
            self.mode = mode;
        }
    }
}

#[derive(Debug, Default)]
pub struct Bass {
    mode: BassMode,
}

impl Bass {
    pub const DEFAULT_NOTE: i32 = 36;
    const LENGTH: f32 = 1.0;

    pub fn mode(&self) -> BassMode {
        self.mode
    }

    fn build(&self, time: f64, velocity: f32, note: i32) -> Note {
        let (wave, fm) = match self.mode {
            BassMode::Sub => (Waveform::Sine, None),
            BassMode::Square => (Waveform::Square, None),
            BassMode::Fm => (Waveform::Saw, Some(Fm { ratio: 1.5, index: 0.25, stop: 0.9 })),
        };
        Note::new(
            time,
            Self::LENGTH,
            clamp01(velocity * 0.8),
            Envelope::Adsr { attack: 0.01, decay: 0.08, sustain: 0.5, release: 0.65 },
            Source::Osc { wave, freq: Ramp::hold(midi_to_freq(note)), fm },
        )
        .with_filter(FilterSweep::new(
            FilterKind::Lowpass,
            Ramp::exponential(220.0, 90.0, 0.55),
        ))
    }
}

impl Instrument for Bass {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, note: Option<i32>) {
        graph.play(self.build(time, velocity, note.unwrap_or(Self::DEFAULT_NOTE)));
    }

    fn set_mode(&mut self, mode: VoiceMode) {
        if let VoiceMode::Bass(mode) = mode {
            self.mode = mode;
        }
    }
}

/// Unpitched bed: a slow gliding tone or a filtered noise wash.
#[derive(Debug)]
pub struct Texture {
    mode: TextureMode,
    noise: Arc<[f32]>,
}

impl Texture {
    pub fn new(bank: &NoiseBank) -> Self {
        Self { mode: TextureMode::default(), noise: bank.texture() }
    }

    pub fn mode(&self) -> TextureMode {
        self.mode
    }

    fn build(&self, time: f64, velocity: f32) -> Note {
        match self.mode {
            TextureMode::Noise => Note::new(
                time,
                0.6,
                clamp01(velocity * 0.6),
                Envelope::Adsr { attack: 0.01, decay: 0.18, sustain: 0.2, release: 0.4 },
                Source::Noise(Arc::clone(&self.noise)),
            )
            .with_filter(FilterSweep::new(FilterKind::Highpass, Ramp::hold(400.0))),
            TextureMode::Pad | TextureMode::Grain => {
                let (wave, freq) = if self.mode == TextureMode::Grain {
                    (Waveform::Triangle, Ramp::exponential(220.0, 160.0, 1.4))
                } else {
                    (Waveform::Sine, Ramp::linear(220.0, 180.0, 1.4))
                };
                Note::new(
                    time,
                    2.0,
                    clamp01(velocity * 0.4),
                    Envelope::Adsr { attack: 0.15, decay: 0.4, sustain: 0.45, release: 1.2 },
                    Source::Osc { wave, freq, fm: None },
                )
            }
        }
    }
}

impl Instrument for Texture {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, _note: Option<i32>) {
        graph.play(self.build(time, velocity));
    }

    fn set_mode(&mut self, mode: VoiceMode) {
        if let VoiceMode::Texture(mode) = mode {
            self.mode = mode;
        }
    }
}
