//! Percussive voices. Timbre-fixed; the note argument is ignored.

use alloc::sync::Arc;
use tp_ir::clamp01;

use super::noise::NoiseBank;
use super::recipe::{Envelope, FilterKind, FilterSweep, Note, Ramp, Source, Waveform};
use super::Instrument;
use crate::graph::OutputGraph;

/// Pitch-swept sine.
#[derive(Debug, Default)]
pub struct Kick;

impl Instrument for Kick {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, _note: Option<i32>) {
        let note = Note::new(
            time,
            0.34,
            clamp01(velocity),
            Envelope::Percussive { attack: 0.002, decay: 0.32 },
            Source::Osc {
                wave: Waveform::Sine,
                freq: Ramp::exponential(150.0, 45.0, 0.12),
                fm: None,
            },
        );
        graph.play(note);
    }
}

/// Band-passed noise burst over a short triangle body.
#[derive(Debug)]
pub struct Snare {
    noise: Arc<[f32]>,
}

impl Snare {
    pub fn new(bank: &NoiseBank) -> Self {
        Self { noise: bank.snare() }
    }
}

impl Instrument for Snare {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, _note: Option<i32>) {
        let v = clamp01(velocity);
        let crack = Note::new(
            time,
            0.2,
            v * 0.9,
            Envelope::Percussive { attack: 0.001, decay: 0.18 },
            Source::Noise(Arc::clone(&self.noise)),
        )
        .with_filter(FilterSweep::new(FilterKind::Bandpass, Ramp::hold(1800.0)).with_q(0.9));
        let body = Note::new(
            time,
            0.12,
            v * 0.35,
            Envelope::Percussive { attack: 0.001, decay: 0.1 },
            Source::Osc { wave: Waveform::Triangle, freq: Ramp::hold(185.0), fm: None },
        );
        if graph.play(crack) {
            graph.play(body);
        }
    }
}

/// High-passed noise tick, panned slightly right.
#[derive(Debug)]
pub struct Hat {
    noise: Arc<[f32]>,
}

impl Hat {
    pub fn new(bank: &NoiseBank) -> Self {
        Self { noise: bank.hat() }
    }
}

impl Instrument for Hat {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, _note: Option<i32>) {
        let note = Note::new(
            time,
            0.06,
            clamp01(velocity) * 0.6,
            Envelope::Percussive { attack: 0.001, decay: 0.05 },
            Source::Noise(Arc::clone(&self.noise)),
        )
        .with_filter(FilterSweep::new(FilterKind::Highpass, Ramp::hold(7000.0)))
        .with_pan(0.2);
        graph.play(note);
    }
}
