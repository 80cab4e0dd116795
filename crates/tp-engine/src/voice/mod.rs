//! The voice bank: six synthesis units, one per instrument role.

mod drums;
mod melodic;
mod noise;
mod recipe;

use alloc::boxed::Box;
use alloc::vec::Vec;
use tp_ir::{Role, VoiceMode};

use crate::graph::OutputGraph;
use crate::scheduler::Scheduler;

pub use drums::{Hat, Kick, Snare};
pub use melodic::{Bass, Lead, Texture};
pub use noise::NoiseBank;
pub use recipe::{
    Curve, Envelope, FilterKind, FilterSweep, Fm, Note, Ramp, Source, Waveform,
};

/// A synthesis unit that renders one note-like event at an exact time.
///
/// Implementations clamp `velocity` to 0..=1 and pick a default pitch when
/// `note` is `None`. A trigger that would produce a non-finite note is
/// dropped by the graph, never propagated.
pub trait Instrument: Send {
    fn trigger(&mut self, graph: &mut OutputGraph, time: f64, velocity: f32, note: Option<i32>);

    /// Select the recipe for subsequent triggers. Modes for other roles are
    /// ignored.
    fn set_mode(&mut self, _mode: VoiceMode) {}
}

/// The standard six-voice kit, ready to register with a scheduler.
pub struct VoiceBank {
    voices: Vec<(Role, Box<dyn Instrument>)>,
}

impl VoiceBank {
    pub fn standard(sample_rate: u32, seed: u64) -> Self {
        let noise = NoiseBank::new(sample_rate as f32, seed);
        let voices: Vec<(Role, Box<dyn Instrument>)> = Role::ALL
            .iter()
            .map(|&role| {
                let voice: Box<dyn Instrument> = match role {
                    Role::Kick => Box::new(Kick),
                    Role::Snare => Box::new(Snare::new(&noise)),
                    Role::Hat => Box::new(Hat::new(&noise)),
                    Role::Lead => Box::new(Lead::default()),
                    Role::Bass => Box::new(Bass::default()),
                    Role::Texture => Box::new(Texture::new(&noise)),
                };
                (role, voice)
            })
            .collect();
        Self { voices }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Register every voice under its role name.
    pub fn register_all(self, scheduler: &mut Scheduler) {
        for (role, voice) in self.voices {
            scheduler.register_instrument(role.instrument(), voice);
        }
    }
}
