//! The shared audio output graph: in-flight notes mixed into frames.

use heapless::Vec;
use tracing::{debug, trace};

use crate::frame::Frame;
use crate::voice::Note;

/// Maximum simultaneously sounding notes.
pub const MAX_NOTES: usize = 64;

/// Gain applied to the summed notes before soft clipping.
const MASTER_GAIN: f32 = 0.8;

/// Stereo mixer for every sounding note, driven by a sample-position clock.
///
/// `render` never allocates; notes are stored inline.
pub struct OutputGraph {
    sample_rate: u32,
    notes: Vec<Note, MAX_NOTES>,
    /// Frames rendered since creation.
    position: u64,
}

impl OutputGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            notes: Vec::new(),
            position: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Audio clock: seconds of audio rendered so far.
    pub fn now(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Add a note. Returns false if it was unplayable and dropped.
    ///
    /// A note starting before the render position begins at the render
    /// position instead. When the graph is full the oldest-starting note
    /// is stolen.
    pub fn play(&mut self, mut note: Note) -> bool {
        if !note.is_playable() {
            debug!(start = note.start, "suppressed non-finite note");
            return false;
        }
        let now = self.now();
        if note.start < now {
            note.start = now;
        }
        if self.notes.is_full() {
            if let Some(oldest) = self.oldest() {
                trace!(start = self.notes[oldest].start, "stealing note");
                self.notes.swap_remove(oldest);
            }
        }
        self.notes.push(note).is_ok()
    }

    fn oldest(&self) -> Option<usize> {
        self.notes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.start.total_cmp(&b.start))
            .map(|(i, _)| i)
    }

    /// Render the next `out.len()` frames and advance the clock.
    pub fn render(&mut self, out: &mut [Frame]) {
        let sr = self.sample_rate as f32;
        let rate = self.sample_rate as f64;
        for (i, frame) in out.iter_mut().enumerate() {
            let t = (self.position + i as u64) as f64 / rate;
            let (mut left, mut right) = (0.0f32, 0.0f32);
            for note in self.notes.iter_mut() {
                if t < note.start || t >= note.end() {
                    continue;
                }
                let s = note.tick((t - note.start) as f32, sr);
                left += s * (1.0 - note.pan.max(0.0));
                right += s * (1.0 + note.pan.min(0.0));
            }
            *frame = Frame::from_f32(
                libm::tanhf(left * MASTER_GAIN),
                libm::tanhf(right * MASTER_GAIN),
            );
        }
        self.position += out.len() as u64;
        let now = self.now();
        self.notes.retain(|n| n.end() > now);
    }

    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    /// Release every note.
    pub fn clear(&mut self) {
        self.notes.clear();
    }
}
