use tp_engine::Frame;

use crate::traits::{AudioError, AudioOutput};

/// In-memory output that records every frame written while started.
///
/// Stands in for a device when running the playback loop headless.
#[derive(Debug, Default)]
pub struct BufferOutput {
    sample_rate: u32,
    frames: Vec<Frame>,
    running: bool,
}

impl BufferOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames: Vec::new(),
            running: false,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl AudioOutput for BufferOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, frames: &[Frame]) {
        if self.running {
            self.frames.extend_from_slice(frames);
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }
}
