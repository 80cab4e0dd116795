//! Audio output trait and error types.

use tp_engine::Frame;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Write frames to the output, waiting for room while playing.
    /// Frames written while stopped are discarded.
    fn write(&mut self, frames: &[Frame]);

    /// Wait until everything written so far has been played. Outputs
    /// without a device buffer return at once.
    fn drain(&mut self) {}

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_backend_message() {
        let err = AudioError::StreamCreate("unsupported format".into());
        assert_eq!(err.to_string(), "stream create error: unsupported format");
        assert_eq!(AudioError::NoDevice.to_string(), "no audio device available");
    }
}
