//! Default-device output through cpal.
//!
//! The render loop pushes i16 frames into a ring buffer; the device
//! callback pops one frame per output slot and converts it to f32.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tp_engine::Frame;
use tracing::{debug, error, info, warn};

use crate::traits::{AudioError, AudioOutput};

/// The ring holds one tenth of a second of frames.
const BUFFER_DIVISOR: usize = 10;
const POLL: Duration = Duration::from_millis(1);

pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device as a stereo stream at its default
    /// rate. The returned consumer goes to [`CpalOutput::build_stream`].
    pub fn new() -> Result<(Self, HeapCons<Frame>), AudioError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = supported.into();
        config.channels = 2;

        let capacity = (config.sample_rate.0 as usize / BUFFER_DIVISOR).max(1);
        let (producer, consumer) = HeapRb::<Frame>::new(capacity).split();

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            buffer_frames = capacity,
            "opened audio device"
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
        };
        Ok((output, consumer))
    }

    /// Create the device stream reading from `consumer` and start it.
    pub fn build_stream(&mut self, mut consumer: HeapCons<Frame>) -> Result<(), AudioError> {
        let running = Arc::clone(&self.running);
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if running.load(Ordering::Relaxed) {
                        fill_interleaved(data, channels, &mut consumer);
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        debug!(channels, "audio stream running");
        Ok(())
    }

    fn buffer_duration(&self) -> Duration {
        let frames = self.producer.capacity().get() as f64;
        Duration::from_secs_f64(frames / self.config.sample_rate.0.max(1) as f64)
    }
}

/// Left and right into the first two slots of each device frame; any
/// further channels stay silent. An empty ring plays silence.
fn fill_interleaved(data: &mut [f32], channels: usize, consumer: &mut HeapCons<Frame>) {
    for slot in data.chunks_mut(channels) {
        let frame = consumer.try_pop().unwrap_or_default();
        let (left, right) = (frame.left as f32 / 32768.0, frame.right as f32 / 32768.0);
        for (ch, sample) in slot.iter_mut().enumerate() {
            *sample = match ch {
                0 => left,
                1 => right,
                _ => 0.0,
            };
        }
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) {
        for &frame in frames {
            while self.producer.try_push(frame).is_err() {
                if !self.running.load(Ordering::Relaxed) {
                    return;
                }
                std::thread::sleep(POLL);
            }
        }
    }

    fn drain(&mut self) {
        // A stalled device must not hang shutdown.
        let deadline = Instant::now() + self.buffer_duration() * 2;
        while self.running.load(Ordering::Relaxed) && !self.producer.is_empty() {
            if Instant::now() >= deadline {
                warn!(left = self.producer.occupied_len(), "gave up draining audio buffer");
                return;
            }
            std::thread::sleep(POLL);
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
