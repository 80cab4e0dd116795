//! Headless controller for tidepool sessions.
//!
//! Owns the session configuration and runs either real-time playback on a
//! background thread or offline renders, so the CLI and tests share one
//! API.

mod conductor;
mod config;
mod directive;
mod session;
mod wav;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tp_audio::{AudioError, AudioOutput, CpalOutput};
use tracing::{error, info, warn};

pub use conductor::{Conductor, RuleConductor, ScriptedConductor, SilentConductor};
pub use config::{
    ConductorKind, ConfigError, Cue, CueAction, DirectiveConfig, DirectivePayload, EngineConfig,
    SessionConfig,
};
pub use directive::{adaptive_amount, DirectiveChannel, MAX_BLEND};
pub use session::{Command, Session};
pub use tp_engine::Frame;
pub use tp_ir::{Directive, DirectiveError, InteractionEvent, InteractionSnapshot};
pub use wav::{frames_to_wav, write_wav};

#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("playback thread exited before the stream opened")]
    PlaybackThread,
}

/// Headless session controller: owns the configuration and manages
/// playback.
pub struct Controller {
    config: SessionConfig,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    commands: Sender<Command>,
    stop_signal: Arc<AtomicBool>,
    frames_played: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, playback: None }
    }

    pub fn from_path(path: &Path) -> Result<Self, MasterError> {
        Ok(Self::new(SessionConfig::load(path)?))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- Real-time playback ---

    /// Open the default device and play until stopped, or for `seconds`.
    ///
    /// Returns once the stream is running; device errors are reported here.
    pub fn play(&mut self, seconds: Option<f64>) -> Result<(), MasterError> {
        self.stop();

        let config = self.config.clone();
        let (commands, inbox) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let frames_played = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stop = stop_signal.clone();
        let played = frames_played.clone();
        let done = finished.clone();

        let thread = std::thread::spawn(move || {
            audio_thread(config, seconds, inbox, ready_tx, stop, played, done);
        });

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err.into());
            }
            Err(_) => {
                let _ = thread.join();
                return Err(MasterError::PlaybackThread);
            }
        };

        self.playback = Some(PlaybackHandle {
            commands,
            stop_signal,
            frames_played,
            finished,
            sample_rate,
            thread: Some(thread),
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            let _ = pb.commands.send(Command::Stop);
            if let Some(handle) = pb.thread.take() {
                if handle.join().is_err() {
                    error!("playback thread panicked");
                }
            }
        }
    }

    /// Deliver a command to the playing session. False when nothing plays.
    pub fn send(&self, command: Command) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|pb| pb.commands.send(command).is_ok())
    }

    pub fn update_snapshot(&self, snapshot: InteractionSnapshot) -> bool {
        self.send(Command::Snapshot(snapshot))
    }

    pub fn push_event(&self, event: InteractionEvent) -> bool {
        self.send(Command::Event(event))
    }

    pub fn submit_directive(&self, json: impl Into<String>) -> bool {
        self.send(Command::Directive(json.into()))
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Seconds of audio handed to the device so far.
    pub fn elapsed(&self) -> Option<f64> {
        let pb = self.playback.as_ref()?;
        Some(pb.frames_played.load(Ordering::Relaxed) as f64 / pb.sample_rate as f64)
    }

    // --- Offline rendering ---

    pub fn render_frames(&self, seconds: f64) -> Vec<Frame> {
        self.render_session(Session::new(&self.config), seconds)
    }

    /// Offline render with a conductor other than the configured one.
    pub fn render_frames_with(&self, seconds: f64, conductor: Box<dyn Conductor>) -> Vec<Frame> {
        self.render_session(Session::new(&self.config).with_conductor(conductor), seconds)
    }

    pub fn render_to_wav(&self, seconds: f64) -> Result<Vec<u8>, MasterError> {
        let frames = self.render_frames(seconds);
        Ok(frames_to_wav(&frames, self.config.engine.sample_rate)?)
    }

    pub fn write_wav_file(&self, path: &Path, frames: &[Frame]) -> Result<(), MasterError> {
        let file = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(file);
        write_wav(&mut w, frames, self.config.engine.sample_rate)?;
        info!(path = %path.display(), frames = frames.len(), "wrote wav");
        Ok(())
    }

    fn render_session(&self, mut session: Session, seconds: f64) -> Vec<Frame> {
        session.start();
        let frames = session.render_seconds(seconds);
        session.dispose();
        frames
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(
    mut config: SessionConfig,
    seconds: Option<f64>,
    inbox: Receiver<Command>,
    ready: Sender<Result<u32, AudioError>>,
    stop_signal: Arc<AtomicBool>,
    frames_played: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
) {
    let opened = CpalOutput::new().and_then(|(mut output, consumer)| {
        output.build_stream(consumer)?;
        Ok(output)
    });
    let mut output = match opened {
        Ok(output) => output,
        Err(err) => {
            finished.store(true, Ordering::Relaxed);
            let _ = ready.send(Err(err));
            return;
        }
    };

    // The device decides the rate; the rig follows it.
    config.engine.sample_rate = output.sample_rate();
    let _ = ready.send(Ok(config.engine.sample_rate));

    let mut session = Session::new(&config);
    let limit = seconds.map(|s| (s.max(0.0) * config.engine.sample_rate as f64) as u64);
    let playback = Playback {
        inbox: &inbox,
        stop_signal: &stop_signal,
        frames_played: &frames_played,
        limit,
    };
    if let Err(err) = run_playback(&mut session, &mut output, playback) {
        error!(%err, "playback failed");
    }
    finished.store(true, Ordering::Relaxed);
}

/// Shared state one playback loop reads and reports through.
pub struct Playback<'a> {
    pub inbox: &'a Receiver<Command>,
    pub stop_signal: &'a AtomicBool,
    pub frames_played: &'a AtomicU64,
    /// Stop after this many frames.
    pub limit: Option<u64>,
}

/// Drive `session` into `output` block by block until stopped.
///
/// Commands are drained between blocks, so inputs land with at most one
/// block of latency.
pub fn run_playback<O: AudioOutput>(
    session: &mut Session,
    output: &mut O,
    playback: Playback<'_>,
) -> Result<(), AudioError> {
    output.start()?;
    session.start();
    info!(sample_rate = output.sample_rate(), "playback started");

    let mut block = vec![Frame::silence(); session.block_frames()];
    let mut played = 0u64;
    'play: while !playback.stop_signal.load(Ordering::Relaxed) {
        while let Ok(command) = playback.inbox.try_recv() {
            if !session.apply(command) {
                break 'play;
            }
        }
        let len = match playback.limit {
            Some(limit) if played >= limit => break,
            Some(limit) => block.len().min((limit - played) as usize),
            None => block.len(),
        };
        session.render_block(&mut block[..len]);
        output.write(&block[..len]);
        played += len as u64;
        playback.frames_played.store(played, Ordering::Relaxed);
    }

    session.stop();
    session.dispose();
    output.drain();
    if let Err(err) = output.stop() {
        warn!(%err, "cannot stop output");
    }
    info!(frames = played, "playback stopped");
    Ok(())
}
