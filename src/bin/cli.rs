//! tidepool CLI: headless playback, offline WAV render and directive
//! checking.
//!
//! ```bash
//! tp-cli render --seconds 30 --out groove.wav
//! tp-cli render --config session.toml --directives plan.jsonl --out plan.wav
//! tp-cli play --seconds 60
//! tp-cli check-directive directive.json
//! ```

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tp_master::{Controller, DirectiveChannel, ScriptedConductor, SessionConfig};

#[derive(Parser)]
#[command(name = "tp-cli")]
#[command(about = "Interactive generative groove engine")]
#[command(version)]
struct Cli {
    /// Session config (TOML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a session offline to a WAV file
    Render {
        /// Length of the render in seconds
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,

        /// Output WAV path
        #[arg(long)]
        out: PathBuf,

        /// JSON directives, one per line, replayed once per directive cycle
        #[arg(long)]
        directives: Option<PathBuf>,
    },

    /// Play a session on the default audio device
    Play {
        /// Stop after this many seconds; plays until interrupted otherwise
        #[arg(long)]
        seconds: Option<f64>,

        /// Read JSON directives from stdin, one per line
        #[arg(long)]
        stdin: bool,
    },

    /// Validate a JSON directive without playing it
    CheckDirective {
        /// Directive file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { seconds, out, directives } => {
            let controller = controller(cli.config)?;
            render(&controller, seconds, &out, directives)
        }
        Commands::Play { seconds, stdin } => {
            let mut controller = controller(cli.config)?;
            play(&mut controller, seconds, stdin)
        }
        Commands::CheckDirective { path } => check_directive(&path),
    }
}

fn controller(path: Option<PathBuf>) -> Result<Controller> {
    let config = SessionConfig::load_or_default(path.as_deref())
        .context("failed to load session config")?;
    Ok(Controller::new(config))
}

fn render(controller: &Controller, seconds: f64, out: &Path, directives: Option<PathBuf>) -> Result<()> {
    let frames = match directives {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let script = ScriptedConductor::from_json_lines(&text);
            println!("Replaying {} directives", script.remaining());
            controller.render_frames_with(seconds, Box::new(script))
        }
        None => controller.render_frames(seconds),
    };
    controller
        .write_wav_file(out, &frames)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Rendered {:.1}s ({} frames at {} Hz) to {}",
        seconds,
        frames.len(),
        controller.config().engine.sample_rate,
        out.display()
    );
    Ok(())
}

fn play(controller: &mut Controller, seconds: Option<f64>, stdin: bool) -> Result<()> {
    controller.play(seconds).context("failed to open audio output")?;
    println!("Playing...");

    if stdin {
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            let line = line.trim();
            if !line.is_empty() && !controller.submit_directive(line) {
                break;
            }
            if controller.is_finished() {
                break;
            }
        }
    }

    while controller.is_playing() {
        if let Some(elapsed) = controller.elapsed() {
            print!("\r{elapsed:6.1}s");
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    controller.stop();
    println!("\rDone.          ");
    Ok(())
}

fn check_directive(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut channel = DirectiveChannel::default();
    channel
        .submit_json(&text)
        .with_context(|| format!("{} is not a usable directive", path.display()))?;
    let d = channel.target();
    println!(
        "ok: {} bpm, {:?} {:?}, density {:.2}, swing {:.2}",
        d.bpm, d.scale, d.mood, d.density, d.swing
    );
    Ok(())
}
