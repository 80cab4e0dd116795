//! Session configuration, loaded from TOML.
//!
//! ```toml
//! [engine]
//! sample_rate = 48000
//! seed = 7
//!
//! [directive]
//! interval_s = 4.0
//!
//! [[cues]]
//! at = 2.0
//! action = { type = "pointer_down", speed = 0.6 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tp_engine::RigConfig;
use tp_ir::{Directive, InteractionSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad config syntax: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    pub directive: DirectiveConfig,
    pub cues: Vec<Cue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub lookahead_ms: f64,
    pub groove_interval_ms: f64,
    pub fill_interval_ms: f64,
    pub groove_window_ms: f64,
    pub queue_capacity: usize,
    pub seed: u64,
    /// Frames rendered per loop iteration.
    pub block_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            lookahead_ms: 25.0,
            groove_interval_ms: 45.0,
            fill_interval_ms: 35.0,
            groove_window_ms: 250.0,
            queue_capacity: 256,
            seed: RigConfig::default().seed,
            block_frames: 256,
        }
    }
}

/// Which local conductor proposes directives each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductorKind {
    #[default]
    Rules,
    /// Only cued or externally submitted directives.
    Off,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
    /// Seconds between directive cycles.
    pub interval_s: f64,
    /// Blend amount before interaction boosts.
    pub base_lerp: f32,
    pub conductor: ConductorKind,
    /// Starting directive; the built-in default when absent.
    pub initial: Option<Directive>,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            interval_s: 6.0,
            base_lerp: 0.08,
            conductor: ConductorKind::Rules,
            initial: None,
        }
    }
}

/// A scripted input at a point in session time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Seconds from session start.
    pub at: f64,
    pub action: CueAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CueAction {
    Snapshot(InteractionSnapshot),
    PointerDown { speed: f32 },
    KeyPress { key: char },
    Directive { value: DirectivePayload },
}

/// A cued directive: a table, or the raw JSON an advisory source would send.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectivePayload {
    Inline(Directive),
    Json(String),
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.engine;
        let positive = [
            ("engine.lookahead_ms", e.lookahead_ms),
            ("engine.groove_interval_ms", e.groove_interval_ms),
            ("engine.fill_interval_ms", e.fill_interval_ms),
            ("engine.groove_window_ms", e.groove_window_ms),
            ("directive.interval_s", self.directive.interval_s),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")));
            }
        }
        if e.sample_rate == 0 {
            return Err(ConfigError::Invalid("engine.sample_rate must be > 0".into()));
        }
        if e.queue_capacity == 0 {
            return Err(ConfigError::Invalid("engine.queue_capacity must be > 0".into()));
        }
        if e.block_frames == 0 {
            return Err(ConfigError::Invalid("engine.block_frames must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.directive.base_lerp) {
            return Err(ConfigError::Invalid(format!(
                "directive.base_lerp must be in [0, 1], got {}",
                self.directive.base_lerp
            )));
        }
        if let Some(initial) = &self.directive.initial {
            initial
                .validate()
                .map_err(|err| ConfigError::Invalid(format!("directive.initial: {err}")))?;
        }
        if let Some(cue) = self.cues.iter().find(|c| !(c.at.is_finite() && c.at >= 0.0)) {
            return Err(ConfigError::Invalid(format!("cue time {} must be >= 0", cue.at)));
        }
        Ok(())
    }

    /// Engine settings in the rig's units.
    pub fn rig_config(&self) -> RigConfig {
        let e = &self.engine;
        RigConfig {
            sample_rate: e.sample_rate,
            lookahead_ms: e.lookahead_ms,
            groove_interval: e.groove_interval_ms / 1000.0,
            fill_interval: e.fill_interval_ms / 1000.0,
            groove_window: e.groove_window_ms / 1000.0,
            queue_capacity: e.queue_capacity,
            seed: e.seed,
        }
    }
}
