//! Interaction feeds consumed by the live mapper.

use serde::{Deserialize, Serialize};

/// Windowed average of interaction-derived signals.
///
/// Every field is nominally 0..=1; focus is screen space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionSnapshot {
    pub energy: f32,
    pub chaos: f32,
    pub density: f32,
    pub focus_x: f32,
    pub focus_y: f32,
    pub rhythm_intent: f32,
}

impl Default for InteractionSnapshot {
    /// Idle input: no activity, focus centred.
    fn default() -> Self {
        Self {
            energy: 0.0,
            chaos: 0.0,
            density: 0.0,
            focus_x: 0.5,
            focus_y: 0.5,
            rhythm_intent: 0.0,
        }
    }
}

impl InteractionSnapshot {
    /// Copy with every field forced into 0..=1 (NaN becomes 0).
    pub fn clamped(&self) -> Self {
        Self {
            energy: clamp01(self.energy),
            chaos: clamp01(self.chaos),
            density: clamp01(self.density),
            focus_x: clamp01(self.focus_x),
            focus_y: clamp01(self.focus_y),
            rhythm_intent: clamp01(self.rhythm_intent),
        }
    }
}

/// Clamp to 0..=1, mapping NaN to 0.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// A raw interaction event, handled off the quantized grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionEvent {
    PointerDown { speed: f32 },
    PointerUp,
    PointerMove { x: f32, y: f32 },
    KeyPress { key: char },
}
