//! Control parameters derived each groove cycle.

/// Tempo range the groove accepts.
pub const BPM_RANGE: (f32, f32) = (60.0, 160.0);
/// Swing range after derivation (narrower than the directive bound).
pub const SWING_RANGE: (f32, f32) = (0.0, 0.2);
/// Harmonic root range (MIDI-like note numbers).
pub const ROOT_RANGE: (i32, i32) = (41, 57);

/// Derived groove controls. Replaced wholesale each cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlParams {
    pub bpm: f32,
    pub density: f32,
    pub swing: f32,
    pub fill_chance: f32,
    pub root: i32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            bpm: 96.0,
            density: 0.4,
            swing: 0.08,
            fill_chance: 0.12,
            root: 48,
        }
    }
}

impl ControlParams {
    /// Seconds per sixteenth-note step at the current tempo.
    pub fn step_duration(&self) -> f64 {
        60.0 / (self.bpm as f64 * 4.0)
    }

    /// Whether every field is inside its documented range.
    pub fn in_bounds(&self) -> bool {
        (BPM_RANGE.0..=BPM_RANGE.1).contains(&self.bpm)
            && (0.0..=1.0).contains(&self.density)
            && (SWING_RANGE.0..=SWING_RANGE.1).contains(&self.swing)
            && (0.0..=1.0).contains(&self.fill_chance)
            && (ROOT_RANGE.0..=ROOT_RANGE.1).contains(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_duration_is_a_sixteenth() {
        let p = ControlParams { bpm: 120.0, ..ControlParams::default() };
        assert!((p.step_duration() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn default_is_in_bounds() {
        assert!(ControlParams::default().in_bounds());
    }
}
