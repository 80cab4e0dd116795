//! The directive channel: validated intake plus gradual blending.
//!
//! Advisory output is untrusted. Anything that fails to parse or falls
//! outside the documented bounds is discarded and the previous target is
//! retained; the caller gets the error for diagnostics only.

use tp_ir::{clamp01, Directive, DirectiveError, InteractionSnapshot};
use tracing::{debug, warn};

/// Upper bound on one blend step.
pub const MAX_BLEND: f32 = 0.45;

/// Accumulated progress at which discrete fields switch to the target.
const DISCRETE_SWITCH: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct DirectiveChannel {
    current: Directive,
    target: Directive,
    previous: Directive,
    /// How far `current` has travelled toward `target` (0..=1).
    progress: f32,
    base_lerp: f32,
}

impl DirectiveChannel {
    pub fn new(initial: Directive, base_lerp: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            previous: initial,
            progress: 1.0,
            base_lerp,
        }
    }

    /// Accept `candidate` as the new target if it validates.
    pub fn submit(&mut self, candidate: Directive) -> Result<(), DirectiveError> {
        if let Err(err) = candidate.validate() {
            warn!(%err, "rejected directive, keeping previous target");
            return Err(err);
        }
        self.previous = self.target;
        self.target = candidate;
        self.progress = 0.0;
        debug!(bpm = candidate.bpm, scale = ?candidate.scale, mood = ?candidate.mood, "directive target set");
        Ok(())
    }

    /// Parse a JSON directive and submit it.
    pub fn submit_json(&mut self, text: &str) -> Result<(), DirectiveError> {
        let candidate: Directive = match serde_json::from_str(text) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "unparseable directive, keeping previous target");
                return Err(DirectiveError::Parse(err.to_string()));
            }
        };
        self.submit(candidate)
    }

    /// Step `current` toward the target and return it.
    ///
    /// More animated interaction blends faster. Numeric fields move every
    /// step; scale, mood and instrument modes switch together once the
    /// accumulated progress passes one half.
    pub fn blend(&mut self, snapshot: &InteractionSnapshot) -> Directive {
        let amount = adaptive_amount(self.base_lerp, snapshot);
        self.progress += (1.0 - self.progress) * amount;
        let adopt = self.progress >= DISCRETE_SWITCH;
        self.current = self.current.blend(&self.target, amount, adopt);
        self.current
    }

    pub fn current(&self) -> &Directive {
        &self.current
    }

    pub fn target(&self) -> &Directive {
        &self.target
    }

    pub fn previous(&self) -> &Directive {
        &self.previous
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }
}

impl Default for DirectiveChannel {
    fn default() -> Self {
        Self::new(Directive::default(), 0.08)
    }
}

/// `base + 0.25·energy + 0.15·rhythmIntent + 0.15·chaos`, capped at
/// [`MAX_BLEND`].
pub fn adaptive_amount(base: f32, snapshot: &InteractionSnapshot) -> f32 {
    let s = snapshot.clamped();
    let amount = base + 0.25 * s.energy + 0.15 * s.rhythm_intent + 0.15 * s.chaos;
    if amount.is_finite() {
        amount.clamp(0.0, MAX_BLEND)
    } else {
        clamp01(base).min(MAX_BLEND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_ir::{LeadMode, Mood, Scale};

    fn brighter() -> Directive {
        let mut d = Directive {
            bpm: 140.0,
            scale: Scale::Lydian,
            mood: Mood::Driving,
            density: 0.9,
            ..Directive::default()
        };
        d.instruments.lead = LeadMode::Pluck;
        d
    }

    #[test]
    fn amount_is_capped() {
        let hot = InteractionSnapshot {
            energy: 1.0,
            chaos: 1.0,
            rhythm_intent: 1.0,
            ..Default::default()
        };
        assert_eq!(adaptive_amount(0.08, &hot), MAX_BLEND);
        assert!((adaptive_amount(0.08, &InteractionSnapshot::default()) - 0.08).abs() < 1e-6);
        assert_eq!(adaptive_amount(f32::NAN, &InteractionSnapshot::default()), 0.0);
    }

    #[test]
    fn rejected_directive_keeps_everything() {
        let mut ch = DirectiveChannel::default();
        let before = ch.clone();
        let bad = Directive { bpm: 500.0, ..Directive::default() };
        assert!(ch.submit(bad).is_err());
        assert_eq!(ch.target(), before.target());
        assert_eq!(ch.current(), before.current());
        assert_eq!(ch.progress(), before.progress());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut ch = DirectiveChannel::default();
        let err = ch.submit_json("{\"bpm\": ").unwrap_err();
        assert!(matches!(err, DirectiveError::Parse(_)));
        let err = ch.submit_json("{\"bpm\": 96}").unwrap_err();
        assert!(matches!(err, DirectiveError::Parse(_)));
        assert_eq!(*ch.target(), Directive::default());
    }

    #[test]
    fn accepted_directive_shifts_history() {
        let mut ch = DirectiveChannel::default();
        ch.submit(brighter()).unwrap();
        let second = Directive { bpm: 70.0, ..Directive::default() };
        ch.submit(second).unwrap();
        assert_eq!(*ch.previous(), brighter());
        assert_eq!(*ch.target(), second);
        assert_eq!(*ch.current(), Directive::default());
    }

    #[test]
    fn numbers_glide_and_discrete_fields_switch_at_half() {
        let mut ch = DirectiveChannel::new(Directive::default(), 0.2);
        ch.submit(brighter()).unwrap();
        let idle = InteractionSnapshot::default();

        let first = ch.blend(&idle);
        assert!((first.bpm - (96.0 + 44.0 * 0.2)).abs() < 1e-3);
        assert_eq!(first.scale, Scale::Pentatonic);

        // progress: 0.2, 0.36, 0.488, 0.5904
        ch.blend(&idle);
        let third = ch.blend(&idle);
        assert_eq!(third.mood, Mood::Playful);
        let fourth = ch.blend(&idle);
        assert_eq!(fourth.scale, Scale::Lydian);
        assert_eq!(fourth.mood, Mood::Driving);
        assert_eq!(fourth.instruments.lead, LeadMode::Pluck);
        assert!(fourth.bpm < 140.0);
        assert!(fourth.validate().is_ok());
    }

    #[test]
    fn blending_without_new_target_is_stable() {
        let mut ch = DirectiveChannel::default();
        let d = ch.blend(&InteractionSnapshot::default());
        assert_eq!(d, Directive::default());
    }
}
