//! Control-parameter derivation: slow directive blended with fast snapshot.

use tp_ir::{clamp01, ControlParams, Directive, InteractionSnapshot, BPM_RANGE, ROOT_RANGE, SWING_RANGE};

/// `a*(1-w) + b*w` with `w` clamped to 0..=1.
#[inline]
pub fn blend(a: f32, b: f32, w: f32) -> f32 {
    let w = clamp01(w);
    a * (1.0 - w) + b * w
}

/// Round half toward positive infinity.
#[inline]
pub(crate) fn round_half_up(x: f32) -> f32 {
    libm::floorf(x + 0.5)
}

fn bounded(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Derive the groove's control parameters for one cycle.
///
/// Every output stays inside its documented range whatever the inputs;
/// non-finite intermediates fall back to the defaults.
pub fn derive_params(snapshot: &InteractionSnapshot, directive: &Directive) -> ControlParams {
    let s = snapshot.clamped();
    let adj = &directive.mapping_adjustments;
    let fallback = ControlParams::default();

    let bpm = blend(directive.bpm, 78.0 + 70.0 * s.energy, 0.35);
    let density = blend(directive.density, s.density, 0.5);
    let swing = blend(directive.swing, s.chaos * 0.12, 0.4);
    let fill_chance = 0.05 + 0.35 * adj.chaos_influence + 0.15 * s.chaos;

    let base_root = 44.0 + round_half_up((1.0 - s.focus_y) * 10.0);
    let spread = round_half_up((s.focus_x - 0.5) * 6.0 * clamp01(adj.pitch_influence));
    let root = bounded(
        base_root + spread,
        ROOT_RANGE.0 as f32,
        ROOT_RANGE.1 as f32,
        fallback.root as f32,
    );

    ControlParams {
        bpm: bounded(bpm, BPM_RANGE.0, BPM_RANGE.1, fallback.bpm),
        density: bounded(density, 0.0, 1.0, fallback.density),
        swing: bounded(swing, SWING_RANGE.0, SWING_RANGE.1, fallback.swing),
        fill_chance: bounded(fill_chance, 0.0, 1.0, fallback.fill_chance),
        root: root as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(2.0, 8.0, 0.0), 2.0);
        assert_eq!(blend(2.0, 8.0, 1.0), 8.0);
        assert_eq!(blend(2.0, 8.0, 0.5), 5.0);
        assert_eq!(blend(2.0, 8.0, 3.0), 8.0);
    }

    #[test]
    fn idle_snapshot_with_default_directive() {
        let p = derive_params(&InteractionSnapshot::default(), &Directive::default());
        // 96*0.65 + 78*0.35
        assert!((p.bpm - 89.7).abs() < 1e-3);
        assert!((p.density - 0.2).abs() < 1e-6);
        assert!((p.swing - 0.048).abs() < 1e-6);
        assert!((p.fill_chance - 0.225).abs() < 1e-6);
        assert_eq!(p.root, 49);
    }

    #[test]
    fn focus_moves_root() {
        let d = Directive::default();
        let high = InteractionSnapshot { focus_y: 0.0, ..Default::default() };
        let low = InteractionSnapshot { focus_y: 1.0, ..Default::default() };
        assert_eq!(derive_params(&high, &d).root, 54);
        assert_eq!(derive_params(&low, &d).root, 44);

        let mut wide = d;
        wide.mapping_adjustments.pitch_influence = 1.0;
        let right = InteractionSnapshot { focus_x: 1.0, focus_y: 0.0, ..Default::default() };
        assert_eq!(derive_params(&right, &wide).root, 57);
        let left = InteractionSnapshot { focus_x: 0.0, focus_y: 1.0, ..Default::default() };
        assert_eq!(derive_params(&left, &wide).root, 41);
    }

    #[test]
    fn influences_outside_unit_range_are_clamped_at_use() {
        let mut d = Directive::default();
        d.mapping_adjustments.chaos_influence = 5.0;
        d.mapping_adjustments.pitch_influence = 5.0;
        let right = InteractionSnapshot { focus_x: 1.0, focus_y: 0.0, ..Default::default() };
        let p = derive_params(&right, &d);
        assert!(p.in_bounds(), "{p:?}");
        assert_eq!(p.fill_chance, 1.0);
        assert_eq!(p.root, 57);

        d.mapping_adjustments.chaos_influence = -5.0;
        d.mapping_adjustments.pitch_influence = -5.0;
        let p = derive_params(&right, &d);
        assert_eq!(p.fill_chance, 0.0);
        assert_eq!(p.root, 54);
    }

    #[test]
    fn extreme_inputs_stay_in_bounds() {
        let maxed = Directive {
            bpm: 160.0,
            density: 1.0,
            swing: 0.5,
            ..Directive::default()
        };
        let hot = InteractionSnapshot {
            energy: 1.0,
            chaos: 1.0,
            density: 1.0,
            focus_x: 1.0,
            focus_y: 0.0,
            rhythm_intent: 1.0,
        };
        let p = derive_params(&hot, &maxed);
        assert!(p.in_bounds(), "{p:?}");
        assert_eq!(p.swing, 0.2);

        let wild = InteractionSnapshot {
            energy: f32::INFINITY,
            chaos: f32::NAN,
            density: -3.0,
            focus_x: 40.0,
            focus_y: -40.0,
            rhythm_intent: 2.0,
        };
        let broken = Directive { bpm: f32::NAN, ..maxed };
        let p = derive_params(&wild, &broken);
        assert!(p.in_bounds(), "{p:?}");
        assert_eq!(p.bpm, ControlParams::default().bpm);
    }
}
