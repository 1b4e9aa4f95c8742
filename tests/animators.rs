//! Behavioural checks on the pure animators: bounds, periodicity, phase
//! separation and the fixed values the formulas pin down.

use drydock::animate::{phase_from_x, FighterSway, Hover, HueDrift, Pulse};

const TAU: f32 = std::f32::consts::TAU;

#[test]
fn hover_is_periodic_and_bounded() {
    let hover = Hover::new(1.0, phase_from_x(2.8));
    let period = TAU / Hover::FREQUENCY;

    for i in 0..500 {
        let t = i as f32 * 0.173;
        let y = hover.eval(t);
        assert!(
            (hover.base_y - hover.amplitude..=hover.base_y + hover.amplitude).contains(&y),
            "y({t}) = {y} outside the hover band"
        );
        assert!(
            (y - hover.eval(t + period)).abs() < 1e-4,
            "hover not periodic at t = {t}"
        );
    }
}

#[test]
fn hover_at_time_zero_with_zero_phase_returns_base() {
    let hover = Hover::new(0.75, 0.0);
    assert_eq!(hover.eval(0.0), 0.75);
}

#[test]
fn distinct_phases_never_stay_in_lockstep() {
    let a = Hover::new(0.0, phase_from_x(2.8));
    let b = Hover::new(0.0, phase_from_x(-3.2));

    let mut differing = 0;
    let samples = 1000;
    for i in 0..samples {
        let t = i as f32 * 0.1;
        if (a.eval(t) - b.eval(t)).abs() > 1e-3 {
            differing += 1;
        }
    }
    // Equality can only happen at isolated crossing points.
    assert!(
        differing > samples * 9 / 10,
        "outputs agreed on {} of {samples} samples",
        samples - differing
    );
}

#[test]
fn pulse_stays_within_its_band() {
    let pulse = Pulse::new(1.2, 0.35, 2.0).with_phase(1.8);
    for i in 0..500 {
        let t = i as f32 * 0.219;
        let intensity = pulse.eval(t);
        assert!(
            (0.85..=1.55).contains(&intensity),
            "intensity({t}) = {intensity}"
        );
    }
}

#[test]
fn pulses_with_different_phases_are_independent() {
    let a = Pulse::new(1.2, 0.35, 2.0).with_phase(phase_from_x(2.8));
    let b = Pulse::new(1.2, 0.35, 2.0).with_phase(phase_from_x(-3.2));
    let t = 3.7;
    assert!((a.eval(t) - b.eval(t)).abs() > 1e-3);
}

#[test]
fn fighter_sway_is_time_absolute() {
    let sway = FighterSway::new([2.8, 0.6, -1.6].into(), phase_from_x(2.8));
    // Evaluating out of order gives identical results: no accumulation.
    let late = sway.eval_position(100.0);
    let early = sway.eval_position(1.0);
    let late_again = sway.eval_position(100.0);
    assert_eq!(late, late_again);
    assert_ne!(late, early);
}

#[test]
fn fighter_sway_stays_near_its_post() {
    let post = cgmath::Vector3::new(-3.2, 0.3, 1.2);
    let sway = FighterSway::new(post, phase_from_x(post.x));
    for i in 0..500 {
        let t = i as f32 * 0.31;
        let p = sway.eval_position(t);
        assert!((p.x - post.x).abs() <= 0.18 + 1e-5);
        assert!((p.y - post.y).abs() <= 0.14 + 1e-5);
        assert!((p.z - post.z).abs() <= 0.12 + 1e-5);
    }
}

#[test]
fn hue_drift_throttle_skips_most_quanta() {
    let drift = HueDrift::new(190.0, 12.0);
    let mut evaluated = 0;
    let frames = 240;
    for i in 0..frames {
        // One sample per 60 Hz frame, taken mid-quantum so float rounding
        // cannot shift which quantum the sample lands in.
        let t = (i as f32 + 0.5) / 60.0;
        if drift.eval(t).is_some() {
            evaluated += 1;
        }
    }
    // Every fourth quantum passes the gate.
    assert_eq!(evaluated, frames / 4);
}

#[test]
fn hue_drift_output_is_always_a_valid_hue() {
    let drift = HueDrift::new(350.0, 100.0);
    for i in 0..1000 {
        let t = i as f32 * 0.4;
        if let Some(hue) = drift.eval(t) {
            assert!((0.0..360.0).contains(&hue), "hue({t}) = {hue}");
        }
    }
}
