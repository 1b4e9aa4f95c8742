//! Per-frame animators and the frame-callback registry.
//!
//! Every animator here is a pure function of absolute elapsed seconds and
//! constants fixed at creation: evaluating at time `t` yields the same
//! output no matter what was evaluated before, so there is no accumulation
//! error and no cross-instance coupling. Phase offsets (derived from an
//! instance's initial x-position) keep instances that share a formula out
//! of lockstep.
//!
//! The [`FrameCallbacks`] registry is the composer's tick list: closures
//! registered against a node id, invoked strictly in insertion order each
//! frame. Ordering across callbacks is pinned by construction.

use cgmath::{Deg, Quaternion, Rotation3, Vector3};

use crate::scene::{Node, NodeId};

/// Gentle vertical bobbing: `y = base_y + sin(t * frequency + phase) * amplitude`.
#[derive(Clone, Copy, Debug)]
pub struct Hover {
    pub base_y: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
}

impl Hover {
    pub const FREQUENCY: f32 = 0.5;
    pub const AMPLITUDE: f32 = 0.1;

    pub fn new(base_y: f32, phase: f32) -> Self {
        Self {
            base_y,
            amplitude: Self::AMPLITUDE,
            frequency: Self::FREQUENCY,
            phase,
        }
    }

    pub fn eval(&self, elapsed_secs: f32) -> f32 {
        self.base_y + (elapsed_secs * self.frequency + self.phase).sin() * self.amplitude
    }
}

/// Composite drift for the fighter escort: independent low-frequency
/// sin/cos terms per axis, each with its own amplitude, plus a slight bank
/// roll. The mixed frequencies never share a period, so two fighters with
/// different phases stay visually desynchronized forever.
#[derive(Clone, Copy, Debug)]
pub struct FighterSway {
    pub base: Vector3<f32>,
    pub phase: f32,
}

impl FighterSway {
    pub fn new(base: Vector3<f32>, phase: f32) -> Self {
        Self { base, phase }
    }

    pub fn eval_position(&self, t: f32) -> Vector3<f32> {
        Vector3::new(
            self.base.x + (t * 0.23 + self.phase).cos() * 0.18,
            self.base.y
                + (t * Hover::FREQUENCY + self.phase).sin() * Hover::AMPLITUDE
                + (t * 0.31 + self.phase).sin() * 0.04,
            self.base.z + (t * 0.17 + self.phase * 0.5).sin() * 0.12,
        )
    }

    pub fn eval_roll(&self, t: f32) -> Quaternion<f32> {
        Quaternion::from_angle_z(Deg((t * 0.4 + self.phase).sin() * 3.0))
    }
}

/// Derive a phase offset from an instance's initial x-position.
///
/// Matches the hover formula's use of the spawn x-coordinate as the phase
/// term, which guarantees distinct placements never animate in sync.
pub fn phase_from_x(x: f32) -> f32 {
    x
}

/// Engine-glow pulsing: `intensity = base + sin(t * speed) * amplitude`,
/// evaluated independently per light.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    pub base: f32,
    pub amplitude: f32,
    pub speed: f32,
    pub phase: f32,
}

impl Pulse {
    pub fn new(base: f32, amplitude: f32, speed: f32) -> Self {
        Self {
            base,
            amplitude,
            speed,
            phase: 0.0,
        }
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn eval(&self, t: f32) -> f32 {
        self.base + (t * self.speed + self.phase).sin() * self.amplitude
    }
}

/// Throttled hue rotation for the accent light.
///
/// Recomputing a hue every frame is wasted work nobody can see, so the
/// drift only yields a value when the quantized time passes the modulo
/// gate; callers keep the previous colour on `None`.
#[derive(Clone, Copy, Debug)]
pub struct HueDrift {
    pub base_hue: f32,
    /// Degrees of hue per second.
    pub speed: f32,
    /// Evaluate on every nth quantum only.
    pub every_nth: u32,
    /// Quanta per second used for the throttle test.
    pub quantum_hz: f32,
}

impl HueDrift {
    pub fn new(base_hue: f32, speed: f32) -> Self {
        Self {
            base_hue,
            speed,
            every_nth: 4,
            quantum_hz: 60.0,
        }
    }

    pub fn eval(&self, t: f32) -> Option<f32> {
        let quantum = (t * self.quantum_hz) as u32;
        if quantum % self.every_nth == 0 {
            Some((self.base_hue + t * self.speed).rem_euclid(360.0))
        } else {
            None
        }
    }
}

/// Convert a hue (degrees) to RGB at full saturation, half lightness.
pub fn hue_to_rgb(hue: f32) -> [f32; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    match h as u32 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

/// A per-frame mutation of one scene node, driven by elapsed seconds.
pub type FrameCallback = Box<dyn FnMut(&mut Node, f32)>;

/// Insertion-ordered list of per-frame callbacks, each bound to a node id.
///
/// The composer invokes `run` once per frame before transform propagation.
/// Callbacks whose node has disappeared are dropped with a warning rather
/// than looked up again every frame.
#[derive(Default)]
pub struct FrameCallbacks {
    entries: Vec<(NodeId, FrameCallback)>,
}

impl FrameCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: NodeId, callback: FrameCallback) {
        self.entries.push((node, callback));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run(&mut self, root: &mut Node, elapsed_secs: f32) {
        self.entries.retain_mut(|(id, callback)| {
            if let Some(node) = root.find_mut(*id) {
                callback(node, elapsed_secs);
                true
            } else {
                log::warn!("dropping frame callback for vanished node {id}");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAU: f32 = std::f32::consts::TAU;

    #[test]
    fn hover_at_time_zero_without_phase_is_base() {
        let hover = Hover::new(1.5, 0.0);
        assert_eq!(hover.eval(0.0), 1.5);
    }

    #[test]
    fn hover_is_periodic() {
        let hover = Hover::new(0.0, 0.7);
        let period = TAU / Hover::FREQUENCY;
        for i in 0..50 {
            let t = i as f32 * 0.37;
            assert!((hover.eval(t) - hover.eval(t + period)).abs() < 1e-4);
        }
    }

    #[test]
    fn hue_drift_only_fires_on_gated_quanta() {
        let drift = HueDrift::new(180.0, 10.0);
        // Quantum 0 passes the gate, quantum 1..3 do not.
        assert!(drift.eval(0.0).is_some());
        assert!(drift.eval(1.5 / 60.0).is_none());
        assert!(drift.eval(2.5 / 60.0).is_none());
        assert!(drift.eval(4.5 / 60.0).is_some());
    }

    #[test]
    fn hue_wraps_into_degrees() {
        let drift = HueDrift::new(350.0, 360.0);
        let hue = drift.eval(4.0 / 60.0).unwrap();
        assert!((0.0..360.0).contains(&hue));
    }

    #[test]
    fn hue_to_rgb_hits_primaries() {
        assert_eq!(hue_to_rgb(0.0), [1.0, 0.0, 0.0]);
        assert_eq!(hue_to_rgb(120.0), [0.0, 1.0, 0.0]);
        assert_eq!(hue_to_rgb(240.0), [0.0, 0.0, 1.0]);
    }
}
