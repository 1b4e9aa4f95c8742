//! Light descriptors, the static rig tables and GPU packing.
//!
//! Lights live in the scene graph as nodes; this module defines what a
//! light *is* (kind, colour, intensity, falloff, cone) and enumerates the
//! three rigs of the showcase: the global rig lighting the whole stage,
//! the per-fighter engine glow, and the main ship's hue-drifting accent.
//! All values are compile-time data; animators mutate intensity or colour
//! in place where a rig entry says so.
//!
//! Directional and spot lights always aim at the world origin, so the GPU
//! packing derives their direction from the placed position.

use cgmath::{InnerSpace, Vector3, Zero};

/// Upper bound on packed lights per frame; extras are dropped with a warning.
pub const MAX_LIGHTS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
    Spot,
    Hemisphere,
}

impl LightKind {
    fn code(self) -> u32 {
        match self {
            LightKind::Ambient => 0,
            LightKind::Directional => 1,
            LightKind::Point => 2,
            LightKind::Spot => 3,
            LightKind::Hemisphere => 4,
        }
    }
}

/// One light's full parameter set. Static unless an animator drives it.
#[derive(Clone, Debug)]
pub struct LightDescriptor {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Falloff distance for point/spot lights; 0.0 means unbounded.
    pub range: f32,
    /// Spot cone half-angle in radians.
    pub cone_angle: f32,
    /// Spot edge softness, 0.0 (hard) to 1.0.
    pub penumbra: f32,
    /// Ground tint for hemisphere lights.
    pub ground_color: [f32; 3],
    pub casts_shadow: bool,
}

impl LightDescriptor {
    pub fn ambient(intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color: [1.0, 1.0, 1.0],
            intensity,
            range: 0.0,
            cone_angle: 0.0,
            penumbra: 0.0,
            ground_color: [0.0; 3],
            casts_shadow: false,
        }
    }

    pub fn directional(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            range: 0.0,
            cone_angle: 0.0,
            penumbra: 0.0,
            ground_color: [0.0; 3],
            casts_shadow: false,
        }
    }

    pub fn point(color: [f32; 3], intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            range,
            cone_angle: 0.0,
            penumbra: 0.0,
            ground_color: [0.0; 3],
            casts_shadow: false,
        }
    }

    pub fn spot(color: [f32; 3], intensity: f32, range: f32, cone_angle: f32, penumbra: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            color,
            intensity,
            range,
            cone_angle,
            penumbra,
            ground_color: [0.0; 3],
            casts_shadow: false,
        }
    }

    pub fn hemisphere(sky: [f32; 3], ground: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Hemisphere,
            color: sky,
            intensity,
            range: 0.0,
            cone_angle: 0.0,
            penumbra: 0.0,
            ground_color: ground,
            casts_shadow: false,
        }
    }

    pub fn with_shadow(mut self) -> Self {
        self.casts_shadow = true;
        self
    }
}

/// Convert a `0xRRGGBB` colour to linear-ish float RGB.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Background colour of the stage, also the fog colour.
pub const BACKGROUND: u32 = 0x101820;
pub const FOG_NEAR: f32 = 12.0;
pub const FOG_FAR: f32 = 35.0;

const CYAN_KEY: u32 = 0x4cecff;

/// The global rig lighting the whole stage: one entry per light with its
/// placement. Positions and parameters are the showcase's fixed look.
pub fn global_rig() -> Vec<(&'static str, Vector3<f32>, LightDescriptor)> {
    vec![
        ("ambient", Vector3::zero(), LightDescriptor::ambient(0.25)),
        (
            "sun",
            Vector3::new(10.0, 15.0, 8.0),
            LightDescriptor::directional([1.0, 1.0, 1.0], 2.2).with_shadow(),
        ),
        (
            "key cyan",
            Vector3::new(5.0, 4.0, 0.0),
            LightDescriptor::spot(rgb(CYAN_KEY), 2.0, 25.0, 0.6, 0.8).with_shadow(),
        ),
        (
            "opposite cyan",
            Vector3::new(-5.0, 4.0, 0.0),
            LightDescriptor::spot(rgb(CYAN_KEY), 1.8, 25.0, 0.6, 0.8).with_shadow(),
        ),
        (
            "back cyan",
            Vector3::new(0.0, 4.0, -5.0),
            LightDescriptor::spot(rgb(CYAN_KEY), 1.8, 25.0, 0.6, 0.8).with_shadow(),
        ),
        (
            "fill",
            Vector3::new(-8.0, 3.0, 5.0),
            LightDescriptor::directional(rgb(0x75ffee), 0.6),
        ),
        (
            "rim",
            Vector3::new(0.0, 5.0, -8.0),
            LightDescriptor::spot(rgb(0xdbfffd), 1.2, 0.0, 0.5, 1.0),
        ),
        (
            "ground bounce",
            Vector3::new(0.0, 0.2, 0.0),
            LightDescriptor::point(rgb(0x2a636b), 0.3, 8.0),
        ),
        (
            "hemisphere",
            Vector3::zero(),
            LightDescriptor::hemisphere(rgb(0xb4d2ff), rgb(0x102138), 0.4),
        ),
    ]
}

/// Engine glow behind a fighter's thrusters; the pulse animator drives
/// intensity around this base.
pub fn engine_glow() -> LightDescriptor {
    LightDescriptor::point(rgb(0x66ccff), 1.2, 4.0)
}

/// The main ship's accent light; a throttled hue drift rotates its colour.
pub fn accent() -> LightDescriptor {
    LightDescriptor::point(rgb(CYAN_KEY), 0.8, 10.0)
}

/// A light descriptor paired with its resolved world position, as gathered
/// by the per-frame scene traversal.
#[derive(Clone, Debug)]
pub struct PlacedLight {
    pub position: Vector3<f32>,
    pub descriptor: LightDescriptor,
}

/**
 * The raw light layout shared with WGSL. Each vec3 pairs with a scalar to
 * keep 16-byte alignment without wasted padding.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    position: [f32; 3],
    kind: u32,
    color: [f32; 3],
    intensity: f32,
    direction: [f32; 3],
    range: f32,
    ground_color: [f32; 3],
    cone_cos: f32,
    penumbra: f32,
    _padding: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    lights: [GpuLight; MAX_LIGHTS],
    count: u32,
    _padding: [u32; 3],
}

impl LightsUniform {
    pub fn new() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    /// Pack the frame's placed lights into the uniform array.
    pub fn pack(&mut self, placed: &[PlacedLight]) {
        if placed.len() > MAX_LIGHTS {
            log::warn!(
                "scene has {} lights, packing only the first {}",
                placed.len(),
                MAX_LIGHTS
            );
        }
        let count = placed.len().min(MAX_LIGHTS);
        for (slot, light) in self.lights.iter_mut().zip(placed.iter()) {
            let d = &light.descriptor;
            let direction = match d.kind {
                // Aim at the origin; a light sitting exactly on the origin
                // falls back to straight down.
                LightKind::Directional | LightKind::Spot => {
                    if light.position.is_zero() {
                        Vector3::new(0.0, -1.0, 0.0)
                    } else {
                        -light.position.normalize()
                    }
                }
                _ => Vector3::new(0.0, -1.0, 0.0),
            };
            *slot = GpuLight {
                position: light.position.into(),
                kind: d.kind.code(),
                color: d.color,
                intensity: d.intensity,
                direction: direction.into(),
                range: d.range,
                ground_color: d.ground_color,
                cone_cos: d.cone_angle.cos(),
                penumbra: d.penumbra,
                _padding: [0.0; 3],
            };
        }
        self.count = count as u32;
    }
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the light rig: the uniform array, its buffer and bind group.
pub struct LightsResources {
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightsResources {
    pub fn new(device: &wgpu::Device) -> Self {
        use wgpu::util::DeviceExt;

        let uniform = LightsUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lights buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("lights_bind_group_layout"),
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("lights_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Repack and upload the frame's lights.
    pub fn upload(&mut self, queue: &wgpu::Queue, placed: &[PlacedLight]) {
        self.uniform.pack(placed);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_rig_covers_every_kind() {
        let rig = global_rig();
        for kind in [
            LightKind::Ambient,
            LightKind::Directional,
            LightKind::Point,
            LightKind::Spot,
            LightKind::Hemisphere,
        ] {
            assert!(
                rig.iter().any(|(_, _, d)| d.kind == kind),
                "rig is missing {kind:?}"
            );
        }
    }

    #[test]
    fn packing_clamps_to_capacity() {
        let placed: Vec<_> = (0..MAX_LIGHTS + 4)
            .map(|i| PlacedLight {
                position: Vector3::new(i as f32, 0.0, 0.0),
                descriptor: LightDescriptor::point([1.0; 3], 1.0, 5.0),
            })
            .collect();
        let mut uniform = LightsUniform::new();
        uniform.pack(&placed);
        assert_eq!(uniform.count, MAX_LIGHTS as u32);
    }

    #[test]
    fn rgb_decodes_hex_channels() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
        let c = rgb(BACKGROUND);
        assert!(c[2] > c[0]);
    }
}
