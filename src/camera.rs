//! Camera state, projection and the cinematic orbit controller.
//!
//! The viewer's camera is not interactive: [`OrbitController`] recomputes
//! the position from absolute elapsed time every frame and force-disables
//! the interactive input collector, so the scripted loop never fights user
//! input. Restarting at any wall-clock time resumes the identical orbit
//! (the angle is `t * speed`, never accumulated).

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::event::WindowEvent;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Camera position; the look-at target is always the world origin.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, Point3::origin(), Vector3::unit_y())
    }
}

#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// The single "orbiting" state of the camera controller.
///
/// Each frame the yaw angle is derived from absolute elapsed seconds and
/// the orbit radius from the camera's live x/z position. The radius is
/// deliberately not stored: an external change to the camera's distance
/// permanently alters the orbit (see DESIGN.md).
#[derive(Clone, Copy, Debug)]
pub struct OrbitController {
    pub speed: f32,
}

impl OrbitController {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    pub fn update(&self, camera: &mut Camera, elapsed_secs: f32) {
        let angle = elapsed_secs * self.speed;
        let radius = (camera.position.x * camera.position.x
            + camera.position.z * camera.position.z)
            .sqrt();
        camera.position.x = angle.sin() * radius;
        camera.position.z = angle.cos() * radius;
    }
}

/// Interactive camera input (scroll-wheel dolly).
///
/// Present so the camera could be handed back to the user, but the
/// composer disables it every frame for the cinematic loop; collected
/// input is discarded while disabled.
#[derive(Debug)]
pub struct CameraInput {
    enabled: bool,
    scroll: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl CameraInput {
    pub fn new(min_distance: f32, max_distance: f32) -> Self {
        Self {
            enabled: true,
            scroll: 0.0,
            min_distance,
            max_distance,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.scroll = 0.0;
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        if let WindowEvent::MouseWheel { delta, .. } = event {
            self.scroll += match delta {
                winit::event::MouseScrollDelta::LineDelta(_, y) => *y,
                winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
            };
        }
    }

    /// Apply pending scroll as a dolly along the view axis, clamped to the
    /// configured distance band. A no-op while disabled.
    pub fn apply(&mut self, camera: &mut Camera) {
        if !self.enabled || self.scroll == 0.0 {
            self.scroll = 0.0;
            return;
        }
        let offset = camera.position.to_vec();
        let distance = offset.magnitude();
        let target = (distance - self.scroll * 0.5).clamp(self.min_distance, self.max_distance);
        camera.position = Point3::from_vec(offset.normalize() * target);
        self.scroll = 0.0;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    fog_color: [f32; 4],
    // near, far, then two padding floats
    fog_params: [f32; 4],
}

impl CameraUniform {
    pub fn new(fog_color: [f32; 3], fog_near: f32, fog_far: f32) -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            fog_color: [fog_color[0], fog_color[1], fog_color[2], 1.0],
            fog_params: [fog_near, fog_far, 0.0, 0.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.matrix() * camera.view_matrix()).into();
    }
}

/// Camera bundle owned by the render context: CPU state, controllers and
/// the GPU uniform resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub projection: Projection,
    pub orbit: OrbitController,
    pub input: CameraInput,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        camera: Camera,
        projection: Projection,
        orbit: OrbitController,
        input: CameraInput,
        fog_color: [f32; 3],
        fog_near: f32,
        fog_far: f32,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let mut uniform = CameraUniform::new(fog_color, fog_near, fog_far);
        uniform.update_view_proj(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera buffer"),
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
                label: Some("camera_bind_group_layout"),
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            projection,
            orbit,
            input,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Advance the orbit to the absolute elapsed time and upload the
    /// refreshed view-projection.
    pub fn tick(&mut self, queue: &wgpu::Queue, elapsed_secs: f32) {
        self.input.apply(&mut self.camera);
        self.orbit.update(&mut self.camera, elapsed_secs);
        self.uniform.update_view_proj(&self.camera, &self.projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_preserves_height() {
        let mut camera = Camera::new((5.0, 2.0, 7.0));
        let orbit = OrbitController::new(0.1);
        orbit.update(&mut camera, 42.0);
        assert_eq!(camera.position.y, 2.0);
    }

    #[test]
    fn orbit_angle_is_absolute_not_accumulated() {
        let orbit = OrbitController::new(0.1);

        let mut stepped = Camera::new((5.0, 2.0, 7.0));
        for i in 1..=100 {
            orbit.update(&mut stepped, i as f32 * 0.1);
        }

        let mut direct = Camera::new((5.0, 2.0, 7.0));
        orbit.update(&mut direct, 10.0);

        assert!((stepped.position.x - direct.position.x).abs() < 1e-4);
        assert!((stepped.position.z - direct.position.z).abs() < 1e-4);
    }
}
