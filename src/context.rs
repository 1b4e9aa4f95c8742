use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::{Camera, CameraInput, CameraResources, OrbitController, Projection},
    lights::{self, LightsResources},
    model,
    pipelines::Pipelines,
    texture::Texture,
};

/// Starting camera placement; the orbit controller keeps the height and
/// takes over x/z from here.
const CAMERA_START: (f32, f32, f32) = (5.0, 5.0, 7.0);
const CAMERA_FOV_DEG: f32 = 35.0;
const ORBIT_SPEED: f32 = 0.05;
const DOLLY_RANGE: (f32, f32) = (3.0, 20.0);

/// Everything GPU-side the viewer owns: device, surface, the camera and
/// light resources, and the two render pipelines. Passed explicitly to
/// whoever needs it; there is no global handle.
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub depth_texture: Texture,
    pub material_layout: wgpu::BindGroupLayout,
    pub camera: CameraResources,
    pub lights: LightsResources,
    pub pipelines: Pipelines,
    pub clear_color: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::debug!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        log::debug!("surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let fog_color = lights::rgb(lights::BACKGROUND);
        let camera = CameraResources::new(
            &device,
            Camera::new(CAMERA_START),
            Projection::new(
                config.width,
                config.height,
                cgmath::Deg(CAMERA_FOV_DEG),
                0.1,
                100.0,
            ),
            OrbitController::new(ORBIT_SPEED),
            CameraInput::new(DOLLY_RANGE.0, DOLLY_RANGE.1),
            fog_color,
            lights::FOG_NEAR,
            lights::FOG_FAR,
        );

        let lights = LightsResources::new(&device);
        let material_layout = model::material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            &material_layout,
            &camera.bind_group_layout,
            &lights.bind_group_layout,
        );

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth_texture,
            material_layout,
            camera,
            lights,
            pipelines,
            clear_color: clear_color(fog_color),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.camera.projection.resize(width, height);
    }
}

/// The surface is sRGB, so the clear value has to be fed in linear.
fn clear_color(srgb: [f32; 3]) -> wgpu::Color {
    let to_linear = |c: f32| (c as f64).powf(2.2);
    wgpu::Color {
        r: to_linear(srgb[0]),
        g: to_linear(srgb[1]),
        b: to_linear(srgb[2]),
        a: 1.0,
    }
}
