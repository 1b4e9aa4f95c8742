//! Render pipeline construction. One pipeline per pass: opaque models with
//! the full light rig, then the alpha-blended dust sprites on top.

pub mod dust;
pub mod model;

pub use dust::mk_dust_pipeline;
pub use model::{mk_model_pipeline, mk_render_pipeline};

pub struct Pipelines {
    pub model: wgpu::RenderPipeline,
    pub dust: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        lights_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            model: mk_model_pipeline(device, config, material_layout, camera_layout, lights_layout),
            dust: mk_dust_pipeline(device, config, material_layout, camera_layout, lights_layout),
        }
    }
}
