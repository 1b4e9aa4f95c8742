use crate::{
    instance::InstanceRaw,
    model::{ModelVertex, Vertex},
    pipelines::mk_render_pipeline,
    texture::Texture,
};

/// The decoration pass: alpha-blended dust and nebula sprites.
///
/// Depth writes stay off so overlapping sprites don't punch holes in each
/// other; depth testing stays on so ships still occlude them. The pipeline
/// layout matches the model pass, which lets both passes share one draw
/// path.
pub fn mk_dust_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    material_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
    lights_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("dust pipeline layout"),
        bind_group_layouts: &[material_layout, camera_layout, lights_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("dust shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("dust_shader.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        false,
        None,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
