//! The scene composer and application event loop.
//!
//! The composer owns the whole runtime: it creates the window and the GPU
//! context, preloads the mesh assets, builds the showcase scene, and then
//! drives the continuous frame loop. Each frame runs in a fixed order:
//! frame callbacks (in registration order), camera orbit, transform
//! propagation, instance/light upload, then the two render passes.
//!
//! Initialization is async (adapter request, asset fetches). On native it
//! blocks on a tokio runtime inside `resumed`; on wasm it spawns the future
//! and hands the finished state back through a user event.

use std::{iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    animate::FrameCallbacks,
    assets::AssetLibrary,
    context::Context,
    model::DrawModel,
    scene::Scene,
    showcase,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Inspects a captured frame; returning `true` ends the run.
#[cfg(feature = "integration-tests")]
pub type FrameProbe =
    Box<dyn FnMut(&image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>) -> bool>;

pub enum ViewerEvent {
    Initialized(Box<ViewerState>),
    #[allow(dead_code)]
    Exit,
}

impl std::fmt::Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Fully initialized viewer: GPU context, the scene tree, the callback
/// registry, and the wall clock every animator reads from.
pub struct ViewerState {
    pub ctx: Context,
    pub scene: Scene,
    pub callbacks: FrameCallbacks,
    started: Instant,
    is_surface_configured: bool,
}

impl ViewerState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;

        let mut assets = AssetLibrary::new();
        assets
            .preload(
                showcase::ASSET_PATHS,
                &ctx.device,
                &ctx.queue,
                &ctx.material_layout,
            )
            .await;

        let (scene, callbacks) = showcase::build(&ctx, &mut assets);

        Ok(Self {
            ctx,
            scene,
            callbacks,
            started: Instant::now(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.is_surface_configured = true;
            self.ctx.resize(width, height);
        }
    }

    #[cfg(feature = "integration-tests")]
    fn capture_size(&self) -> (u32, u32) {
        // Readback rows must be 256-byte aligned.
        let round = |v: u32| v + (256 - v % 256);
        (round(self.ctx.config.width), round(self.ctx.config.height))
    }

    #[cfg(feature = "integration-tests")]
    fn capture_texture(&self) -> wgpu::Texture {
        let (width, height) = self.capture_size();
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame capture texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[cfg(feature = "integration-tests")]
    fn capture_depth_texture(&self) -> wgpu::Texture {
        let (width, height) = self.capture_size();
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame capture depth texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: crate::texture::Texture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    /// Advance the scene to the current wall-clock time and render one frame.
    fn frame(
        &mut self,
        #[cfg(feature = "integration-tests")] async_runtime: &tokio::runtime::Runtime,
        #[cfg(feature = "integration-tests")] probe: &mut Option<FrameProbe>,
        #[cfg(feature = "integration-tests")] proxy: &winit::event_loop::EventLoopProxy<
            ViewerEvent,
        >,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();
        if !self.is_surface_configured {
            return Ok(());
        }

        let elapsed = self.started.elapsed().as_secs_f32();

        // Animators first, in registration order.
        self.callbacks.run(&mut self.scene.root, elapsed);

        // The scripted orbit owns the camera; interactive input stays
        // disabled for the showcase.
        self.ctx.camera.input.set_enabled(false);
        self.ctx.camera.tick(&self.ctx.queue, elapsed);

        self.scene.update_world_transforms();
        self.scene.root.write_instance_buffers(&self.ctx.queue);

        let batches = self.scene.collect();
        self.ctx.lights.upload(&self.ctx.queue, &batches.lights);

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        #[cfg(feature = "integration-tests")]
        let (capture, capture_depth) = (self.capture_texture(), self.capture_depth_texture());
        #[cfg(feature = "integration-tests")]
        let view = capture.create_view(&wgpu::TextureViewDescriptor::default());
        #[cfg(feature = "integration-tests")]
        let depth_view = capture_depth.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    #[cfg(feature = "integration-tests")]
                    view: &depth_view,
                    #[cfg(not(feature = "integration-tests"))]
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.ctx.pipelines.model);
            for draw in &batches.opaque {
                render_pass.set_vertex_buffer(1, draw.instances.slice(..));
                render_pass.draw_model_instanced(
                    draw.model,
                    0..draw.count,
                    &self.ctx.camera.bind_group,
                    &self.ctx.lights.bind_group,
                );
            }

            render_pass.set_pipeline(&self.ctx.pipelines.dust);
            for draw in &batches.decor {
                if draw.count == 0 {
                    continue;
                }
                render_pass.set_vertex_buffer(1, draw.instances.slice(..));
                render_pass.draw_model_instanced(
                    draw.model,
                    0..draw.count,
                    &self.ctx.camera.bind_group,
                    &self.ctx.lights.bind_group,
                );
            }
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let (width, height) = self.capture_size();
            let size = (4 * width * height) as wgpu::BufferAddress;
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("frame capture buffer"),
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &capture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(4 * width),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        if let Some(probe_fn) = probe {
            let image = async_runtime.block_on(async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                let buffer_slice = output_buffer.slice(..);
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    tx.send(result).unwrap();
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(instant::Duration::from_secs(3)),
                    })
                    .unwrap();
                rx.receive().await.unwrap().unwrap();
                let data = buffer_slice.get_mapped_range();
                let (width, height) = self.capture_size();
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, data).unwrap()
            });
            if probe_fn(&image) {
                proxy
                    .send_event(ViewerEvent::Exit)
                    .expect("probe passed but the event loop could not exit");
            }
        }

        output.present();
        Ok(())
    }
}

pub struct ViewerApp {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<ViewerEvent>,
    state: Option<ViewerState>,
    #[cfg(feature = "integration-tests")]
    probe: Option<FrameProbe>,
}

impl ViewerApp {
    fn new(
        event_loop: &EventLoop<ViewerEvent>,
        #[cfg(feature = "integration-tests")] probe: Option<FrameProbe>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            state: None,
            #[cfg(feature = "integration-tests")]
            probe,
        })
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("drydock");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("window creation failed"),
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self
                .async_runtime
                .block_on(ViewerState::new(window))
                .expect("viewer initialization failed");
            let size = state.ctx.window.inner_size();
            self.state = Some(state);
            if let Some(state) = &mut self.state {
                state.resize(size.width, size.height);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = ViewerState::new(window)
                    .await
                    .expect("viewer initialization failed");
                assert!(
                    proxy
                        .send_event(ViewerEvent::Initialized(Box::new(state)))
                        .is_ok()
                );
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(state) => {
                // The message from the wasm `spawn_local`; size and redraw
                // now that the surface exists.
                self.state = Some(*state);
                let state = self.state.as_mut().unwrap();
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
            }
            ViewerEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.input.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match state.frame(
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &mut self.probe,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("unable to render: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: could not initialize logger: {e}");
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }
}

fn build_event_loop() -> anyhow::Result<EventLoop<ViewerEvent>> {
    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        Ok(EventLoop::with_user_event().with_any_thread(true).build()?)
    }

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        Ok(EventLoop::with_user_event().with_any_thread(true).build()?)
    }

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    {
        Ok(EventLoop::with_user_event().build()?)
    }
}

/// Start the viewer and block until the window closes.
pub fn run() -> anyhow::Result<()> {
    init_logging();

    let event_loop = build_event_loop()?;
    let mut app = ViewerApp::new(
        &event_loop,
        #[cfg(feature = "integration-tests")]
        None,
    )?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Start the viewer with a frame probe; the loop exits once the probe
/// returns `true`.
#[cfg(feature = "integration-tests")]
pub fn run_with_probe(probe: FrameProbe) -> anyhow::Result<()> {
    init_logging();

    let event_loop = build_event_loop()?;
    let mut app = ViewerApp::new(&event_loop, Some(probe))?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
