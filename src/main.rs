use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod config;
mod error;
mod math;
mod renderer;
mod scene;
mod ui;

use config::ViewerConfig;
use renderer::{
    FrameRenderer, FrameStats, GpuState, SceneResources, SkipReason, Viewport, load_textures,
};
use scene::Scene;
use ui::{
    CONTROL_STRIP_HEIGHT, RotationToggles, UiActions, WgpuTextureSink, apply_theme,
    draw_control_strip, upload_textures,
};

/// GPU-side state that only exists once the window does.
struct Viewer {
    gpu: GpuState,
    resources: SceneResources,
    renderer: FrameRenderer,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Viewer {
    fn texture_sink(&mut self) -> WgpuTextureSink<'_> {
        WgpuTextureSink {
            renderer: &mut self.egui_renderer,
            device: &self.gpu.device,
            queue: &self.gpu.queue,
        }
    }
}

struct App {
    config: ViewerConfig,
    scene: Scene,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer>,
    egui_ctx: egui::Context,

    toggles: Arc<RotationToggles>,
    stats: Arc<FrameStats>,

    frame_count: u32,
    fps_timer: Instant,

    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig, scene: Scene) -> Self {
        let toggles = Arc::new(RotationToggles::new(config.rotation.initial_flags()));
        Self {
            config,
            scene,
            window: None,
            viewer: None,
            egui_ctx: egui::Context::default(),
            toggles,
            stats: Arc::new(FrameStats::default()),
            frame_count: 0,
            fps_timer: Instant::now(),
            startup_error: None,
        }
    }

    fn init_viewer(&self, window: Arc<Window>) -> Result<Viewer> {
        let gpu = pollster::block_on(GpuState::new(window.clone(), &self.config))
            .context("failed to initialise GPU")?;

        let texture_dir = self.config.assets.texture_dir();
        let textures = load_textures(
            &gpu.device,
            &gpu.queue,
            &texture_dir,
            self.scene.materials.texture_names(),
        )
        .with_context(|| format!("failed to load textures from {texture_dir:?}"))?;

        let renderer = FrameRenderer::new(
            &self.scene,
            &textures,
            &self.config.view,
            &self.config.rotation,
        )?;
        let resources = SceneResources::new(&gpu, &self.scene.geometry, textures, renderer.parts());

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        Ok(Viewer {
            gpu,
            resources,
            renderer,
            egui_state,
            egui_renderer,
        })
    }

    fn update_fps(&mut self) {
        self.frame_count += 1;
        let elapsed = self.fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;
            *self.stats.fps.lock() = fps;
            tracing::trace!(fps, "frame rate");
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }
    }

    fn render(&mut self) {
        let (Some(window), Some(viewer)) = (&self.window, &mut self.viewer) else {
            return;
        };

        let raw_input = viewer.egui_state.take_egui_input(window);
        let stats = Arc::clone(&self.stats);
        let flags = self.toggles.snapshot();

        let mut ui_actions = UiActions::default();
        let mut scene_rect = egui::Rect::NOTHING;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_control_strip(ctx, flags, &stats);
            scene_rect = ctx.available_rect();
        });

        viewer
            .egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pending_frees = upload_textures(&mut viewer.texture_sink(), full_output.textures_delta);

        let Some(output) = viewer.gpu.acquire_frame(&self.stats) else {
            pending_frees.release(&mut viewer.texture_sink());
            apply_ui_actions(&self.toggles, ui_actions);
            return;
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let gpu = &viewer.gpu;
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        viewer.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        let viewport = Viewport::fit_square(
            scene_rect,
            full_output.pixels_per_point,
            (gpu.config.width, gpu.config.height),
        );
        if viewport.is_none() {
            self.stats.record_skipped(SkipReason::EmptyViewport);
        }
        let draws = gpu.render_scene(
            &view,
            &mut encoder,
            viewport,
            &viewer.resources,
            &mut viewer.renderer,
            flags,
        );
        tracing::trace!(draws, "scene encoded");

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            viewer
                .egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        pending_frees.release(&mut viewer.texture_sink());

        let gpu = &viewer.gpu;
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        if viewport.is_some() {
            self.stats.record_presented();
        }

        apply_ui_actions(&self.toggles, ui_actions);
        self.update_fps();
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::KeyX => self.toggles.toggle_x(),
            KeyCode::KeyY => self.toggles.toggle_y(),
            KeyCode::KeyZ => self.toggles.toggle_z(),
            _ => {}
        }
    }
}

fn apply_ui_actions(toggles: &RotationToggles, actions: UiActions) {
    if actions.toggle_x {
        toggles.toggle_x();
    }
    if actions.toggle_y {
        toggles.toggle_y();
    }
    if actions.toggle_z {
        toggles.toggle_z();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = LogicalSize::new(
            self.config.window.width as f64,
            self.config.window.height as f64 + CONTROL_STRIP_HEIGHT as f64,
        );
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(size)
            .with_resizable(false);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.startup_error = Some(anyhow::Error::new(err).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        match self.init_viewer(window.clone()) {
            Ok(viewer) => {
                info!("viewer ready");
                self.viewer = Some(viewer);
                self.window = Some(window);
            }
            Err(err) => {
                self.startup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(viewer), Some(window)) = (&mut self.viewer, &self.window) {
            let response = viewer.egui_state.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!(
                    presented = self.stats.presented(),
                    skipped = self.stats.skipped(),
                    "closing viewer"
                );
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.gpu.resize(size);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.handle_key(key);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                self.render();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ViewerConfig::load()?;
    let scene = Scene::load(
        &config.assets.geometry_path(),
        &config.assets.materials_path(),
    )
    .context("failed to load scene")?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
