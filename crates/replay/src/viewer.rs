//! Interactive viewer window
//!
//! Mouse: left drag orbits, right drag pans, wheel zooms.
//! Keys: Space play/pause, Left/Right step, Home first frame, L loop,
//! 1/2/3 frame rate, M render mode, R retry, N next take, E next exercise,
//! G ground grid, C reset camera, Esc quit.

use anyhow::{anyhow, Context, Result};
use replay_core::{UserConfig, FRAME_RATE_OPTIONS};
use replay_media::{ReplayOrchestrator, ReplayPhase};
use replay_render::geometry::model_matrix;
use replay_render::{
    MeshBufferCache, MeshStyle, OrbitCamera, RenderBackend, SmplGeometry, SmplMeshRenderer,
    WgpuBackend,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

const ORBIT_SPEED: f32 = 0.005;
const PAN_SPEED: f32 = 0.001;
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

/// Window, surface and GPU resources, created once the event loop resumes
struct GpuState {
    window: Arc<Window>,
    backend: WgpuBackend,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: SmplMeshRenderer,
    buffers: MeshBufferCache,
    empty: MeshBufferCache,
    depth_view: wgpu::TextureView,
}

impl GpuState {
    fn new(event_loop: &ActiveEventLoop, config: &UserConfig) -> Result<Self> {
        let mut attributes = WindowAttributes::default()
            .with_title("Motion Replay")
            .with_inner_size(PhysicalSize::new(
                config.window_width.unwrap_or(1280),
                config.window_height.unwrap_or(800),
            ));
        if let (Some(x), Some(y)) = (config.window_x, config.window_y) {
            attributes = attributes.with_position(PhysicalPosition::new(x, y));
        }
        let window = Arc::new(event_loop.create_window(attributes)?);

        let backend = pollster::block_on(WgpuBackend::new(None))?;
        let surface = backend.create_surface(window.clone())?;
        let size = window.inner_size();
        let surface_config = backend.surface_config(&surface, size.width, size.height)?;
        surface.configure(backend.device(), &surface_config);

        let renderer = SmplMeshRenderer::new(backend.device.clone(), surface_config.format)?;
        let depth_view = renderer.create_depth_view(surface_config.width, surface_config.height);

        let adapter = backend.adapter_info();
        info!(
            "Viewer ready on {} ({:?}): {}x{} {:?}",
            adapter.name,
            adapter.backend,
            surface_config.width,
            surface_config.height,
            surface_config.format
        );

        Ok(Self {
            window,
            backend,
            surface,
            surface_config,
            renderer,
            buffers: MeshBufferCache::new(),
            empty: MeshBufferCache::new(),
            depth_view,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let max = self.backend.limits().max_texture_dimension_2d;
        self.surface_config.width = size.width.min(max);
        self.surface_config.height = size.height.min(max);
        self.surface
            .configure(self.backend.device(), &self.surface_config);
        self.depth_view = self
            .renderer
            .create_depth_view(self.surface_config.width, self.surface_config.height);
    }

    fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Orbit,
    Pan,
}

/// Viewer driving one orchestrator
pub struct ViewerApp {
    orchestrator: ReplayOrchestrator,
    config: UserConfig,
    gpu: Option<GpuState>,
    geometry: SmplGeometry,
    /// URL of the frame currently in `geometry`
    shown: Option<String>,
    camera: OrbitCamera,
    style: MeshStyle,
    started: Instant,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    title: String,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(orchestrator: ReplayOrchestrator, config: UserConfig) -> Self {
        let style = MeshStyle::from_srgb(config.mesh_rgb());
        Self {
            orchestrator,
            config,
            gpu: None,
            geometry: SmplGeometry::new(None),
            shown: None,
            camera: OrbitCamera::default(),
            style,
            started: Instant::now(),
            drag: None,
            cursor: None,
            title: String::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        error!("Viewer error: {:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: &Key) {
        let playback = self.orchestrator.playback_mut();
        match key {
            Key::Named(NamedKey::Space) => playback.toggle(),
            Key::Named(NamedKey::ArrowRight) => playback.step_forward(),
            Key::Named(NamedKey::ArrowLeft) => playback.step_backward(),
            Key::Named(NamedKey::Home) => playback.reset(),
            Key::Named(NamedKey::Escape) => {
                self.close(event_loop);
                return;
            }
            Key::Character(c) => match c.to_ascii_lowercase().as_str() {
                "l" => {
                    let looping = !playback.is_looping();
                    playback.set_loop(looping);
                    info!("Loop {}", if looping { "on" } else { "off" });
                }
                digit @ ("1" | "2" | "3") => {
                    let index = digit.parse::<usize>().unwrap_or(1) - 1;
                    if let Some(&fps) = FRAME_RATE_OPTIONS.get(index) {
                        playback.set_fps(fps);
                        info!("Playback at {} fps", fps);
                    }
                }
                "m" => {
                    let mode = self.orchestrator.cycle_render_mode();
                    info!("Render mode: {}", mode);
                }
                "r" => self.orchestrator.retry(),
                "c" => self.camera.reset(),
                "g" => {
                    if let Some(gpu) = self.gpu.as_mut() {
                        let visible = !gpu.renderer.ground_visible();
                        gpu.renderer.set_ground_visible(visible);
                    }
                }
                "n" => {
                    let count = self.orchestrator.selected_exercise().recording_count();
                    let next = (self.orchestrator.selected_recording_index() + 1) % count.max(1);
                    if let Err(e) = self.orchestrator.select_recording(next) {
                        warn!("{}", e);
                    }
                }
                "e" => {
                    let count = self.orchestrator.exercises().len();
                    let next = (self.orchestrator.selected_exercise_index() + 1) % count.max(1);
                    if let Err(e) = self.orchestrator.select_exercise(next) {
                        warn!("{}", e);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        self.orchestrator.publish();
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        if let (Some(drag), Some(last)) = (self.drag, self.cursor) {
            let dx = (position.x - last.x) as f32;
            let dy = (position.y - last.y) as f32;
            match drag {
                Drag::Orbit => self.camera.orbit(-dx * ORBIT_SPEED, dy * ORBIT_SPEED),
                Drag::Pan => self.camera.pan(dx * PAN_SPEED, dy * PAN_SPEED),
            }
        }
        self.cursor = Some(position);
    }

    /// Bring the CPU geometry in line with the orchestrator
    fn sync_geometry(&mut self) -> bool {
        if let Some(topology) = self.orchestrator.topology() {
            if !self.geometry.has_topology() {
                debug!("Topology arrived, rebuilding geometry");
                self.geometry = SmplGeometry::new(Some(topology.as_ref()));
                self.shown = None;
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.buffers.clear();
                }
            }
        }

        let current = self.orchestrator.playback().current_frame();
        let url = self.orchestrator.frame_urls().get(current);
        if url.is_none() {
            self.shown = None;
            return false;
        }
        if url != self.shown.as_ref() {
            if let (Some(url), Some(frame)) = (url, self.orchestrator.current_frame()) {
                self.geometry.update_positions(frame);
                self.shown = Some(url.clone());
            }
        }
        self.shown.is_some()
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let visible = self.sync_geometry();
        let mode = self
            .geometry
            .effective_mode(self.orchestrator.effective_render_mode());
        let elapsed = self.started.elapsed().as_secs_f32();

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        gpu.renderer.update_uniforms(
            gpu.backend.queue(),
            self.camera.view_projection(gpu.aspect()),
            model_matrix(elapsed),
            &self.style,
        );
        if visible {
            gpu.buffers
                .prepare(gpu.backend.device(), gpu.backend.queue(), &self.geometry);
        }

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = gpu.window.inner_size();
                gpu.resize(size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("Surface out of memory"));
                return;
            }
            Err(e) => {
                warn!("Skipping frame: {}", e);
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            gpu.backend
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Viewer Encoder"),
                });

        let buffers = if visible { &gpu.buffers } else { &gpu.empty };
        if let Err(e) = gpu
            .renderer
            .render(&mut encoder, &view, &gpu.depth_view, buffers, mode)
        {
            warn!("Draw failed: {}", e);
        }

        gpu.backend.queue().submit(Some(encoder.finish()));
        frame.present();
    }

    fn update_title(&mut self) {
        let status = self.orchestrator.status();
        let detail = match status.phase {
            ReplayPhase::Loading => format!("Loading {:.0}%", status.progress),
            ReplayPhase::ResolvingManifest => "Listing frames".to_string(),
            ReplayPhase::Failed => status
                .error
                .clone()
                .unwrap_or_else(|| "Failed".to_string()),
            ReplayPhase::Ready | ReplayPhase::Idle => status.frame_label.clone(),
        };
        let recording = self
            .orchestrator
            .recording_labels()
            .get(self.orchestrator.selected_recording_index())
            .cloned()
            .unwrap_or_default();
        let title = format!(
            "Motion Replay - {} - {} - {}{}",
            self.orchestrator.selected_exercise().name,
            recording,
            detail,
            if status.is_playing { "" } else { " (paused)" }
        );

        if title != self.title {
            if let Some(gpu) = &self.gpu {
                gpu.window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            let size = gpu.window.inner_size();
            self.config.window_width = Some(size.width);
            self.config.window_height = Some(size.height);
            if let Ok(position) = gpu.window.outer_position() {
                self.config.window_x = Some(position.x);
                self.config.window_y = Some(position.y);
            }
            if let Err(e) = self.config.save() {
                warn!("Failed to save window geometry: {}", e);
            }
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match GpuState::new(event_loop, &self.config) {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                if self.orchestrator.phase() == ReplayPhase::Idle {
                    self.orchestrator.refresh();
                }
            }
            Err(e) => self.fail(event_loop, e.context("Failed to initialise the viewer")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, &logical_key),
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Some(Drag::Orbit),
                    (ElementState::Pressed, MouseButton::Right) => Some(Drag::Pan),
                    (ElementState::Released, _) => None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => self.handle_cursor(position),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_ZOOM_STEP,
                };
                self.camera.zoom(steps);
            }
            WindowEvent::RedrawRequested => self.render(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.orchestrator.poll();
        self.orchestrator.tick(Instant::now());
        self.update_title();
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

/// Open the viewer and block until it is closed
pub fn run(orchestrator: ReplayOrchestrator, config: UserConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(orchestrator, config);
    info!("--- Entering Main Event Loop ---");
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
