use crate::settings::SettingsPanel;
use crate::state::{ViewerInput, ViewerState};
use anyhow::{Context as _, Result};
use egui_glow::EguiGlow;
use glam::Vec2;
use meshview_common::ViewerConfig;
use meshview_render::{CapabilityTier, Renderer, Scene, Viewport};
use meshview_render_gl::{GlApi, GlContext};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Everything that needs a live GL context.
///
/// Fields drop in declaration order: GPU resources first, then the panel
/// painter, then the context and window.
struct Gpu {
    scene: Scene<GlApi>,
    renderer: Renderer<GlApi>,
    egui: EguiGlow,
    context: GlContext,
}

impl Gpu {
    fn create(
        event_loop: &ActiveEventLoop,
        config: &ViewerConfig,
        shader_dir: &Path,
    ) -> Result<Self> {
        let context = GlContext::create(event_loop, &config.window, CapabilityTier::ACTIVE)
            .context("failed to create the OpenGL context")?;
        let api = Rc::new(context.load_api().context("failed to load OpenGL functions")?);

        let renderer = Renderer::from_shader_dir(Rc::clone(&api), context.tier(), shader_dir)
            .with_context(|| format!("failed to build shaders from {}", shader_dir.display()))?;
        let scene = Scene::load(&api, &config.assets).context("failed to load the scene")?;

        // SAFETY: the context is current on this thread for the life of `Gpu`.
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| context.get_proc_address(name))
        };
        let egui = EguiGlow::new(event_loop, Arc::new(gl), None, None, false);

        Ok(Self {
            scene,
            renderer,
            egui,
            context,
        })
    }

    fn teardown(self) {
        let Self {
            scene,
            renderer,
            mut egui,
            context,
        } = self;
        drop(scene);
        drop(renderer);
        egui.destroy();
        drop(context);
        tracing::debug!("GPU resources released");
    }
}

/// winit application: owns the viewer state and, once resumed, the GPU side.
pub struct ViewerApp {
    config: ViewerConfig,
    shader_dir: PathBuf,
    state: ViewerState,
    panel: Option<SettingsPanel>,
    gpu: Option<Gpu>,
    /// Grab mode in effect while looking; `None` when the cursor is free.
    cursor_grab: Option<CursorGrabMode>,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig, shader_dir: PathBuf) -> Self {
        let state = ViewerState::from_config(&config);
        Self {
            config,
            shader_dir,
            state,
            panel: None,
            gpu: None,
            cursor_grab: None,
            failure: None,
        }
    }

    /// Initialization error that stopped the event loop, if any.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }

    fn route(&mut self, event_loop: &ActiveEventLoop, input: ViewerInput, consumed: bool) {
        if let ViewerInput::Key { key: KeyCode::F1, pressed: true } = input {
            if !consumed {
                if let Some(panel) = &mut self.panel {
                    panel.visible = !panel.visible;
                }
            }
            return;
        }
        self.state.route(input, consumed);
        self.sync_cursor();
        if self.state.quit_requested() {
            tracing::info!("quit requested");
            event_loop.exit();
        }
    }

    /// Hide and grab the cursor while looking, release it otherwise.
    fn sync_cursor(&mut self) {
        let looking = self.state.is_looking();
        if looking == self.cursor_grab.is_some() {
            return;
        }
        let Some(gpu) = &self.gpu else {
            return;
        };
        let window = gpu.context.window();
        window.set_cursor_visible(!looking);
        self.cursor_grab = if looking {
            Some(grab_cursor(window))
        } else {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                tracing::warn!(%err, "could not release the cursor");
            }
            None
        };
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        self.state.advance();

        if let Some(panel) = &self.panel {
            let state = &mut self.state;
            gpu.egui.run(gpu.context.window(), |ctx| panel.show(ctx, state));
        }

        let size = gpu.context.size();
        let viewport = Viewport::from_size(size.width, size.height);
        let props = self.state.props;
        let mut frame = gpu.renderer.prepare_draw(viewport, &props);
        if let Some(model) = gpu.scene.models().get(props.selected_model_index) {
            frame.draw_model(model, &self.state.camera, &props);
        }
        if props.skybox_enabled {
            if let Some(skybox) = gpu.scene.skybox() {
                frame.draw_skybox(skybox, &self.state.camera);
            }
        }

        gpu.egui.paint(gpu.context.window());
        gpu.context.swap_buffers()?;
        gpu.context.window().request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::create(event_loop, &self.config, &self.shader_dir) {
            Ok(gpu) => {
                let names = gpu.scene.model_names().map(str::to_owned).collect();
                self.panel = Some(SettingsPanel::new(names, gpu.context.tier()));
                gpu.context.window().request_redraw();
                self.gpu = Some(gpu);
                tracing::info!("viewer initialized");
            }
            Err(err) => {
                self.failure = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let mut consumed = false;
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui.on_window_event(gpu.context.window(), &event);
            if response.repaint {
                gpu.context.window().request_redraw();
            }
            consumed = response.consumed;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &self.gpu {
                    gpu.context.resize(size);
                }
            }
            WindowEvent::Focused(false) => {
                self.state.focus_lost();
                self.sync_cursor();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                self.route(event_loop, ViewerInput::Key { key, pressed }, consumed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: button_state,
                ..
            } => {
                let pressed = button_state == ElementState::Pressed;
                self.route(event_loop, ViewerInput::LookButton { pressed }, consumed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.route(event_loop, ViewerInput::CursorMoved(position), consumed);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    tracing::error!("frame failed: {err:#}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        // A locked cursor stops reporting positions, so look from raw motion.
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.cursor_grab == Some(CursorGrabMode::Locked) {
                let delta = Vec2::new(delta.0 as f32, delta.1 as f32);
                self.route(event_loop, ViewerInput::PointerMotion(delta), false);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.take() {
            gpu.teardown();
        }
        let timestep = self.state.timestep();
        tracing::info!(
            frames = timestep.total_frames(),
            steps = timestep.total_steps(),
            "viewer shutting down"
        );
    }
}

/// Confine the cursor to the window, or lock it where confinement is not
/// supported.
fn grab_cursor(window: &Window) -> CursorGrabMode {
    for mode in [CursorGrabMode::Confined, CursorGrabMode::Locked] {
        match window.set_cursor_grab(mode) {
            Ok(()) => return mode,
            Err(err) => tracing::debug!(?mode, %err, "cursor grab mode unavailable"),
        }
    }
    tracing::warn!("cursor grab unavailable, look continues with a hidden cursor");
    CursorGrabMode::None
}
