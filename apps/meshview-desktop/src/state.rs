use glam::Vec2;
use meshview_common::{DrawProperties, ViewerConfig};
use meshview_input::{Action, ActionState, MouseLook, MoveDirection};
use meshview_kernel::{FixedTimestep, SteadyClock, TimeSource};
use meshview_render::Camera;
use std::time::Duration;
use winit::keyboard::KeyCode;

/// Key bindings. Everything else is left to the settings panel.
pub fn action_for_key(key: KeyCode) -> Option<Action> {
    let action = match key {
        KeyCode::KeyW => Action::Move(MoveDirection::Forward),
        KeyCode::KeyS => Action::Move(MoveDirection::Backward),
        KeyCode::KeyA => Action::Move(MoveDirection::Left),
        KeyCode::KeyD => Action::Move(MoveDirection::Right),
        KeyCode::Space => Action::Move(MoveDirection::Up),
        KeyCode::ShiftLeft | KeyCode::ControlLeft => Action::Move(MoveDirection::Down),
        KeyCode::Escape => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Window input the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerInput {
    Key { key: KeyCode, pressed: bool },
    /// The button that enables pointer look.
    LookButton { pressed: bool },
    /// Absolute pointer position in window pixels.
    CursorMoved(Vec2),
    /// Raw pointer motion in pixels, Y down. Used while the cursor is locked
    /// and positions stop changing.
    PointerMotion(Vec2),
}

/// Smoothed frame statistics for the settings panel.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_time: Duration,
    smoothed_ms: f32,
    steps_last_frame: u32,
}

impl FrameStats {
    const SMOOTHING: f32 = 0.1;

    pub fn record(&mut self, frame_time: Duration, steps: u32) {
        let ms = frame_time.as_secs_f32() * 1000.0;
        self.smoothed_ms = if self.smoothed_ms == 0.0 {
            ms
        } else {
            self.smoothed_ms + (ms - self.smoothed_ms) * Self::SMOOTHING
        };
        self.frame_time = frame_time;
        self.steps_last_frame = steps;
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub fn smoothed_ms(&self) -> f32 {
        self.smoothed_ms
    }

    pub fn fps(&self) -> f32 {
        if self.smoothed_ms > 0.0 {
            1000.0 / self.smoothed_ms
        } else {
            0.0
        }
    }

    pub fn steps_last_frame(&self) -> u32 {
        self.steps_last_frame
    }
}

/// Everything the viewer mutates between frames, independent of the window
/// and GL context.
pub struct ViewerState<C: TimeSource = SteadyClock> {
    pub camera: Camera,
    pub props: DrawProperties,
    pub stats: FrameStats,
    actions: ActionState,
    look: MouseLook,
    timestep: FixedTimestep<C>,
}

impl ViewerState<SteadyClock> {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::with_clock(config, SteadyClock)
    }
}

impl<C: TimeSource> ViewerState<C> {
    pub fn with_clock(config: &ViewerConfig, clock: C) -> Self {
        let center = Vec2::new(config.window.width as f32, config.window.height as f32) * 0.5;
        Self {
            camera: Camera::from_config(&config.camera),
            props: config.draw,
            stats: FrameStats::default(),
            actions: ActionState::new(),
            look: MouseLook::new(center),
            timestep: FixedTimestep::new(clock, config.fixed_timestep())
                .with_max_frame_time(config.max_frame_time()),
        }
    }

    /// Route a key press or release. Returns false for unbound keys.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        match action_for_key(key) {
            Some(action) => {
                self.actions.apply(action, pressed);
                true
            }
            None => false,
        }
    }

    /// Apply one input event.
    ///
    /// Presses the settings panel consumed are dropped. Releases always land,
    /// so a key or look drag that ends over the panel does not stay held.
    pub fn route(&mut self, input: ViewerInput, consumed_by_panel: bool) {
        match input {
            ViewerInput::Key { pressed: true, .. } | ViewerInput::LookButton { pressed: true }
                if consumed_by_panel => {}
            ViewerInput::Key { key, pressed } => {
                self.handle_key(key, pressed);
            }
            ViewerInput::LookButton { pressed } => self.set_look(pressed),
            ViewerInput::CursorMoved(position) => self.cursor_moved(position),
            ViewerInput::PointerMotion(delta) => {
                if self.look.is_enabled() {
                    self.camera.look(delta.x, -delta.y);
                }
            }
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.actions.quit_requested()
    }

    /// Enable or disable pointer look, e.g. while the right button is held.
    pub fn set_look(&mut self, enabled: bool) {
        if enabled != self.look.is_enabled() {
            tracing::debug!(enabled, "mouse look");
        }
        self.look.set_enabled(enabled);
    }

    pub fn is_looking(&self) -> bool {
        self.look.is_enabled()
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        if let Some(delta) = self.look.cursor_moved(position) {
            self.camera.look(delta.x, delta.y);
        }
    }

    /// Window lost focus: release events for held keys will not arrive.
    pub fn focus_lost(&mut self) {
        self.actions.release_all();
        self.set_look(false);
    }

    /// Measure the frame and run the fixed-step camera update.
    ///
    /// Returns the number of steps drained.
    pub fn advance(&mut self) -> u32 {
        let elapsed = self.timestep.begin_frame();
        let Self {
            camera,
            actions,
            timestep,
            ..
        } = self;
        let steps = timestep.drain(|step| {
            let dt = step.as_secs_f32();
            for direction in actions.held() {
                camera.move_in(direction, dt);
            }
        });
        self.stats.record(elapsed, steps);
        steps
    }

    pub fn timestep(&self) -> &FixedTimestep<C> {
        &self.timestep
    }
}
