use crate::api::GlApi;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use meshview_common::WindowConfig;
use meshview_render::{CapabilityTier, GpuError};
use raw_window_handle::HasWindowHandle;
use std::ffi::{CStr, CString, c_void};
use std::num::NonZeroU32;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to create a window with a matching GL config: {0}")]
    Display(String),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("window handle unavailable: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
    #[error("OpenGL context error: {0}")]
    Glutin(#[from] glutin::error::Error),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Window, GL surface and current context.
///
/// The surface and context drop before the window they render into.
pub struct GlContext {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
    tier: CapabilityTier,
}

impl GlContext {
    /// Create the window and a context of `tier`, and make it current on
    /// this thread.
    pub fn create(
        event_loop: &ActiveEventLoop,
        config: &WindowConfig,
        tier: CapabilityTier,
    ) -> Result<Self, ContextError> {
        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);
        let template = ConfigTemplateBuilder::new().with_depth_size(24);

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes.clone()))
            .build(event_loop, template, pick_config)
            .map_err(|err| ContextError::Display(err.to_string()))?;
        let window = match window {
            Some(window) => window,
            None => glutin_winit::finalize_window(event_loop, attributes, &gl_config)?,
        };

        let (major, minor) = tier.context_version();
        let version = Some(Version::new(major, minor));
        let builder = if tier.is_gles() {
            ContextAttributesBuilder::new().with_context_api(ContextApi::Gles(version))
        } else {
            ContextAttributesBuilder::new()
                .with_context_api(ContextApi::OpenGl(version))
                .with_profile(GlProfile::Core)
        };
        let context_attributes = builder.build(Some(window.window_handle()?.as_raw()));

        let display = gl_config.display();
        // SAFETY: the raw handle belongs to `window`, which outlives the
        // context and surface stored next to it.
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes)? };
        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes)? };
        let context = not_current.make_current(&surface)?;

        let interval = if config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(err) = surface.set_swap_interval(&context, interval) {
            tracing::warn!(%err, "could not set swap interval");
        }

        tracing::info!(
            %tier,
            samples = gl_config.num_samples(),
            vsync = config.vsync,
            "GL context created"
        );
        Ok(Self {
            surface,
            context,
            window,
            tier,
        })
    }

    /// Load GL function pointers for this context.
    pub fn load_api(&self) -> Result<GlApi, GpuError> {
        // SAFETY: `create` made the context current on this thread and it is
        // never made non-current.
        unsafe {
            GlApi::load_with(self.tier, |name| match CString::new(name) {
                Ok(name) => self.get_proc_address(&name),
                Err(_) => std::ptr::null(),
            })
        }
    }

    pub fn get_proc_address(&self, name: &CStr) -> *const c_void {
        self.context.display().get_proc_address(name)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Resize the surface. Zero sizes (minimized windows) are ignored.
    pub fn resize(&self, size: PhysicalSize<u32>) {
        if let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        {
            self.surface.resize(&self.context, width, height);
        }
    }

    pub fn swap_buffers(&self) -> Result<(), ContextError> {
        Ok(self.surface.swap_buffers(&self.context)?)
    }
}

/// Prefer the config with the most MSAA samples.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, config| {
            if config.num_samples() > best.num_samples() {
                config
            } else {
                best
            }
        })
        // glutin reports an error before calling the picker when no config matches.
        .expect("display offered no GL configs")
}
