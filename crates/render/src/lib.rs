//! Rendering for the mesh viewer: camera, shader programs, GPU resources and
//! the per-frame draw sequence.
//!
//! # Invariants
//! - The renderer never mutates the camera or the draw properties.
//! - Every GPU object has exactly one owner and is released exactly once.
//! - Within a frame, opaque draws precede the skybox, and each draw call
//!   leaves depth and polygon state as it found them.
//!
//! All GPU access goes through [`GraphicsApi`]. The OpenGL backend lives in
//! `meshview-render-gl`. The `headless` module, built for tests or with the
//! `headless` feature, records calls in memory instead.

pub mod camera;
pub mod device;
pub mod handle;
#[cfg(any(test, feature = "headless"))]
pub mod headless;
pub mod model;
mod resource;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod shading;
pub mod skybox;
pub mod tier;

pub use camera::Camera;
pub use device::{GpuError, GraphicsApi, Viewport};
pub use handle::GpuResource;
pub use model::Model;
pub use renderer::{Frame, Renderer};
pub use resource::ResourceError;
pub use scene::Scene;
pub use shader::{ShaderError, ShaderProgram};
pub use shading::{ShadingModeSelector, SubroutineSelector, UniformFlagSelector};
pub use skybox::{Skybox, SkyboxBuilder};
pub use tier::{CapabilityTier, ShaderPurpose};
