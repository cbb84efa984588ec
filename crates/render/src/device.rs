//! Graphics device seam.
//!
//! [`GraphicsApi`] is the narrow set of GPU calls the renderer issues. The
//! OpenGL backend lives in `meshview-render-gl`; [`crate::headless`] provides
//! a recording implementation for tests. All methods take `&self` because the
//! underlying context is implicit, thread-affine global state.

pub use meshview_assets::CubeFace;
use std::fmt;
use std::num::NonZeroU32;

macro_rules! gpu_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gpu_id!(
    /// Vertex or index buffer object.
    BufferId
);
gpu_id!(
    /// Vertex array object holding attribute bindings.
    VertexArrayId
);
gpu_id!(TextureId);
gpu_id!(
    /// A single compiled shader stage.
    ShaderId
);
gpu_id!(
    /// A linked shader program.
    ProgramId
);

/// Resolved location of a uniform in a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attributes.
    Array,
    /// Indices; the binding is recorded in the bound vertex array.
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    CubeMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    WrapR(TextureWrap),
}

/// Toggleable fixed-function capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Depth comparison. `Less` is the default and the renderer's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Framebuffer region to render into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Full-framebuffer viewport. Zero sizes (minimized windows) are bumped
    /// to one pixel so the aspect ratio stays finite.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Float vertex attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader attribute location.
    pub location: u32,
    /// Number of `f32` components.
    pub components: u32,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u32,
}

/// Errors from the device seam.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to allocate GPU {0}")]
    Allocation(&'static str),
    #[error("required GL function `{0}` is not available")]
    MissingFunction(&'static str),
}

/// GPU operations used by the renderer and resource types.
pub trait GraphicsApi {
    // Shader stages and programs.
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, GpuError>;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    fn create_program(&self) -> Result<ProgramId, GpuError>;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);

    // Uniforms. Uploads target the program in use.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_1_i32(&self, location: UniformLocation, value: i32);
    fn uniform_3_f32(&self, location: UniformLocation, value: [f32; 3]);
    fn uniform_matrix_3_f32(&self, location: UniformLocation, value: &[f32; 9]);
    fn uniform_matrix_4_f32(&self, location: UniformLocation, value: &[f32; 16]);

    // Subroutines. Only meaningful on tiers that support them.
    fn active_subroutine_uniform_locations(&self, program: ProgramId, stage: ShaderStage)
        -> usize;
    fn subroutine_index(&self, program: ProgramId, stage: ShaderStage, name: &str)
        -> Option<u32>;
    /// Select one subroutine per subroutine-uniform location, in location
    /// order, for the program in use.
    fn uniform_subroutines(&self, stage: ShaderStage, indices: &[u32]);

    // Buffers and vertex arrays.
    fn create_buffer(&self) -> Result<BufferId, GpuError>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&self, buffer: BufferId);

    fn create_vertex_array(&self) -> Result<VertexArrayId, GpuError>;
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>);
    /// Enable and describe an attribute of the bound vertex array, sourced
    /// from the bound array buffer.
    fn vertex_attribute(&self, attribute: VertexAttribute);
    fn delete_vertex_array(&self, vertex_array: VertexArrayId);

    // Textures.
    fn create_texture(&self) -> Result<TextureId, GpuError>;
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureId>);
    /// Upload RGBA8 pixels to one face of the bound cubemap.
    fn tex_image_cube_face(&self, face: CubeFace, width: u32, height: u32, rgba: &[u8]);
    fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter);
    fn delete_texture(&self, texture: TextureId);

    // Fixed-function state and drawing.
    fn viewport(&self, viewport: Viewport);
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear_color_and_depth(&self);
    fn set_capability(&self, capability: Capability, enabled: bool);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn depth_func(&self, func: DepthFunc);
    fn polygon_mode(&self, mode: PolygonMode);
    /// Draw indexed triangles from the bound vertex array with `u32` indices.
    fn draw_elements(&self, index_count: usize);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_never_divides_by_zero() {
        let viewport = Viewport::from_size(800, 0);
        assert_eq!(viewport.height, 1);
        assert!(viewport.aspect_ratio().is_finite());
        assert_eq!(Viewport::from_size(1024, 768).aspect_ratio(), 1024.0 / 768.0);
    }

    #[test]
    fn stage_display() {
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }
}
