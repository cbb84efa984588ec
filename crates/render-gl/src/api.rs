use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};
use meshview_render::CapabilityTier;
use meshview_render::device::{
    BlendFactor, BufferId, BufferTarget, Capability, CubeFace, DepthFunc, GpuError,
    GraphicsApi, PolygonMode, ProgramId, ShaderId, ShaderStage, TextureFilter, TextureId,
    TextureParameter, TextureTarget, TextureWrap, UniformLocation, VertexArrayId,
    VertexAttribute, Viewport,
};
use std::ffi::{CStr, CString, c_void};
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::rc::Rc;

/// [`GraphicsApi`] over the process-global OpenGL function table.
#[derive(Debug)]
pub struct GlApi {
    tier: CapabilityTier,
    _not_send: PhantomData<Rc<()>>,
}

impl GlApi {
    /// Load GL entry points through `loader` and check the ones `tier` needs.
    ///
    /// # Safety
    /// A context of `tier` must be current on the calling thread and stay
    /// current for as long as the returned value is used.
    pub unsafe fn load_with<F>(tier: CapabilityTier, loader: F) -> Result<Self, GpuError>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);

        let mut required = vec![
            ("glCreateShader", gl::CreateShader::is_loaded()),
            ("glLinkProgram", gl::LinkProgram::is_loaded()),
            ("glGetUniformLocation", gl::GetUniformLocation::is_loaded()),
            ("glGenVertexArrays", gl::GenVertexArrays::is_loaded()),
            ("glGenBuffers", gl::GenBuffers::is_loaded()),
            ("glGenTextures", gl::GenTextures::is_loaded()),
            ("glUniformMatrix4fv", gl::UniformMatrix4fv::is_loaded()),
            ("glDrawElements", gl::DrawElements::is_loaded()),
        ];
        if tier.supports_subroutines() {
            required.extend([
                ("glGetProgramStageiv", gl::GetProgramStageiv::is_loaded()),
                ("glGetSubroutineIndex", gl::GetSubroutineIndex::is_loaded()),
                ("glUniformSubroutinesuiv", gl::UniformSubroutinesuiv::is_loaded()),
            ]);
        }
        if tier.supports_polygon_mode() {
            required.push(("glPolygonMode", gl::PolygonMode::is_loaded()));
        }
        if let Some(&(name, _)) = required.iter().find(|(_, loaded)| !loaded) {
            return Err(GpuError::MissingFunction(name));
        }

        tracing::info!(
            %tier,
            version = %gl_string(gl::VERSION),
            renderer = %gl_string(gl::RENDERER),
            "OpenGL functions loaded"
        );
        Ok(Self {
            tier,
            _not_send: PhantomData,
        })
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }
}

fn gl_string(name: GLenum) -> String {
    // SAFETY: glGetString returns null or a static NUL-terminated string.
    unsafe {
        let ptr = gl::GetString(name);
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr.cast()).to_string_lossy().into_owned()
    }
}

fn generate(
    kind: &'static str,
    create: unsafe fn(GLsizei, *mut GLuint),
) -> Result<NonZeroU32, GpuError> {
    let mut id = 0;
    // SAFETY: writes exactly one name into `id`.
    unsafe { create(1, &mut id) };
    NonZeroU32::new(id).ok_or(GpuError::Allocation(kind))
}

fn info_log(
    id: GLuint,
    get_iv: unsafe fn(GLuint, GLenum, *mut GLint),
    get_log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
) -> String {
    let mut len: GLint = 0;
    // SAFETY: `id` names a live object of the kind `get_iv` expects.
    unsafe { get_iv(id, gl::INFO_LOG_LENGTH, &mut len) };
    let Ok(capacity) = usize::try_from(len) else {
        return String::new();
    };
    if capacity == 0 {
        return String::new();
    }
    let mut buf = vec![0u8; capacity];
    let mut written: GLsizei = 0;
    // SAFETY: `buf` holds `len` bytes.
    unsafe { get_log(id, len, &mut written, buf.as_mut_ptr().cast()) };
    buf.truncate(usize::try_from(written).unwrap_or(0));
    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

fn stage_enum(stage: ShaderStage) -> GLenum {
    match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER,
        ShaderStage::Fragment => gl::FRAGMENT_SHADER,
    }
}

fn buffer_target(target: BufferTarget) -> GLenum {
    match target {
        BufferTarget::Array => gl::ARRAY_BUFFER,
        BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
    }
}

fn texture_target(target: TextureTarget) -> GLenum {
    match target {
        TextureTarget::CubeMap => gl::TEXTURE_CUBE_MAP,
    }
}

fn blend_factor(factor: BlendFactor) -> GLenum {
    match factor {
        BlendFactor::Zero => gl::ZERO,
        BlendFactor::One => gl::ONE,
        BlendFactor::SrcAlpha => gl::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
    }
}

fn texture_parameter(parameter: TextureParameter) -> (GLenum, GLenum) {
    let filter = |f| match f {
        TextureFilter::Nearest => gl::NEAREST,
        TextureFilter::Linear => gl::LINEAR,
    };
    let wrap = |w| match w {
        TextureWrap::Repeat => gl::REPEAT,
        TextureWrap::ClampToEdge => gl::CLAMP_TO_EDGE,
    };
    match parameter {
        TextureParameter::MinFilter(f) => (gl::TEXTURE_MIN_FILTER, filter(f)),
        TextureParameter::MagFilter(f) => (gl::TEXTURE_MAG_FILTER, filter(f)),
        TextureParameter::WrapS(w) => (gl::TEXTURE_WRAP_S, wrap(w)),
        TextureParameter::WrapT(w) => (gl::TEXTURE_WRAP_T, wrap(w)),
        TextureParameter::WrapR(w) => (gl::TEXTURE_WRAP_R, wrap(w)),
    }
}

fn saturating_sizei(n: usize) -> GLsizei {
    GLsizei::try_from(n).unwrap_or(GLsizei::MAX)
}

// SAFETY (all blocks below): `GlApi` can only be built with a current
// context on this thread, and it is `!Send`, so every call runs there.
// Handles passed in were produced by this context.
impl GraphicsApi for GlApi {
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, GpuError> {
        let id = unsafe { gl::CreateShader(stage_enum(stage)) };
        NonZeroU32::new(id)
            .map(ShaderId)
            .ok_or(GpuError::Allocation("shader"))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let ptr = source.as_ptr().cast::<GLchar>();
        let len = GLint::try_from(source.len()).unwrap_or(GLint::MAX);
        unsafe { gl::ShaderSource(shader.get(), 1, &ptr, &len) };
    }

    fn compile_shader(&self, shader: ShaderId) {
        unsafe { gl::CompileShader(shader.get()) };
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        let mut status = GLint::from(gl::FALSE);
        unsafe { gl::GetShaderiv(shader.get(), gl::COMPILE_STATUS, &mut status) };
        status == GLint::from(gl::TRUE)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        info_log(shader.get(), gl::GetShaderiv, gl::GetShaderInfoLog)
    }

    fn delete_shader(&self, shader: ShaderId) {
        unsafe { gl::DeleteShader(shader.get()) };
    }

    fn create_program(&self) -> Result<ProgramId, GpuError> {
        let id = unsafe { gl::CreateProgram() };
        NonZeroU32::new(id)
            .map(ProgramId)
            .ok_or(GpuError::Allocation("program"))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::AttachShader(program.get(), shader.get()) };
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::DetachShader(program.get(), shader.get()) };
    }

    fn link_program(&self, program: ProgramId) {
        unsafe { gl::LinkProgram(program.get()) };
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        let mut status = GLint::from(gl::FALSE);
        unsafe { gl::GetProgramiv(program.get(), gl::LINK_STATUS, &mut status) };
        status == GLint::from(gl::TRUE)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        info_log(program.get(), gl::GetProgramiv, gl::GetProgramInfoLog)
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe { gl::DeleteProgram(program.get()) };
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe { gl::UseProgram(program.map_or(0, ProgramId::get)) };
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetUniformLocation(program.get(), name.as_ptr()) };
        (location >= 0).then_some(UniformLocation(location))
    }

    fn uniform_1_i32(&self, location: UniformLocation, value: i32) {
        unsafe { gl::Uniform1i(location.0, value) };
    }

    fn uniform_3_f32(&self, location: UniformLocation, value: [f32; 3]) {
        unsafe { gl::Uniform3fv(location.0, 1, value.as_ptr()) };
    }

    fn uniform_matrix_3_f32(&self, location: UniformLocation, value: &[f32; 9]) {
        unsafe { gl::UniformMatrix3fv(location.0, 1, gl::FALSE, value.as_ptr()) };
    }

    fn uniform_matrix_4_f32(&self, location: UniformLocation, value: &[f32; 16]) {
        unsafe { gl::UniformMatrix4fv(location.0, 1, gl::FALSE, value.as_ptr()) };
    }

    fn active_subroutine_uniform_locations(&self, program: ProgramId, stage: ShaderStage) -> usize {
        if !self.tier.supports_subroutines() {
            return 0;
        }
        let mut count: GLint = 0;
        unsafe {
            gl::GetProgramStageiv(
                program.get(),
                stage_enum(stage),
                gl::ACTIVE_SUBROUTINE_UNIFORM_LOCATIONS,
                &mut count,
            );
        }
        usize::try_from(count).unwrap_or(0)
    }

    fn subroutine_index(&self, program: ProgramId, stage: ShaderStage, name: &str) -> Option<u32> {
        if !self.tier.supports_subroutines() {
            return None;
        }
        let name = CString::new(name).ok()?;
        let index =
            unsafe { gl::GetSubroutineIndex(program.get(), stage_enum(stage), name.as_ptr()) };
        (index != gl::INVALID_INDEX).then_some(index)
    }

    fn uniform_subroutines(&self, stage: ShaderStage, indices: &[u32]) {
        if !self.tier.supports_subroutines() {
            tracing::trace!("subroutines unsupported on this tier");
            return;
        }
        unsafe {
            gl::UniformSubroutinesuiv(
                stage_enum(stage),
                saturating_sizei(indices.len()),
                indices.as_ptr(),
            );
        }
    }

    fn create_buffer(&self) -> Result<BufferId, GpuError> {
        generate("buffer", gl::GenBuffers).map(BufferId)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        unsafe { gl::BindBuffer(buffer_target(target), buffer.map_or(0, BufferId::get)) };
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        unsafe {
            gl::BufferData(
                buffer_target(target),
                data.len() as GLsizeiptr,
                data.as_ptr().cast(),
                gl::STATIC_DRAW,
            );
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        unsafe { gl::DeleteBuffers(1, &buffer.get()) };
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, GpuError> {
        generate("vertex array", gl::GenVertexArrays).map(VertexArrayId)
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        unsafe { gl::BindVertexArray(vertex_array.map_or(0, VertexArrayId::get)) };
    }

    fn vertex_attribute(&self, attribute: VertexAttribute) {
        unsafe {
            gl::EnableVertexAttribArray(attribute.location);
            gl::VertexAttribPointer(
                attribute.location,
                attribute.components as GLint,
                gl::FLOAT,
                gl::FALSE,
                attribute.stride as GLsizei,
                attribute.offset as usize as *const c_void,
            );
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        unsafe { gl::DeleteVertexArrays(1, &vertex_array.get()) };
    }

    fn create_texture(&self) -> Result<TextureId, GpuError> {
        generate("texture", gl::GenTextures).map(TextureId)
    }

    fn active_texture(&self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureId>) {
        unsafe { gl::BindTexture(texture_target(target), texture.map_or(0, TextureId::get)) };
    }

    fn tex_image_cube_face(&self, face: CubeFace, width: u32, height: u32, rgba: &[u8]) {
        unsafe {
            gl::TexImage2D(
                gl::TEXTURE_CUBE_MAP_POSITIVE_X + face.layer(),
                0,
                gl::RGBA8 as GLint,
                width as GLsizei,
                height as GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                rgba.as_ptr().cast(),
            );
        }
    }

    fn tex_parameter(&self, target: TextureTarget, parameter: TextureParameter) {
        let (name, value) = texture_parameter(parameter);
        unsafe { gl::TexParameteri(texture_target(target), name, value as GLint) };
    }

    fn delete_texture(&self, texture: TextureId) {
        unsafe { gl::DeleteTextures(1, &texture.get()) };
    }

    fn viewport(&self, viewport: Viewport) {
        unsafe {
            gl::Viewport(
                viewport.x,
                viewport.y,
                viewport.width as GLsizei,
                viewport.height as GLsizei,
            );
        }
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { gl::ClearColor(r, g, b, a) };
    }

    fn clear_color_and_depth(&self) {
        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT) };
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        let cap = match capability {
            Capability::DepthTest => gl::DEPTH_TEST,
            Capability::Blend => gl::BLEND,
        };
        unsafe {
            if enabled {
                gl::Enable(cap);
            } else {
                gl::Disable(cap);
            }
        }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { gl::BlendFunc(blend_factor(src), blend_factor(dst)) };
    }

    fn depth_func(&self, func: DepthFunc) {
        let func = match func {
            DepthFunc::Less => gl::LESS,
            DepthFunc::LessEqual => gl::LEQUAL,
        };
        unsafe { gl::DepthFunc(func) };
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        if !self.tier.supports_polygon_mode() {
            tracing::trace!(?mode, "polygon mode unsupported on this tier");
            return;
        }
        let mode = match mode {
            PolygonMode::Fill => gl::FILL,
            PolygonMode::Line => gl::LINE,
        };
        unsafe { gl::PolygonMode(gl::FRONT_AND_BACK, mode) };
    }

    fn draw_elements(&self, index_count: usize) {
        unsafe {
            gl::DrawElements(
                gl::TRIANGLES,
                saturating_sizei(index_count),
                gl::UNSIGNED_INT,
                std::ptr::null(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_parameters_map_to_gl_enums() {
        assert_eq!(
            texture_parameter(TextureParameter::WrapR(TextureWrap::ClampToEdge)),
            (gl::TEXTURE_WRAP_R, gl::CLAMP_TO_EDGE)
        );
        assert_eq!(
            texture_parameter(TextureParameter::MinFilter(TextureFilter::Linear)),
            (gl::TEXTURE_MIN_FILTER, gl::LINEAR)
        );
    }

    #[test]
    fn cube_faces_map_to_consecutive_targets() {
        let targets: Vec<GLenum> = CubeFace::ALL
            .iter()
            .map(|f| gl::TEXTURE_CUBE_MAP_POSITIVE_X + f.layer())
            .collect();
        assert_eq!(targets[1], gl::TEXTURE_CUBE_MAP_NEGATIVE_X);
        assert_eq!(targets[5], gl::TEXTURE_CUBE_MAP_NEGATIVE_Z);
    }

    #[test]
    fn oversized_counts_saturate() {
        assert_eq!(saturating_sizei(usize::MAX), GLsizei::MAX);
        assert_eq!(saturating_sizei(36), 36);
    }
}
