//! Compiled and linked shader programs.
//!
//! # Invariants
//! - A [`ShaderProgram`] only exists if both stages compiled and the program
//!   linked.
//! - Stage objects never outlive construction; the program object is released
//!   exactly once.

use crate::device::{GpuError, GraphicsApi, ProgramId, ShaderId, ShaderStage, UniformLocation};
use crate::handle::GpuResource;
use crate::tier::ShaderPaths;
use glam::{Mat3, Mat4, Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader {}: {source}", path.display())]
    Io {
        stage: ShaderStage,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {log}")]
    Link { log: String },
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("unknown {stage} subroutine `{name}`")]
    UnknownSubroutine { stage: ShaderStage, name: String },
    #[error("{stage} stage has {expected} subroutine uniforms, got {actual} names")]
    SubroutineCount {
        stage: ShaderStage,
        expected: usize,
        actual: usize,
    },
}

/// Values that can be uploaded to a uniform of the program in use.
pub trait Uniform {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation);
}

impl Uniform for bool {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_1_i32(location, i32::from(*self));
    }
}

impl Uniform for i32 {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_1_i32(location, *self);
    }
}

impl Uniform for Vec3 {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_3_f32(location, self.to_array());
    }
}

impl Uniform for [f32; 3] {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_3_f32(location, *self);
    }
}

impl Uniform for Mat3 {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_matrix_3_f32(location, &self.to_cols_array());
    }
}

impl Uniform for Mat4 {
    fn upload<A: GraphicsApi + ?Sized>(&self, api: &A, location: UniformLocation) {
        api.uniform_matrix_4_f32(location, &self.to_cols_array());
    }
}

/// A linked GPU program.
pub struct ShaderProgram<A: GraphicsApi> {
    program: GpuResource<A, ProgramId>,
    /// Resolved subroutine indices per stage, by function name.
    subroutines: HashMap<ShaderStage, HashMap<String, u32>>,
    /// Active subroutine-uniform slot count per stage.
    subroutine_slots: HashMap<ShaderStage, usize>,
    scratch: Vec<u32>,
}

impl<A: GraphicsApi> std::fmt::Debug for ShaderProgram<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("program", &self.handle())
            .field("subroutine_slots", &self.subroutine_slots)
            .finish_non_exhaustive()
    }
}

impl<A: GraphicsApi> ShaderProgram<A> {
    /// Compile both stages and link them.
    pub fn compile_and_link(
        api: &Rc<A>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(api, ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(api, ShaderStage::Fragment, fragment_source)?;
        let program = GpuResource::program(api)?;
        let id = program.handle();

        api.attach_shader(id, vertex.handle());
        api.attach_shader(id, fragment.handle());
        api.link_program(id);
        let linked = api.program_link_status(id);
        api.detach_shader(id, vertex.handle());
        api.detach_shader(id, fragment.handle());

        if !linked {
            let log = api.program_info_log(id);
            tracing::error!(%log, "shader program failed to link");
            return Err(ShaderError::Link { log });
        }

        tracing::debug!(program = id.get(), "linked shader program");
        Ok(Self {
            program,
            subroutines: HashMap::new(),
            subroutine_slots: HashMap::new(),
            scratch: Vec::new(),
        })
    }

    /// Read both stage sources from disk, then compile and link.
    pub fn from_files(
        api: &Rc<A>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex = read_source(ShaderStage::Vertex, vertex_path.as_ref())?;
        let fragment = read_source(ShaderStage::Fragment, fragment_path.as_ref())?;
        Self::compile_and_link(api, &vertex, &fragment)
    }

    pub fn from_paths(api: &Rc<A>, paths: &ShaderPaths) -> Result<Self, ShaderError> {
        Self::from_files(api, &paths.vertex, &paths.fragment)
    }

    pub fn handle(&self) -> ProgramId {
        self.program.handle()
    }

    /// Make this the program in use. Uniform uploads and subroutine
    /// selection apply to the program in use.
    pub fn use_program(&self) {
        self.program.api().use_program(Some(self.handle()));
    }

    /// Upload a uniform by name. Missing uniforms are ignored.
    pub fn set_uniform<U: Uniform>(&self, name: &str, value: U) {
        let api = self.program.api();
        match api.uniform_location(self.handle(), name) {
            Some(location) => value.upload(api, location),
            None => tracing::trace!(name, "uniform not active, skipping"),
        }
    }

    /// Select one subroutine per subroutine-uniform slot of `stage`.
    ///
    /// `names[i]` is bound to the subroutine uniform at location `i`, so the
    /// shader pins its locations with `layout(location = N)`.
    pub fn select_subroutines(
        &mut self,
        stage: ShaderStage,
        names: &[&str],
    ) -> Result<(), ShaderError> {
        let api = self.program.api();
        let id = self.program.handle();

        let expected = *self
            .subroutine_slots
            .entry(stage)
            .or_insert_with(|| api.active_subroutine_uniform_locations(id, stage));
        if names.len() != expected {
            return Err(ShaderError::SubroutineCount {
                stage,
                expected,
                actual: names.len(),
            });
        }

        let cache = self.subroutines.entry(stage).or_default();
        self.scratch.clear();
        for &name in names {
            let index = match cache.get(name) {
                Some(&index) => index,
                None => {
                    let index = api.subroutine_index(id, stage, name).ok_or_else(|| {
                        ShaderError::UnknownSubroutine {
                            stage,
                            name: name.to_owned(),
                        }
                    })?;
                    cache.insert(name.to_owned(), index);
                    index
                }
            };
            self.scratch.push(index);
        }
        api.uniform_subroutines(stage, &self.scratch);
        Ok(())
    }
}

fn read_source(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

fn compile_stage<A: GraphicsApi>(
    api: &Rc<A>,
    stage: ShaderStage,
    source: &str,
) -> Result<GpuResource<A, ShaderId>, ShaderError> {
    let shader = GpuResource::shader(api, stage)?;
    api.shader_source(shader.handle(), source);
    api.compile_shader(shader.handle());
    if !api.shader_compile_status(shader.handle()) {
        let log = api.shader_info_log(shader.handle());
        tracing::error!(%stage, %log, "shader failed to compile");
        return Err(ShaderError::Compile { stage, log });
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessApi, ObjectKind, UniformValue};

    const MODEL_VERT: &str = include_str!("../../../assets/shaders/model_gl4.vert.glsl");
    const MODEL_FRAG: &str = include_str!("../../../assets/shaders/model_gl4.frag.glsl");

    fn api() -> Rc<HeadlessApi> {
        Rc::new(HeadlessApi::new())
    }

    #[test]
    fn valid_sources_link() {
        let api = api();
        let program = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap();
        assert_eq!(api.live_count(ObjectKind::Program), 1);
        // Stage objects are gone once linking is done.
        assert_eq!(api.live_count(ObjectKind::Shader), 0);
        drop(program);
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn debug_shows_program_handle() {
        let api = api();
        let program = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap();
        let text = format!("{program:?}");
        assert!(text.starts_with("ShaderProgram"));
        assert!(text.contains(&format!("{:?}", program.handle())));
    }

    #[test]
    fn syntax_error_fails_with_stage_and_log() {
        let api = api();
        let broken = "#version 430 core\nvoid main() {\n";
        let err = ShaderProgram::compile_and_link(&api, MODEL_VERT, broken).unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert_eq!(api.live_objects(), 0);
        assert!(api.double_releases().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let api = api();
        let err = ShaderProgram::from_files(&api, "/nonexistent/a.vert", "/nonexistent/a.frag")
            .unwrap_err();
        assert!(matches!(err, ShaderError::Io { stage: ShaderStage::Vertex, .. }));
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn link_failure_releases_program() {
        let api = api();
        api.fail_next_link("error: varying mismatch");
        let err = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap_err();
        assert!(matches!(err, ShaderError::Link { log } if log.contains("varying")));
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn set_uniform_uploads_and_ignores_unknown_names() {
        let api = api();
        let program = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap();
        program.use_program();
        program.set_uniform("u_color", Vec3::new(1.0, 0.5, 0.25));
        program.set_uniform("u_light.direction", [0.0, -1.0, 0.0]);
        program.set_uniform("u_doesNotExist", Mat4::IDENTITY);

        assert_eq!(
            api.uniform(program.handle(), "u_color"),
            Some(UniformValue::Vec3([1.0, 0.5, 0.25]))
        );
        assert_eq!(
            api.uniform(program.handle(), "u_light.direction"),
            Some(UniformValue::Vec3([0.0, -1.0, 0.0]))
        );
        assert_eq!(api.uniform(program.handle(), "u_doesNotExist"), None);
        assert!(api.errors().is_empty());
    }

    #[test]
    fn subroutines_select_in_slot_order() {
        let api = api();
        let mut program = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap();
        program.use_program();
        program
            .select_subroutines(ShaderStage::Fragment, &["Disabled", "SpecularEnabled"])
            .unwrap();
        assert_eq!(
            api.selected_subroutines(ShaderStage::Fragment),
            vec!["Disabled".to_string(), "SpecularEnabled".to_string()]
        );
        // Second call hits the cache and still uploads.
        program
            .select_subroutines(ShaderStage::Fragment, &["DiffuseEnabled", "Disabled"])
            .unwrap();
        assert_eq!(
            api.selected_subroutines(ShaderStage::Fragment),
            vec!["DiffuseEnabled".to_string(), "Disabled".to_string()]
        );
    }

    #[test]
    fn model_shader_pins_subroutine_locations() {
        // Selection order maps onto these locations.
        for (location, uniform) in ["u_diffuseTerm", "u_specularTerm"].iter().enumerate() {
            let declaration =
                format!("layout(location = {location}) subroutine uniform LightTerm {uniform};");
            assert!(MODEL_FRAG.contains(&declaration), "missing {declaration}");
        }
    }

    #[test]
    fn subroutine_errors() {
        let api = api();
        let mut program = ShaderProgram::compile_and_link(&api, MODEL_VERT, MODEL_FRAG).unwrap();
        program.use_program();
        let err = program
            .select_subroutines(ShaderStage::Fragment, &["DiffuseEnabled"])
            .unwrap_err();
        assert!(matches!(
            err,
            ShaderError::SubroutineCount { expected: 2, actual: 1, .. }
        ));
        let err = program
            .select_subroutines(ShaderStage::Fragment, &["Bogus", "Disabled"])
            .unwrap_err();
        assert!(matches!(err, ShaderError::UnknownSubroutine { name, .. } if name == "Bogus"));
    }
}
