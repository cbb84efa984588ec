//! Recording graphics device.
//!
//! [`HeadlessApi`] implements [`GraphicsApi`] without a GPU. It tracks object
//! lifetimes, fixed-function state, uniform values and every state-changing
//! call, and it runs a small GLSL checker so shader compile and link failures
//! behave like a driver's. Misuse that a real driver would flag (drawing with
//! no program, uploading to an unknown location) is collected in
//! [`HeadlessApi::errors`] instead of panicking.

use crate::device::{
    BlendFactor, BufferId, BufferTarget, Capability, DepthFunc, GpuError, GraphicsApi,
    PolygonMode, ProgramId, ShaderId, ShaderStage, TextureId, TextureParameter, TextureTarget,
    UniformLocation, VertexArrayId, VertexAttribute, Viewport,
};
use meshview_assets::CubeFace;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Buffer,
    VertexArray,
    Texture,
    Shader,
    Program,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::VertexArray => "vertex array",
            Self::Texture => "texture",
            Self::Shader => "shader",
            Self::Program => "program",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Vec3([f32; 3]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

/// Fixed-function state and bindings that draws depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterState {
    pub depth_test: bool,
    pub depth_func: DepthFunc,
    pub blend: bool,
    pub blend_func: (BlendFactor, BlendFactor),
    pub polygon_mode: PolygonMode,
    pub vertex_array: Option<VertexArrayId>,
    pub cube_map: Option<TextureId>,
    pub active_texture: u32,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_func: DepthFunc::Less,
            blend: false,
            blend_func: (BlendFactor::One, BlendFactor::Zero),
            polygon_mode: PolygonMode::Fill,
            vertex_array: None,
            cube_map: None,
            active_texture: 0,
        }
    }
}

/// A state-changing call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Viewport(Viewport),
    ClearColor([f32; 4]),
    Clear,
    Capability(Capability, bool),
    BlendFunc(BlendFactor, BlendFactor),
    DepthFunc(DepthFunc),
    PolygonMode(PolygonMode),
    UseProgram(Option<ProgramId>),
    Uniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    Subroutines {
        stage: ShaderStage,
        indices: Vec<u32>,
    },
    BindVertexArray(Option<VertexArrayId>),
    ActiveTexture(u32),
    BindTexture(Option<TextureId>),
    DrawElements {
        index_count: usize,
    },
}

/// Snapshot of the state a draw call was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Position of the draw in [`HeadlessApi::commands`].
    pub command_index: usize,
    pub program: Option<ProgramId>,
    pub vertex_array: Option<VertexArrayId>,
    pub index_count: usize,
    pub depth_test: bool,
    pub depth_func: DepthFunc,
    pub polygon_mode: PolygonMode,
    pub cube_map: Option<TextureId>,
    pub active_texture: u32,
}

#[derive(Debug, Default)]
struct Declarations {
    uniforms: Vec<String>,
    /// Subroutine uniforms in declaration order, which is slot order.
    subroutine_uniforms: Vec<String>,
    subroutines: Vec<String>,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
    declarations: Declarations,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    /// Index is the uniform location.
    locations: Vec<String>,
    declared: Vec<String>,
    subroutine_uniforms: HashMap<ShaderStage, Vec<String>>,
    subroutines: HashMap<ShaderStage, Vec<String>>,
    selected: HashMap<ShaderStage, Vec<u32>>,
    values: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    allocations: usize,
    fail_after: Option<usize>,
    fail_next_link: Option<String>,
    live: BTreeMap<u32, ObjectKind>,
    released: usize,
    double_releases: Vec<(ObjectKind, u32)>,
    shaders: HashMap<u32, ShaderRecord>,
    programs: HashMap<u32, ProgramRecord>,
    cube_faces: HashMap<u32, Vec<CubeFace>>,
    raster: RasterState,
    buffers: HashMap<BufferTarget, BufferId>,
    current_program: Option<ProgramId>,
    commands: Vec<Command>,
    draws: Vec<DrawCall>,
    errors: Vec<String>,
}

impl State {
    fn allocate(&mut self, kind: ObjectKind) -> Result<NonZeroU32, GpuError> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(GpuError::Allocation(kind.name()));
            }
            *remaining -= 1;
        }
        let id = NonZeroU32::MIN.saturating_add(self.next_id);
        self.next_id += 1;
        self.allocations += 1;
        self.live.insert(id.get(), kind);
        Ok(id)
    }

    fn release(&mut self, kind: ObjectKind, id: u32) -> bool {
        if self.live.get(&id) == Some(&kind) {
            self.live.remove(&id);
            self.released += 1;
            true
        } else {
            self.double_releases.push((kind, id));
            self.errors.push(format!("{} {id} released twice or never created", kind.name()));
            false
        }
    }

    fn is_live(&self, kind: ObjectKind, id: u32) -> bool {
        self.live.get(&id) == Some(&kind)
    }

    fn current_program_mut(&mut self) -> Option<&mut ProgramRecord> {
        let id = self.current_program?;
        self.programs.get_mut(&id.get())
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current_program else {
            self.errors.push("uniform upload with no program in use".into());
            return;
        };
        let Some(record) = self.programs.get_mut(&program.get()) else {
            self.errors.push(format!("program {} in use was deleted", program.get()));
            return;
        };
        let Some(name) = usize::try_from(location.0)
            .ok()
            .and_then(|index| record.locations.get(index))
            .cloned()
        else {
            self.errors.push(format!("invalid uniform location {}", location.0));
            return;
        };
        record.values.insert(name.clone(), value);
        self.commands.push(Command::Uniform {
            program,
            name,
            value,
        });
    }
}

/// In-memory [`GraphicsApi`] that records everything.
#[derive(Debug, Default)]
pub struct HeadlessApi {
    state: RefCell<State>,
}

impl HeadlessApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `count` more allocations succeed, then fail every later one.
    pub fn fail_allocations_after(&self, count: usize) {
        self.state.borrow_mut().fail_after = Some(count);
    }

    /// Make the next link fail with `log`.
    pub fn fail_next_link(&self, log: impl Into<String>) {
        self.state.borrow_mut().fail_next_link = Some(log.into());
    }

    /// Successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.state.borrow().allocations
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.values().filter(|k| **k == kind).count()
    }

    pub fn released_count(&self) -> usize {
        self.state.borrow().released
    }

    pub fn double_releases(&self) -> Vec<(ObjectKind, u32)> {
        self.state.borrow().double_releases.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    /// Forget recorded commands and draws. Object and GL state is kept.
    pub fn clear_commands(&self) {
        let mut state = self.state.borrow_mut();
        state.commands.clear();
        state.draws.clear();
    }

    pub fn raster_state(&self) -> RasterState {
        self.state.borrow().raster
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current_program
    }

    /// Last value uploaded to `name` in `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        state.programs.get(&program.get())?.values.get(name).copied()
    }

    /// Subroutine names selected for `stage` of the program in use.
    pub fn selected_subroutines(&self, stage: ShaderStage) -> Vec<String> {
        let state = self.state.borrow();
        let Some(record) = state
            .current_program
            .and_then(|id| state.programs.get(&id.get()))
        else {
            return Vec::new();
        };
        let names = record.subroutines.get(&stage);
        record
            .selected
            .get(&stage)
            .into_iter()
            .flatten()
            .filter_map(|&i| names.and_then(|n| n.get(i as usize)).cloned())
            .collect()
    }

    /// Cube faces uploaded to `texture`, in upload order.
    pub fn texture_faces(&self, texture: TextureId) -> Vec<CubeFace> {
        self.state
            .borrow()
            .cube_faces
            .get(&texture.get())
            .cloned()
            .unwrap_or_default()
    }

    /// Misuse a driver would have reported.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }
}

impl GraphicsApi for HeadlessApi {
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, GpuError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate(ObjectKind::Shader)?;
        state.shaders.insert(
            id.get(),
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
                declarations: Declarations::default(),
            },
        );
        Ok(ShaderId(id))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        if let Some(record) = self.state.borrow_mut().shaders.get_mut(&shader.get()) {
            record.source = source.to_owned();
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        let Some(record) = state.shaders.get_mut(&shader.get()) else {
            return;
        };
        match check_syntax(&record.source) {
            Ok(()) => {
                record.compiled = true;
                record.log.clear();
                record.declarations = scan_declarations(&record.source);
            }
            Err(log) => {
                record.compiled = false;
                record.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader.get())
            .is_some_and(|r| r.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader.get())
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        if state.release(ObjectKind::Shader, shader.get()) {
            state.shaders.remove(&shader.get());
        }
    }

    fn create_program(&self) -> Result<ProgramId, GpuError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate(ObjectKind::Program)?;
        state.programs.insert(id.get(), ProgramRecord::default());
        Ok(ProgramId(id))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        if !state.is_live(ObjectKind::Shader, shader.get()) {
            state.errors.push(format!("attaching unknown shader {}", shader.get()));
            return;
        }
        if let Some(record) = state.programs.get_mut(&program.get()) {
            record.attached.push(shader.get());
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let Some(record) = self.state.borrow_mut().programs.get_mut(&program.get()) {
            record.attached.retain(|&s| s != shader.get());
        }
    }

    fn link_program(&self, program: ProgramId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let forced = state.fail_next_link.take();
        let Some(record) = state.programs.get_mut(&program.get()) else {
            return;
        };

        let stages: Vec<&ShaderRecord> = record
            .attached
            .iter()
            .filter_map(|id| state.shaders.get(id))
            .filter(|s| s.compiled)
            .collect();
        let has = |stage| stages.iter().filter(|s| s.stage == stage).count() == 1;
        if let Some(log) = forced {
            record.linked = false;
            record.log = log;
            return;
        }
        if !(has(ShaderStage::Vertex) && has(ShaderStage::Fragment)) {
            record.linked = false;
            record.log = "error: program needs one compiled vertex and one compiled fragment shader"
                .into();
            return;
        }

        record.declared.clear();
        record.subroutine_uniforms.clear();
        record.subroutines.clear();
        for shader in &stages {
            let decls = &shader.declarations;
            for name in &decls.uniforms {
                if !record.declared.contains(name) {
                    record.declared.push(name.clone());
                }
            }
            if !decls.subroutine_uniforms.is_empty() {
                record
                    .subroutine_uniforms
                    .insert(shader.stage, decls.subroutine_uniforms.clone());
                record
                    .subroutines
                    .insert(shader.stage, decls.subroutines.clone());
            }
        }
        record.locations = record.declared.clone();
        record.linked = true;
        record.log.clear();
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program.get())
            .is_some_and(|r| r.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.state
            .borrow()
            .programs
            .get(&program.get())
            .map(|r| r.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        if state.release(ObjectKind::Program, program.get()) {
            state.programs.remove(&program.get());
            if state.current_program == Some(program) {
                state.current_program = None;
            }
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = program {
            let linked = state.programs.get(&id.get()).is_some_and(|r| r.linked);
            if !linked {
                state.errors.push(format!("using unlinked program {}", id.get()));
                return;
            }
        }
        state.current_program = program;
        // Subroutine selections do not survive a program bind.
        if let Some(record) = state.current_program_mut() {
            record.selected.clear();
        }
        state.commands.push(Command::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        let record = state.programs.get_mut(&program.get())?;
        if !record.linked {
            return None;
        }
        if let Some(index) = record.locations.iter().position(|n| n == name) {
            return i32::try_from(index).ok().map(UniformLocation);
        }
        // Struct members and array elements resolve through their declaration.
        let member_of_declared = record.declared.iter().any(|base| {
            name.strip_prefix(base.as_str())
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        });
        if !member_of_declared {
            return None;
        }
        record.locations.push(name.to_owned());
        i32::try_from(record.locations.len() - 1).ok().map(UniformLocation)
    }

    fn uniform_1_i32(&self, location: UniformLocation, value: i32) {
        self.state
            .borrow_mut()
            .upload_uniform(location, UniformValue::Int(value));
    }

    fn uniform_3_f32(&self, location: UniformLocation, value: [f32; 3]) {
        self.state
            .borrow_mut()
            .upload_uniform(location, UniformValue::Vec3(value));
    }

    fn uniform_matrix_3_f32(&self, location: UniformLocation, value: &[f32; 9]) {
        self.state
            .borrow_mut()
            .upload_uniform(location, UniformValue::Mat3(*value));
    }

    fn uniform_matrix_4_f32(&self, location: UniformLocation, value: &[f32; 16]) {
        self.state
            .borrow_mut()
            .upload_uniform(location, UniformValue::Mat4(*value));
    }

    fn active_subroutine_uniform_locations(&self, program: ProgramId, stage: ShaderStage) -> usize {
        self.state
            .borrow()
            .programs
            .get(&program.get())
            .and_then(|r| r.subroutine_uniforms.get(&stage))
            .map_or(0, Vec::len)
    }

    fn subroutine_index(&self, program: ProgramId, stage: ShaderStage, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let names = state.programs.get(&program.get())?.subroutines.get(&stage)?;
        names
            .iter()
            .position(|n| n == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    fn uniform_subroutines(&self, stage: ShaderStage, indices: &[u32]) {
        let mut state = self.state.borrow_mut();
        let result = match state.current_program_mut() {
            None => Err("selecting subroutines with no program in use".to_string()),
            Some(record) => {
                let slots = record.subroutine_uniforms.get(&stage).map_or(0, Vec::len);
                let available = record.subroutines.get(&stage).map_or(0, Vec::len);
                if indices.len() != slots {
                    Err(format!("{stage} stage has {slots} subroutine uniforms, got {}", indices.len()))
                } else if let Some(bad) = indices.iter().find(|&&i| i as usize >= available) {
                    Err(format!("subroutine index {bad} out of range"))
                } else {
                    record.selected.insert(stage, indices.to_vec());
                    Ok(())
                }
            }
        };
        match result {
            Ok(()) => state.commands.push(Command::Subroutines {
                stage,
                indices: indices.to_vec(),
            }),
            Err(message) => state.errors.push(message),
        }
    }

    fn create_buffer(&self) -> Result<BufferId, GpuError> {
        self.state
            .borrow_mut()
            .allocate(ObjectKind::Buffer)
            .map(BufferId)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(id) if !state.is_live(ObjectKind::Buffer, id.get()) => {
                state.errors.push(format!("binding unknown buffer {}", id.get()));
            }
            Some(id) => {
                state.buffers.insert(target, id);
            }
            None => {
                state.buffers.remove(&target);
            }
        }
    }

    fn buffer_data(&self, target: BufferTarget, _data: &[u8]) {
        let mut state = self.state.borrow_mut();
        if !state.buffers.contains_key(&target) {
            state.errors.push(format!("buffer data with no {target:?} buffer bound"));
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.release(ObjectKind::Buffer, buffer.get()) {
            state.buffers.retain(|_, b| *b != buffer);
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, GpuError> {
        self.state
            .borrow_mut()
            .allocate(ObjectKind::VertexArray)
            .map(VertexArrayId)
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = vertex_array {
            if !state.is_live(ObjectKind::VertexArray, id.get()) {
                state.errors.push(format!("binding unknown vertex array {}", id.get()));
                return;
            }
        }
        state.raster.vertex_array = vertex_array;
        state.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn vertex_attribute(&self, attribute: VertexAttribute) {
        let mut state = self.state.borrow_mut();
        if state.raster.vertex_array.is_none() || !state.buffers.contains_key(&BufferTarget::Array)
        {
            state.errors.push(format!(
                "vertex attribute {} set without a bound vertex array and array buffer",
                attribute.location
            ));
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        if state.release(ObjectKind::VertexArray, vertex_array.get())
            && state.raster.vertex_array == Some(vertex_array)
        {
            state.raster.vertex_array = None;
        }
    }

    fn create_texture(&self) -> Result<TextureId, GpuError> {
        self.state
            .borrow_mut()
            .allocate(ObjectKind::Texture)
            .map(TextureId)
    }

    fn active_texture(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        state.raster.active_texture = unit;
        state.commands.push(Command::ActiveTexture(unit));
    }

    fn bind_texture(&self, _target: TextureTarget, texture: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = texture {
            if !state.is_live(ObjectKind::Texture, id.get()) {
                state.errors.push(format!("binding unknown texture {}", id.get()));
                return;
            }
        }
        state.raster.cube_map = texture;
        state.commands.push(Command::BindTexture(texture));
    }

    fn tex_image_cube_face(&self, face: CubeFace, width: u32, height: u32, rgba: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(texture) = state.raster.cube_map else {
            state.errors.push(format!("uploading {face} face with no cubemap bound"));
            return;
        };
        if rgba.len() != width as usize * height as usize * 4 {
            state.errors.push(format!("{face} face pixel data does not match {width}x{height}"));
        }
        state.cube_faces.entry(texture.get()).or_default().push(face);
    }

    fn tex_parameter(&self, _target: TextureTarget, _parameter: TextureParameter) {
        let mut state = self.state.borrow_mut();
        if state.raster.cube_map.is_none() {
            state.errors.push("texture parameter with no cubemap bound".into());
        }
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if state.release(ObjectKind::Texture, texture.get()) {
            state.cube_faces.remove(&texture.get());
            if state.raster.cube_map == Some(texture) {
                state.raster.cube_map = None;
            }
        }
    }

    fn viewport(&self, viewport: Viewport) {
        self.state
            .borrow_mut()
            .commands
            .push(Command::Viewport(viewport));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.state.borrow_mut().commands.push(Command::ClearColor(rgba));
    }

    fn clear_color_and_depth(&self) {
        self.state.borrow_mut().commands.push(Command::Clear);
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        let mut state = self.state.borrow_mut();
        match capability {
            Capability::DepthTest => state.raster.depth_test = enabled,
            Capability::Blend => state.raster.blend = enabled,
        }
        state.commands.push(Command::Capability(capability, enabled));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        let mut state = self.state.borrow_mut();
        state.raster.blend_func = (src, dst);
        state.commands.push(Command::BlendFunc(src, dst));
    }

    fn depth_func(&self, func: DepthFunc) {
        let mut state = self.state.borrow_mut();
        state.raster.depth_func = func;
        state.commands.push(Command::DepthFunc(func));
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        let mut state = self.state.borrow_mut();
        state.raster.polygon_mode = mode;
        state.commands.push(Command::PolygonMode(mode));
    }

    fn draw_elements(&self, index_count: usize) {
        let mut state = self.state.borrow_mut();
        if state.current_program.is_none() {
            state.errors.push("draw with no program in use".into());
        }
        if state.raster.vertex_array.is_none() {
            state.errors.push("draw with no vertex array bound".into());
        }
        let raster = state.raster;
        let call = DrawCall {
            command_index: state.commands.len(),
            program: state.current_program,
            vertex_array: raster.vertex_array,
            index_count,
            depth_test: raster.depth_test,
            depth_func: raster.depth_func,
            polygon_mode: raster.polygon_mode,
            cube_map: raster.cube_map,
            active_texture: raster.active_texture,
        };
        state.draws.push(call);
        state.commands.push(Command::DrawElements { index_count });
    }
}

/// Minimal driver-style syntax check: a leading `#version`, balanced
/// brackets and a `main` function.
fn check_syntax(source: &str) -> Result<(), String> {
    let first = source.lines().map(str::trim).find(|line| !line.is_empty());
    if !first.is_some_and(|line| line.starts_with("#version")) {
        return Err("0:1(1): error: missing #version directive".into());
    }

    let mut open = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let code = line.split("//").next().unwrap_or_default();
        for ch in code.chars() {
            let expected = match ch {
                '(' | '{' | '[' => {
                    open.push(ch);
                    continue;
                }
                ')' => '(',
                '}' => '{',
                ']' => '[',
                _ => continue,
            };
            if open.pop() != Some(expected) {
                return Err(format!("0:{}(1): error: syntax error, unexpected `{ch}`", number + 1));
            }
        }
    }
    if let Some(ch) = open.last() {
        return Err(format!(
            "0:{}(1): error: syntax error, unexpected end of file, unclosed `{ch}`",
            source.lines().count()
        ));
    }
    if !source.contains("void main") {
        return Err("error: no function with name 'main'".into());
    }
    Ok(())
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for line in source.lines() {
        let code = line.split("//").next().unwrap_or_default();
        let mut start = None;
        for (i, ch) in code.char_indices() {
            if ch.is_alphanumeric() || ch == '_' {
                start.get_or_insert(i);
                continue;
            }
            if let Some(s) = start.take() {
                tokens.push(&code[s..i]);
            }
            if !ch.is_whitespace() {
                tokens.push(&code[i..i + ch.len_utf8()]);
            }
        }
        if let Some(s) = start {
            tokens.push(&code[s..]);
        }
    }
    tokens
}

fn scan_declarations(source: &str) -> Declarations {
    let tokens = tokenize(source);
    let mut decls = Declarations::default();
    for (i, &token) in tokens.iter().enumerate() {
        match token {
            "uniform" => {
                let mut j = i + 1;
                while matches!(tokens.get(j), Some(&("lowp" | "mediump" | "highp"))) {
                    j += 1;
                }
                let Some(name) = tokens.get(j + 1) else {
                    continue;
                };
                if i > 0 && tokens[i - 1] == "subroutine" {
                    decls.subroutine_uniforms.push((*name).to_owned());
                } else {
                    decls.uniforms.push((*name).to_owned());
                }
            }
            // subroutine(Type) ret Name(
            "subroutine" if tokens.get(i + 1) == Some(&"(") => {
                let Some(close) = tokens[i..].iter().position(|t| *t == ")") else {
                    continue;
                };
                let k = i + close;
                if tokens.get(k + 3) == Some(&"(") {
                    decls.subroutines.push(tokens[k + 2].to_owned());
                }
            }
            _ => {}
        }
    }
    decls
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBROUTINE_FRAG: &str = "#version 430 core
subroutine vec3 LightTerm(vec3 n);
layout(location = 0) subroutine uniform LightTerm u_first;
layout(location = 1) subroutine uniform LightTerm u_second;
uniform mediump vec3 u_color;
uniform Light u_light; // struct
subroutine(LightTerm) vec3 On(vec3 n) { return n; }
subroutine(LightTerm) vec3 Off(vec3 n) { return vec3(0.0); }
out vec4 color;
void main() { color = vec4(u_color + u_first(vec3(1.0)), 1.0); }
";

    #[test]
    fn scanner_finds_uniforms_and_subroutines() {
        let decls = scan_declarations(SUBROUTINE_FRAG);
        assert_eq!(decls.uniforms, vec!["u_color", "u_light"]);
        assert_eq!(decls.subroutine_uniforms, vec!["u_first", "u_second"]);
        assert_eq!(decls.subroutines, vec!["On", "Off"]);
    }

    #[test]
    fn syntax_checks() {
        assert!(check_syntax(SUBROUTINE_FRAG).is_ok());
        assert!(check_syntax("void main() {}").unwrap_err().contains("#version"));
        assert!(check_syntax("#version 300 es\nvoid main() {").unwrap_err().contains("unclosed"));
        assert!(check_syntax("#version 300 es\nvoid main() { ) }").unwrap_err().contains("unexpected"));
        assert!(check_syntax("#version 300 es\nvoid helper() {}").unwrap_err().contains("main"));
    }

    #[test]
    fn double_release_is_recorded() {
        let api = HeadlessApi::new();
        let buffer = api.create_buffer().unwrap();
        api.delete_buffer(buffer);
        api.delete_buffer(buffer);
        assert_eq!(api.double_releases(), vec![(ObjectKind::Buffer, buffer.get())]);
        assert_eq!(api.released_count(), 1);
    }

    #[test]
    fn draw_without_program_is_an_error() {
        let api = HeadlessApi::new();
        api.draw_elements(3);
        assert_eq!(api.errors().len(), 2);
        assert_eq!(api.draw_calls().len(), 1);
    }

    #[test]
    fn use_program_resets_subroutine_selection() {
        let api = HeadlessApi::new();
        let vs = api.create_shader(ShaderStage::Vertex).unwrap();
        api.shader_source(vs, "#version 430 core\nvoid main() {}");
        api.compile_shader(vs);
        let fs = api.create_shader(ShaderStage::Fragment).unwrap();
        api.shader_source(fs, SUBROUTINE_FRAG);
        api.compile_shader(fs);
        let program = api.create_program().unwrap();
        api.attach_shader(program, vs);
        api.attach_shader(program, fs);
        api.link_program(program);
        assert!(api.program_link_status(program));

        api.use_program(Some(program));
        api.uniform_subroutines(ShaderStage::Fragment, &[1, 0]);
        assert_eq!(api.selected_subroutines(ShaderStage::Fragment), vec!["Off", "On"]);
        api.use_program(Some(program));
        assert!(api.selected_subroutines(ShaderStage::Fragment).is_empty());
        assert!(api.errors().is_empty());
    }
}
