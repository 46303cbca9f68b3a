//! OpenGL graphics context via glow
//!
//! Native objects are interned in per-resource tables keyed by the `u64`
//! inside each typed handle, so callers never touch raw GL names. Stale
//! handles (already deleted) are ignored, matching GL's own behavior for
//! stale names.
//!
//! The wrapped [`glow::Context`] must stay current on the calling thread
//! for the lifetime of this value; confining all calls to one render
//! thread is the caller's contract.

use crate::context::traits::{ContextError, ContextResult, GraphicsContext};
use crate::context::types::*;
use glow::HasContext;
use parking_lot::Mutex;
use std::collections::HashMap;

type GlShader = <glow::Context as HasContext>::Shader;
type GlProgram = <glow::Context as HasContext>::Program;
type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlUniformLocation = <glow::Context as HasContext>::UniformLocation;

struct ResourceTables<Sh, Pr, Bu, Lo> {
    next_id: u64,
    stages: HashMap<u64, Sh>,
    programs: HashMap<u64, Pr>,
    buffers: HashMap<u64, Bu>,
    /// Interned uniform locations, tagged with the id of the owning program
    locations: HashMap<u64, (u64, Lo)>,
}

impl<Sh, Pr, Bu, Lo> Default for ResourceTables<Sh, Pr, Bu, Lo> {
    fn default() -> Self {
        Self {
            next_id: 0,
            stages: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            locations: HashMap::new(),
        }
    }
}

impl<Sh, Pr, Bu, Lo> ResourceTables<Sh, Pr, Bu, Lo> {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Remove a program and every location interned from it. Locations
    /// only stay valid as long as their program exists, so keeping them
    /// past this point would grow the table unboundedly across relinks.
    fn remove_program(&mut self, id: u64) -> Option<Pr> {
        self.locations.retain(|_, entry| entry.0 != id);
        self.programs.remove(&id)
    }
}

type GlowTables = ResourceTables<GlShader, GlProgram, GlBuffer, GlUniformLocation>;

/// [`GraphicsContext`] backed by a real OpenGL context
pub struct GlowContext {
    gl: glow::Context,
    tables: Mutex<GlowTables>,
}

impl StageKind {
    fn gl_enum(&self) -> u32 {
        match self {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl GlowContext {
    /// Wrap an already-created glow context
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            tables: Mutex::new(GlowTables::default()),
        }
    }

    /// Load function pointers from a windowing library's `get_proc_address`.
    ///
    /// # Safety
    /// The matching GL context must be current on this thread and must
    /// outlive the returned value.
    pub unsafe fn from_loader(
        loader: impl FnMut(&str) -> *const std::os::raw::c_void,
    ) -> Self {
        Self::new(unsafe { glow::Context::from_loader_function(loader) })
    }

    /// Native program object behind a handle, for callers that need to
    /// issue their own GL calls against it
    pub fn native_program(&self, program: ProgramHandle) -> Option<GlProgram> {
        self.tables.lock().programs.get(&program.0).copied()
    }

    /// Native uniform location behind a resolved handle
    pub fn native_uniform_location(&self, location: UniformLocation) -> Option<GlUniformLocation> {
        self.tables
            .lock()
            .locations
            .get(&location.0)
            .map(|entry| entry.1.clone())
    }

    fn stage(&self, stage: StageHandle) -> Option<GlShader> {
        self.tables.lock().stages.get(&stage.0).copied()
    }

    fn program(&self, program: ProgramHandle) -> Option<GlProgram> {
        self.tables.lock().programs.get(&program.0).copied()
    }
}

impl GraphicsContext for GlowContext {
    fn create_stage(&self, kind: StageKind) -> ContextResult<StageHandle> {
        let shader = unsafe { self.gl.create_shader(kind.gl_enum()) }
            .map_err(ContextError::StageCreationFailed)?;
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.stages.insert(id, shader);
        Ok(StageHandle(id))
    }

    fn stage_source(&self, stage: StageHandle, source: &str) {
        if let Some(shader) = self.stage(stage) {
            unsafe { self.gl.shader_source(shader, source) };
        }
    }

    fn compile_stage(&self, stage: StageHandle) {
        if let Some(shader) = self.stage(stage) {
            unsafe { self.gl.compile_shader(shader) };
        }
    }

    fn stage_compile_status(&self, stage: StageHandle) -> bool {
        match self.stage(stage) {
            Some(shader) => unsafe { self.gl.get_shader_compile_status(shader) },
            None => false,
        }
    }

    fn stage_compile_log(&self, stage: StageHandle) -> String {
        match self.stage(stage) {
            Some(shader) => unsafe { self.gl.get_shader_info_log(shader) },
            None => String::new(),
        }
    }

    fn delete_stage(&self, stage: StageHandle) {
        if let Some(shader) = self.tables.lock().stages.remove(&stage.0) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&self) -> ContextResult<ProgramHandle> {
        let program =
            unsafe { self.gl.create_program() }.map_err(ContextError::ProgramCreationFailed)?;
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.programs.insert(id, program);
        Ok(ProgramHandle(id))
    }

    fn attach_stage(&self, program: ProgramHandle, stage: StageHandle) {
        if let (Some(program), Some(shader)) = (self.program(program), self.stage(stage)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn bind_attribute_location(&self, program: ProgramHandle, attribute: VertexAttribute) {
        if let Some(program) = self.program(program) {
            unsafe {
                self.gl
                    .bind_attrib_location(program, attribute.location(), attribute.gl_name())
            };
        }
    }

    fn link_program(&self, program: ProgramHandle) {
        if let Some(program) = self.program(program) {
            unsafe { self.gl.link_program(program) };
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        match self.program(program) {
            Some(program) => unsafe { self.gl.get_program_link_status(program) },
            None => false,
        }
    }

    fn program_link_log(&self, program: ProgramHandle) -> String {
        match self.program(program) {
            Some(program) => unsafe { self.gl.get_program_info_log(program) },
            None => String::new(),
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        if let Some(program) = self.tables.lock().remove_program(program.0) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let program = self.program(program)?;
        unsafe { self.gl.get_uniform_block_index(program, name) }
    }

    fn set_uniform_block_binding(&self, program: ProgramHandle, block_index: u32, binding: u32) {
        if let Some(program) = self.program(program) {
            unsafe { self.gl.uniform_block_binding(program, block_index, binding) };
        }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let native = self.program(program)?;
        let location = unsafe { self.gl.get_uniform_location(native, name) }?;
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.locations.insert(id, (program.0, location));
        Some(UniformLocation(id))
    }

    fn create_buffer(&self) -> ContextResult<BufferHandle> {
        let buffer =
            unsafe { self.gl.create_buffer() }.map_err(ContextError::BufferCreationFailed)?;
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&self, buffer: BufferHandle, data: &[u8]) {
        let buffer = match self.tables.lock().buffers.get(&buffer.0).copied() {
            Some(buffer) => buffer,
            None => return,
        };
        unsafe {
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::UNIFORM_BUFFER, data, glow::DYNAMIC_DRAW);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        if let Some(buffer) = self.tables.lock().buffers.remove(&buffer.0) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn set_active_program(&self, program: Option<ProgramHandle>) {
        let native = program.and_then(|handle| self.program(handle));
        unsafe { self.gl.use_program(native) };
    }
}
