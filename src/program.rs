//! Shader-program lifecycle
//!
//! [`ShaderProgram`] owns every native handle it creates: pending stage
//! objects, the linked program, and the per-program uniform buffer. The
//! lifecycle is compile stages → link → bind, with resolved uniform-block
//! and texture-sampler bindings available after a successful link.
//!
//! Teardown happens exactly once: call [`ShaderProgram::release`] when the
//! program is done. `Drop` runs the same cleanup as a leak-prevention
//! safety net, but its timing is whenever the value happens to be dropped,
//! which on a shared context may be outside the render thread's normal
//! sequencing. Explicit release is the primary contract.

use crate::context::traits::{ContextError, GraphicsContext};
use crate::context::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Shader lifecycle error type
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to compile {stage} stage:\n{log}")]
    Compile { stage: StageKind, log: String },
    #[error("Failed to link program:\n{log}")]
    Link { log: String },
    #[error("Program is not linked")]
    NotLinked,
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// A shader program: compiled stages, the linked program object, and the
/// bindings resolved from it.
///
/// Bad source and failed links are expected, recoverable conditions and
/// come back as `Err` with the native diagnostic log attached. Calling
/// [`link`](Self::link) without both required stages is a caller bug and
/// panics.
pub struct ShaderProgram<C: GraphicsContext> {
    name: String,
    ctx: Arc<C>,
    stages: HashMap<StageKind, StageHandle>,
    program: Option<ProgramHandle>,
    block_bindings: HashMap<UniformBlockId, u32>,
    texture_samplers: [Option<UniformLocation>; TEXTURE_SAMPLER_COUNT],
    ps_block_buffer: Option<BufferHandle>,
    disposed: bool,
}

impl<C: GraphicsContext> ShaderProgram<C> {
    pub fn new(ctx: Arc<C>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ctx,
            stages: HashMap::new(),
            program: None,
            block_bindings: HashMap::new(),
            texture_samplers: [None; TEXTURE_SAMPLER_COUNT],
            ps_block_buffer: None,
            disposed: false,
        }
    }

    /// Compile `source` as the given stage kind.
    ///
    /// Recompiling a kind that already has a pending stage deletes the old
    /// stage first with a warning; it usually means a forgotten link.
    /// On failure the compiler log is returned in the error; the failed
    /// stage stays allocated until it is superseded or torn down, so the
    /// caller may inspect state before retrying.
    pub fn compile_stage(&mut self, source: &str, kind: StageKind) -> Result<(), ShaderError> {
        if let Some(old) = self.stages.remove(&kind) {
            log::warn!(
                "shader \"{}\": {kind} stage compiled twice before linking, deleting the old stage",
                self.name
            );
            self.ctx.delete_stage(old);
        }

        let stage = self.ctx.create_stage(kind)?;
        // New native resource exists again; re-arm the drop cleanup in
        // case this instance was previously released.
        self.disposed = false;
        self.stages.insert(kind, stage);

        self.ctx.stage_source(stage, source);
        self.ctx.compile_stage(stage);

        if !self.ctx.stage_compile_status(stage) {
            let log = self.ctx.stage_compile_log(stage);
            log::error!(
                "shader \"{}\": failed to compile {kind} stage:\n{log}",
                self.name
            );
            return Err(ShaderError::Compile { stage: kind, log });
        }
        Ok(())
    }

    /// Link the pending vertex and fragment stages into a program.
    ///
    /// On success the stage handles are deleted (the program keeps its own
    /// copy of the compiled result), the well-known uniform blocks and the
    /// `Texture[i]` samplers are resolved, and the per-program uniform
    /// buffer is allocated. On failure the attempted program is discarded
    /// and the pending stages are retained for a recompile/relink.
    ///
    /// # Panics
    /// If either the vertex or the fragment stage has not been compiled.
    pub fn link(&mut self) -> Result<(), ShaderError> {
        if let Some(old) = self.program.take() {
            log::warn!(
                "shader \"{}\": link called on an already linked program, deleting the old program",
                self.name
            );
            self.ctx.delete_program(old);
            if let Some(buffer) = self.ps_block_buffer.take() {
                self.ctx.delete_buffer(buffer);
            }
            self.block_bindings.clear();
            self.texture_samplers = [None; TEXTURE_SAMPLER_COUNT];
        }

        let vertex = self.require_stage(StageKind::Vertex);
        let fragment = self.require_stage(StageKind::Fragment);

        let program = self.ctx.create_program()?;
        for attribute in VertexAttribute::ALL {
            self.ctx.bind_attribute_location(program, attribute);
        }
        self.ctx.attach_stage(program, vertex);
        self.ctx.attach_stage(program, fragment);
        self.ctx.link_program(program);

        if !self.ctx.program_link_status(program) {
            let log = self.ctx.program_link_log(program);
            self.ctx.delete_program(program);
            log::error!("shader \"{}\": failed to link:\n{log}", self.name);
            return Err(ShaderError::Link { log });
        }

        // The buffer is allocated before any state is committed: a failed
        // allocation leaves the instance unlinked, with its pending stages
        // intact for a relink.
        let ps_block_buffer = match self.ctx.create_buffer() {
            Ok(buffer) => buffer,
            Err(err) => {
                self.ctx.delete_program(program);
                return Err(err.into());
            }
        };

        for block in UniformBlockId::ALL {
            // A block the shader never declares is not an error, it just
            // stays unresolved.
            if let Some(index) = self.ctx.uniform_block_index(program, block.name()) {
                self.ctx.set_uniform_block_binding(program, index, block.binding());
                self.block_bindings.insert(block, index);
            }
        }
        for (unit, slot) in self.texture_samplers.iter_mut().enumerate() {
            *slot = self.ctx.uniform_location(program, &texture_sampler_name(unit));
        }

        // The linked program keeps its own copy of the compiled stages.
        for (_, stage) in self.stages.drain() {
            self.ctx.delete_stage(stage);
        }

        self.program = Some(program);
        self.ps_block_buffer = Some(ps_block_buffer);
        Ok(())
    }

    fn require_stage(&self, kind: StageKind) -> StageHandle {
        match self.stages.get(&kind) {
            Some(&stage) => stage,
            None => panic!(
                "shader \"{}\": link requires both a vertex and a fragment stage ({kind} is missing)",
                self.name
            ),
        }
    }

    /// Make this program the active one for subsequent draws.
    ///
    /// Defensive policy: binding an unlinked (or released) program returns
    /// [`ShaderError::NotLinked`] instead of handing the driver an invalid
    /// handle.
    pub fn bind(&self) -> Result<(), ShaderError> {
        let program = self.program.ok_or(ShaderError::NotLinked)?;
        self.ctx.set_active_program(Some(program));
        Ok(())
    }

    /// Upload a [`PixelShaderBlock`] payload into the per-program uniform
    /// buffer
    pub fn write_ps_block(&self, data: &PixelShaderBlock) -> Result<(), ShaderError> {
        let buffer = self.ps_block_buffer.ok_or(ShaderError::NotLinked)?;
        self.ctx.write_buffer(buffer, bytemuck::bytes_of(data));
        Ok(())
    }

    /// Free every native handle still held.
    ///
    /// Idempotent: safe to call any number of times and after a failure at
    /// any point of the compile/link sequence.
    pub fn release(&mut self) {
        if self.disposed {
            return;
        }
        for (_, stage) in self.stages.drain() {
            self.ctx.delete_stage(stage);
        }
        if let Some(buffer) = self.ps_block_buffer.take() {
            self.ctx.delete_buffer(buffer);
        }
        if let Some(program) = self.program.take() {
            self.ctx.delete_program(program);
        }
        self.block_bindings.clear();
        self.texture_samplers = [None; TEXTURE_SAMPLER_COUNT];
        self.disposed = true;
    }

    // Queries

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_linked(&self) -> bool {
        self.program.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a pending (compiled but unlinked) stage exists for `kind`
    pub fn has_stage(&self, kind: StageKind) -> bool {
        self.stages.contains_key(&kind)
    }

    pub fn program_handle(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Per-program uniform buffer backing the pixel-shader block
    pub fn ps_block_buffer(&self) -> Option<BufferHandle> {
        self.ps_block_buffer
    }

    /// Resolved block index; `None` before a link or when the shader does
    /// not declare the block
    pub fn uniform_block_binding(&self, block: UniformBlockId) -> Option<u32> {
        self.block_bindings.get(&block).copied()
    }

    /// Resolved `Texture[unit]` sampler location; `None` before a link or
    /// when the shader does not use that unit
    pub fn texture_sampler(&self, unit: usize) -> Option<UniformLocation> {
        self.texture_samplers.get(unit).copied().flatten()
    }
}

impl<C: GraphicsContext> Drop for ShaderProgram<C> {
    fn drop(&mut self) {
        if !self.disposed {
            log::debug!(
                "shader \"{}\" dropped without an explicit release, running fallback cleanup",
                self.name
            );
            self.release();
        }
    }
}

impl<C: GraphicsContext> std::fmt::Display for ShaderProgram<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
