//! Graphics-context abstraction
//!
//! [`GraphicsContext`] is the set of native primitives the shader-program
//! lifecycle consumes: stage compilation, program linking, uniform
//! resolution, buffers and the active-program slot. Backends implement it
//! over a real driver ([`GlowContext`](crate::context::GlowContext)) or in
//! memory ([`HeadlessContext`](crate::context::HeadlessContext)).
//!
//! All receivers are `&self`; backends guard their own handle tables.
//! The context itself is still single-owner state: callers must confine
//! all calls against one context to one thread, typically the render
//! thread. No cross-call locking is done here.

use crate::context::types::*;
use thiserror::Error;

/// Context error type
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to create shader stage: {0}")]
    StageCreationFailed(String),
    #[error("Failed to create program: {0}")]
    ProgramCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Context lost")]
    ContextLost,
}

pub type ContextResult<T> = Result<T, ContextError>;

/// Native graphics-context primitives consumed by
/// [`ShaderProgram`](crate::program::ShaderProgram).
///
/// Handles returned by the `create_*` methods are owned by the caller and
/// must be returned through the matching `delete_*` method exactly once.
/// Operations on a handle that was already deleted are silently ignored,
/// matching driver behavior for stale names.
pub trait GraphicsContext {
    // Stage objects

    /// Create a compilation unit for the given stage kind
    fn create_stage(&self, kind: StageKind) -> ContextResult<StageHandle>;

    /// Submit source text to a stage object
    fn stage_source(&self, stage: StageHandle, source: &str);

    /// Trigger synchronous compilation of a stage object
    fn compile_stage(&self, stage: StageHandle);

    /// Query whether the last compilation of this stage succeeded
    fn stage_compile_status(&self, stage: StageHandle) -> bool;

    /// Query the compiler diagnostic log for a stage object
    fn stage_compile_log(&self, stage: StageHandle) -> String;

    /// Delete a stage object
    fn delete_stage(&self, stage: StageHandle);

    // Programs

    /// Create an empty program object
    fn create_program(&self) -> ContextResult<ProgramHandle>;

    /// Attach a compiled stage to a program
    fn attach_stage(&self, program: ProgramHandle, stage: StageHandle);

    /// Bind a vertex attribute to its fixed location; takes effect at link
    fn bind_attribute_location(&self, program: ProgramHandle, attribute: VertexAttribute);

    /// Trigger synchronous linking of a program
    fn link_program(&self, program: ProgramHandle);

    /// Query whether the last link of this program succeeded
    fn program_link_status(&self, program: ProgramHandle) -> bool;

    /// Query the linker diagnostic log for a program
    fn program_link_log(&self, program: ProgramHandle) -> String;

    /// Delete a program object
    fn delete_program(&self, program: ProgramHandle);

    // Uniform resolution

    /// Resolve a uniform-block index by name; `None` if the linked program
    /// does not declare the block
    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Assign a binding slot to a resolved uniform block
    fn set_uniform_block_binding(&self, program: ProgramHandle, block_index: u32, binding: u32);

    /// Resolve a uniform location by name; `None` if the linked program
    /// does not declare (or has optimized away) the uniform
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    // Buffers

    /// Create a buffer object
    fn create_buffer(&self) -> ContextResult<BufferHandle>;

    /// Replace the contents of a buffer object
    fn write_buffer(&self, buffer: BufferHandle, data: &[u8]);

    /// Delete a buffer object
    fn delete_buffer(&self, buffer: BufferHandle);

    // Context state

    /// Set (or clear) the active program for subsequent draws
    fn set_active_program(&self, program: Option<ProgramHandle>);
}
