//! Shader program lifecycle management
//!
//! This crate manages the full lifecycle of a GPU shader program: compile
//! stage sources, link them into an executable program, resolve the
//! well-known uniform-block and texture-sampler bindings, bind the program
//! for drawing, and release every native handle exactly once.
//!
//! The native API is abstracted behind the [`GraphicsContext`] trait, with
//! two backends:
//! - [`GlowContext`]: a real OpenGL context via `glow`
//! - [`HeadlessContext`]: an instrumented in-memory context for tests and
//!   headless tooling
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use shader_engine::{HeadlessContext, ShaderProgram, StageKind};
//!
//! let ctx = Arc::new(HeadlessContext::new());
//! let mut shader = ShaderProgram::new(ctx.clone(), "Basic");
//! shader.compile_stage("void main() {}", StageKind::Vertex)?;
//! shader.compile_stage("void main() {}", StageKind::Fragment)?;
//! shader.link()?;
//! shader.bind()?;
//! shader.release();
//! # Ok::<(), shader_engine::ShaderError>(())
//! ```
//!
//! All calls against one context must stay on one thread (the render
//! thread); the crate performs no cross-call locking of the context.

pub mod context;
pub mod program;

pub use context::{
    BufferHandle, ContextError, ContextResult, GlowContext, GraphicsContext, HeadlessContext,
    Light, LightBlock, PixelShaderBlock, ProgramHandle, StageHandle, StageKind, UniformBlockId,
    UniformLocation, VertexAttribute, MAX_LIGHTS, TEXTURE_SAMPLER_COUNT,
};
pub use program::{ShaderError, ShaderProgram};
