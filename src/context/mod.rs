//! Graphics-context abstraction layer
//!
//! Provides the [`GraphicsContext`] trait plus the backends that implement
//! it: [`GlowContext`] over a real OpenGL context, and [`HeadlessContext`]
//! for tests and driver-less tooling.

pub mod glow_backend;
pub mod headless;
pub mod traits;
pub mod types;

pub use glow_backend::GlowContext;
pub use headless::HeadlessContext;
pub use traits::*;
pub use types::*;
