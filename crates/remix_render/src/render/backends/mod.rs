//! Backend implementations for the render module
//!
//! Currently only the CPU rasteriser is shipped; other backends implement
//! [`Renderer`](crate::render::Renderer) the same way.

/// Software rendering backend implementation
#[cfg(feature = "software")]
pub mod software;
