//! # Rendering System
//!
//! Offscreen rendering of one normalized mesh from a set of calibrated views.
//!
//! ## Architecture
//!
//! - **Renderer**: Backend trait owning the scene graph (mesh, lights, camera)
//!   and producing an RGBA image per capture
//! - **Camera Rig**: The six canonical views and their view transforms
//! - **Multi-view Loop**: Drives one renderer through every view and writes PNGs
//! - **Software Backend**: CPU rasteriser, the default backend
//!
//! The loop only ever talks to [`Renderer`], so tests can wrap a backend to
//! inject failures on a chosen view.

pub mod api;
pub mod primitives;
pub mod lighting;
pub mod views;
pub mod multiview;
pub mod analysis;

/// Renderer backend implementations
pub mod backends;

pub use api::{Renderer, NodeHandle, SceneNode};
pub use primitives::{Camera, Mesh, Vertex, Material, MaterialGroup, Texture};
pub use lighting::{Light, LightType, LightingEnvironment};

#[cfg(feature = "software")]
pub use backends::software::SoftwareRenderer;

/// Backend used by [`multiview::render_views`] when none is supplied
#[cfg(feature = "software")]
pub type DefaultRenderer = SoftwareRenderer;

/// Rendering system errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Typically an invalid resolution or a framebuffer that cannot be allocated.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A capture failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Scene resource creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A second camera was attached while one is already active
    #[error("A camera is already attached (node {0:?})")]
    CameraAlreadyAttached(NodeHandle),

    /// Capture was requested with no active camera
    #[error("No camera attached")]
    NoCamera,

    /// The handle does not name a node in this renderer
    #[error("Unknown scene node {0:?}")]
    UnknownNode(NodeHandle),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
