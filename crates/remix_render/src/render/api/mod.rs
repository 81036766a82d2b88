//! Public rendering API
//!
//! The backend trait the multi-view loop drives, and the scene node types it
//! manages.

pub mod render_backend;

pub use render_backend::{Renderer, NodeHandle, SceneNode};
