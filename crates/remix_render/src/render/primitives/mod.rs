//! Core rendering primitives
//!
//! Backend-agnostic data: geometry, materials, textures and the camera.

pub mod camera;
pub mod mesh;

pub use camera::Camera;
pub use mesh::{Mesh, Vertex, Material, MaterialGroup, Texture};
