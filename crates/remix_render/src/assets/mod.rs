//! Asset loading
//!
//! Turns a glTF file into the single merged [`Mesh`](crate::render::Mesh)
//! the renderer draws.

pub mod gltf_loader;
pub mod image_loader;

#[cfg(test)]
pub mod test_fixtures;

pub use gltf_loader::GltfLoader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a scene asset
///
/// Every variant is fatal to a render job: no views can be produced.
#[derive(Error, Debug)]
pub enum AssetLoadError {
    /// The path does not exist
    #[error("Scene file not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The extension is not a glTF container
    #[error("Unsupported scene format: {0} (expected .glb or .gltf)")]
    UnsupportedFormat(PathBuf),

    /// The file is not valid glTF
    #[error("Failed to parse glTF: {0}")]
    Parse(#[from] gltf::Error),

    /// A primitive references data that does not exist
    #[error("Invalid geometry in mesh {mesh} primitive {primitive}: {reason}")]
    InvalidGeometry {
        /// Mesh index in the document
        mesh: usize,
        /// Primitive index within the mesh
        primitive: usize,
        /// What is wrong
        reason: String,
    },

    /// An embedded image could not be decoded
    #[error("Image decode error: {0}")]
    Image(String),

    /// The scene contains no drawable triangles
    #[error("Scene contains no triangle geometry")]
    EmptyScene,
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetLoadError>;
