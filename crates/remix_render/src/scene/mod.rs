//! Scene preparation
//!
//! Bounding volumes and the normalization step that places every loaded
//! asset at the world origin before rendering.

pub mod bounds;
pub mod normalize;

pub use bounds::BoundingVolume;
pub use normalize::{Normalization, normalize, load_and_normalize, load_and_normalize_with};
