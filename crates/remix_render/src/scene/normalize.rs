//! Scene normalization
//!
//! Every loaded mesh is moved so its bounding-box centre sits at the world
//! origin. The camera rig places all views around the origin, so without this
//! step an asset modelled far from its own origin would fall out of frame.

use std::path::Path;

use crate::assets::{AssetLoadError, AssetResult, GltfLoader};
use crate::foundation::math::Vec3;
use crate::render::Mesh;

use super::BoundingVolume;

/// Record of what normalization did to a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Bounding-box centre before centring
    pub source_center: Vec3,
    /// Uniform scale applied after centring (1.0 unless rescaled)
    pub scale: f32,
    /// Bounds of the normalized mesh
    pub bounds: BoundingVolume,
}

impl Normalization {
    /// Bounding radius of the normalized mesh
    pub fn radius(&self) -> f32 {
        self.bounds.radius()
    }
}

/// Centre `mesh` on the origin, optionally rescaling it to unit bounding radius
///
/// Centring is unconditional. Rescaling is skipped for meshes whose extent is
/// zero (a single point), which have no meaningful size.
pub fn normalize(mesh: &mut Mesh, rescale_to_unit: bool) -> AssetResult<Normalization> {
    let source = BoundingVolume::from_mesh(mesh).ok_or(AssetLoadError::EmptyScene)?;
    let source_center = source.centroid();

    mesh.translate(-source_center);
    let mut bounds = source.translated(-source_center);

    let mut scale = 1.0;
    let radius = bounds.radius();
    if rescale_to_unit && radius > f32::EPSILON {
        scale = 1.0 / radius;
        mesh.scale(scale);
        bounds = bounds.scaled(scale);
    }

    log::debug!(
        "Normalized mesh: source centre {:?}, scale {}, radius {}",
        source_center,
        scale,
        bounds.radius()
    );

    Ok(Normalization { source_center, scale, bounds })
}

/// Load a scene and centre it on the origin
pub fn load_and_normalize<P: AsRef<Path>>(path: P) -> AssetResult<(Mesh, BoundingVolume)> {
    let (mesh, normalization) = load_and_normalize_with(path, false)?;
    Ok((mesh, normalization.bounds))
}

/// Load a scene and normalize it with explicit options
pub fn load_and_normalize_with<P: AsRef<Path>>(path: P, rescale_to_unit: bool) -> AssetResult<(Mesh, Normalization)> {
    let mut mesh = GltfLoader::load(path)?;
    let normalization = normalize(&mut mesh, rescale_to_unit)?;
    Ok((mesh, normalization))
}
