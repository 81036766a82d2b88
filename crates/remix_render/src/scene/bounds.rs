//! Axis-aligned bounding volumes

use crate::foundation::math::Vec3;
use crate::render::Mesh;

/// Axis-aligned box enclosing a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingVolume {
    /// Smallest box containing every point, or `None` for an empty set
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, p| {
            Some(match acc {
                Some(b) => Self { min: b.min.inf(&p), max: b.max.sup(&p) },
                None => Self { min: p, max: p },
            })
        })
    }

    /// Bounds of every vertex of `mesh`
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        Self::from_points(mesh.vertices.iter().map(crate::render::Vertex::position_vec))
    }

    /// Box centre
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the sphere through the box corners (half the diagonal)
    pub fn radius(&self) -> f32 {
        self.extent().norm() * 0.5
    }

    /// Box moved by `offset`
    #[must_use]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self { min: self.min + offset, max: self.max + offset }
    }

    /// Box scaled about the origin by a positive factor
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self { min: self.min * factor, max: self.max * factor }
    }
}
