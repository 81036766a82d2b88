//! # Camera Rig
//!
//! Fixed, named camera placements around a normalized scene and the view
//! transforms built from them.
//!
//! ## Coordinate Convention
//! Scenes are glTF Y-up. The four side views orbit in the horizontal plane
//! with a vertical (+Y) up-hint. The top and bottom views look straight down
//! and up the Y axis, so a vertical hint would be parallel to their viewing
//! axis; they use horizontal hints instead:
//!
//! | view   | eye          | up-hint     |
//! |--------|--------------|-------------|
//! | front  | (0, 0, +R)   | (0, 1, 0)   |
//! | back   | (0, 0, -R)   | (0, 1, 0)   |
//! | left   | (-R, 0, 0)   | (0, 1, 0)   |
//! | right  | (+R, 0, 0)   | (0, 1, 0)   |
//! | top    | (0, +R, 0)   | (0, 0, -1)  |
//! | bottom | (0, -R, 0)   | (0, 0, +1)  |
//!
//! With these hints the top view is a plan view (the object's front edge at the
//! bottom of the image) and the bottom view shows the front edge at the top.
//! Neither is mirrored: every transform built here is a proper rotation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{Mat3, Mat4, Mat4Ext, Vec3};
use crate::render::primitives::Camera;

/// Smallest accepted `|normalize(target - eye) x normalize(up)|`
///
/// Below this the side vector of the look-at basis is numerically unreliable.
pub const MIN_UP_CROSS_MAGNITUDE: f32 = 1e-3;

/// A view whose camera basis cannot be constructed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegenerateViewError {
    /// Eye and target coincide, so there is no viewing axis
    #[error("view '{view}': eye and target coincide")]
    CoincidentEyeTarget {
        /// View name (empty for anonymous transforms)
        view: String,
    },

    /// The up-hint is (anti)parallel to the viewing axis
    #[error("view '{view}': up-hint is parallel to the viewing axis (|forward x up| = {cross_magnitude:.2e})")]
    ParallelUpHint {
        /// View name (empty for anonymous transforms)
        view: String,
        /// Magnitude of the normalized cross product
        cross_magnitude: f32,
    },

    /// Eye, target or up-hint contains NaN or infinity
    #[error("view '{view}': non-finite camera placement")]
    NonFinite {
        /// View name (empty for anonymous transforms)
        view: String,
    },
}

impl DegenerateViewError {
    /// Attach a view name to an error produced by an anonymous transform
    #[must_use]
    pub fn named(self, name: &str) -> Self {
        match self {
            Self::CoincidentEyeTarget { .. } => Self::CoincidentEyeTarget { view: name.to_string() },
            Self::ParallelUpHint { cross_magnitude, .. } => Self::ParallelUpHint {
                view: name.to_string(),
                cross_magnitude,
            },
            Self::NonFinite { .. } => Self::NonFinite { view: name.to_string() },
        }
    }

    /// Name of the offending view
    pub fn view(&self) -> &str {
        match self {
            Self::CoincidentEyeTarget { view } | Self::ParallelUpHint { view, .. } | Self::NonFinite { view } => view,
        }
    }
}

bitflags::bitflags! {
    /// Subset of the canonical view catalogue
    ///
    /// Selection never changes order: views always come back in catalogue order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewSet: u8 {
        /// Camera on +Z
        const FRONT = 1 << 0;
        /// Camera on -Z
        const BACK = 1 << 1;
        /// Camera on -X
        const LEFT = 1 << 2;
        /// Camera on +X
        const RIGHT = 1 << 3;
        /// Camera on +Y looking down
        const TOP = 1 << 4;
        /// Camera on -Y looking up
        const BOTTOM = 1 << 5;
        /// The four side views
        const SIDES = Self::FRONT.bits() | Self::BACK.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

impl ViewSet {
    /// Parse a list of canonical view names (case-insensitive)
    ///
    /// Returns the first unknown name as the error.
    pub fn from_names<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |set, name| {
            let name = name.as_ref().trim();
            CANONICAL_CATALOGUE
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(name))
                .map(|entry| set | entry.flag)
                .ok_or_else(|| name.to_string())
        })
    }

    /// Canonical names in catalogue order
    pub fn names(self) -> Vec<&'static str> {
        CANONICAL_CATALOGUE
            .iter()
            .filter(|entry| self.contains(entry.flag))
            .map(|entry| entry.name)
            .collect()
    }
}

struct CatalogueEntry {
    name: &'static str,
    flag: ViewSet,
    direction: [f32; 3],
    up_hint: [f32; 3],
}

const CANONICAL_CATALOGUE: [CatalogueEntry; 6] = [
    CatalogueEntry { name: "front", flag: ViewSet::FRONT, direction: [0.0, 0.0, 1.0], up_hint: [0.0, 1.0, 0.0] },
    CatalogueEntry { name: "back", flag: ViewSet::BACK, direction: [0.0, 0.0, -1.0], up_hint: [0.0, 1.0, 0.0] },
    CatalogueEntry { name: "left", flag: ViewSet::LEFT, direction: [-1.0, 0.0, 0.0], up_hint: [0.0, 1.0, 0.0] },
    CatalogueEntry { name: "right", flag: ViewSet::RIGHT, direction: [1.0, 0.0, 0.0], up_hint: [0.0, 1.0, 0.0] },
    CatalogueEntry { name: "top", flag: ViewSet::TOP, direction: [0.0, 1.0, 0.0], up_hint: [0.0, 0.0, -1.0] },
    CatalogueEntry { name: "bottom", flag: ViewSet::BOTTOM, direction: [0.0, -1.0, 0.0], up_hint: [0.0, 0.0, 1.0] },
];

/// Named camera placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    /// View name; also the output file stem (`<name>.png`)
    pub name: String,
    /// Camera position
    pub eye: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
    /// Roll reference; must not be parallel to `target - eye`
    pub up: Vec3,
}

impl ViewSpec {
    /// Create a view
    pub fn new(name: impl Into<String>, eye: Vec3, target: Vec3, up: Vec3) -> Self {
        Self { name: name.into(), eye, target, up }
    }

    /// Check that a camera basis can be built for this view
    pub fn validate(&self) -> Result<(), DegenerateViewError> {
        check_placement(self.eye, self.target, self.up).map_err(|e| e.named(&self.name))
    }

    /// World-to-camera view transform
    pub fn view_transform(&self) -> Result<Mat4, DegenerateViewError> {
        build_view_transform(self.eye, self.target, self.up).map_err(|e| e.named(&self.name))
    }

    /// Camera-to-world pose (translation = eye)
    pub fn camera_pose(&self) -> Result<Mat4, DegenerateViewError> {
        camera_pose(self.eye, self.target, self.up).map_err(|e| e.named(&self.name))
    }

    /// Perspective camera placed at this view
    pub fn camera(&self, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Camera {
        Camera::perspective(self.eye, fov_degrees, aspect, near, far).look_at(self.target, self.up)
    }

    /// Unit viewing direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize()
    }
}

fn check_placement(eye: Vec3, target: Vec3, up_hint: Vec3) -> Result<(), DegenerateViewError> {
    let finite = |v: &Vec3| v.iter().all(|c| c.is_finite());
    if !(finite(&eye) && finite(&target) && finite(&up_hint)) {
        return Err(DegenerateViewError::NonFinite { view: String::new() });
    }

    let axis = target - eye;
    let Some(forward) = axis.try_normalize(f32::EPSILON) else {
        return Err(DegenerateViewError::CoincidentEyeTarget { view: String::new() });
    };

    let cross_magnitude = up_hint
        .try_normalize(f32::EPSILON)
        .map_or(0.0, |up| forward.cross(&up).norm());
    if cross_magnitude < MIN_UP_CROSS_MAGNITUDE {
        return Err(DegenerateViewError::ParallelUpHint { view: String::new(), cross_magnitude });
    }

    Ok(())
}

/// Build the world-to-camera view transform for a placement
///
/// `forward = normalize(target - eye)`, `side = normalize(forward x up_hint)`,
/// `true_up = side x forward`. The rotation block has rows
/// `[side; true_up; -forward]` and the translation column is `-R * eye`,
/// so the eye maps to the camera-space origin. The inverse of this matrix is
/// [`camera_pose`], whose translation is `eye`.
///
/// Placements whose up-hint is parallel to the viewing axis are rejected
/// rather than producing a NaN basis.
pub fn build_view_transform(eye: Vec3, target: Vec3, up_hint: Vec3) -> Result<Mat4, DegenerateViewError> {
    check_placement(eye, target, up_hint)?;
    Ok(Mat4::look_at(eye, target, up_hint))
}

/// Camera-to-world transform for a placement
///
/// Columns of the rotation block are `side`, `true_up` and `-forward`;
/// translation is `eye`.
pub fn camera_pose(eye: Vec3, target: Vec3, up_hint: Vec3) -> Result<Mat4, DegenerateViewError> {
    let view = build_view_transform(eye, target, up_hint)?;
    let rotation: Mat3 = view.fixed_view::<3, 3>(0, 0).transpose();

    let mut pose = Mat4::identity();
    pose.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&eye);
    Ok(pose)
}

/// The six canonical views at distance `radius` from the origin, in catalogue order
pub fn canonical_views(radius: f32) -> Vec<ViewSpec> {
    canonical_views_for(ViewSet::all(), radius)
}

/// A subset of the canonical views, in catalogue order
pub fn canonical_views_for(selection: ViewSet, radius: f32) -> Vec<ViewSpec> {
    CANONICAL_CATALOGUE
        .iter()
        .filter(|entry| selection.contains(entry.flag))
        .map(|entry| {
            ViewSpec::new(
                entry.name,
                Vec3::from(entry.direction) * radius,
                Vec3::zeros(),
                Vec3::from(entry.up_hint),
            )
        })
        .collect()
}

/// Validate every view of a catalogue, stopping at the first defect
pub fn validate_catalogue(views: &[ViewSpec]) -> Result<(), DegenerateViewError> {
    views.iter().try_for_each(ViewSpec::validate)
}

/// Camera distance that frames a sphere of `bounding_radius`
///
/// `distance_factor * bounding_radius`, raised if needed so the sphere fits
/// inside the narrower of the two fields of view with a small margin.
pub fn framing_distance(bounding_radius: f32, fov_y_radians: f32, aspect: f32, distance_factor: f32) -> f32 {
    let half_fov_y = fov_y_radians * 0.5;
    let half_fov_x = (half_fov_y.tan() * aspect).atan();
    let limiting = half_fov_y.min(half_fov_x);
    let fit = bounding_radius / limiting.sin() * 1.05;
    (bounding_radius * distance_factor).max(fit)
}
