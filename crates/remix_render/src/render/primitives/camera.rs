//! # 3D Camera System
//!
//! Perspective camera used by the render loop. One camera is attached to a
//! renderer at a time; the rig in `render::views` decides where it goes.
//!
//! ## Matrix Chain
//! `clip = P × X × V × world`, where `V` is the right-handed look-at view
//! matrix, `X` flips view space into raster space (Y down, Z into the screen)
//! and `P` maps depth to [0, 1].

use crate::foundation::math::{Vec3, Mat4, Mat4Ext, utils};

/// 3D Camera for perspective projection
///
/// # Coordinate System
/// Uses standard right-handed Y-up coordinates in view space:
/// - X+ = Right
/// - Y+ = Up
/// - Z- = Forward (the camera looks down its negative Z axis)
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up hint for camera orientation; must not be parallel to the view direction
    pub up: Vec3,

    /// Vertical field of view angle in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera looking at the origin with a +Y up hint
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Configure camera to look at a specific point with custom up hint
    pub fn look_at(mut self, target: Vec3, up: Vec3) -> Self {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
        self
    }

    /// Unit vector from the camera position towards its target
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// View matrix (world to camera space)
    pub fn get_view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Perspective projection matrix
    pub fn get_projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined `P × X × V` matrix from world space to clip space
    pub fn get_view_projection_matrix(&self) -> Mat4 {
        self.get_projection_matrix() * Mat4::image_space_transform() * self.get_view_matrix()
    }

    /// True when every parameter can produce a finite, invertible projection
    pub fn is_well_formed(&self) -> bool {
        let view_dir = self.target - self.position;
        self.position.iter().all(|c| c.is_finite())
            && self.target.iter().all(|c| c.is_finite())
            && view_dir.norm() > f32::EPSILON
            && view_dir.normalize().cross(&self.up).norm() > 1e-4
            && self.fov > 0.0
            && self.fov < std::f32::consts::PI
            && self.aspect > 0.0
            && self.near > 0.0
            && self.far > self.near
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn front_camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 4.0 / 3.0, 0.1, 20.0)
    }

    #[test]
    fn test_target_projects_to_screen_centre() {
        let clip = front_camera().get_view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        assert!(clip.w > 0.0);
        assert!(clip.z / clip.w > 0.0 && clip.z / clip.w < 1.0);
    }

    #[test]
    fn test_world_up_maps_to_upper_half_of_image() {
        // Raster Y grows downwards, so a point above the target has negative NDC y
        let clip = front_camera().get_view_projection_matrix() * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn test_world_right_maps_to_right_half_of_image() {
        let clip = front_camera().get_view_projection_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(clip.x / clip.w > 0.0);
    }

    #[test]
    fn test_degenerate_up_is_not_well_formed() {
        let camera = Camera::perspective(Vec3::new(0.0, 5.0, 0.0), 60.0, 1.0, 0.1, 20.0);
        assert!(!camera.is_well_formed());
        let fixed = camera.look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        assert!(fixed.is_well_formed());
    }
}
