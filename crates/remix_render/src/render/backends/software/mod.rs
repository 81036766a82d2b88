//! CPU rasteriser backend
//!
//! Renders into an owned framebuffer with no window, display or GPU context,
//! so it runs unchanged on headless machines.

pub mod framebuffer;
pub mod raster;

use image::RgbaImage;

use crate::config::RenderConfig;
use crate::foundation::collections::HandleMap;
use crate::foundation::math::Vec3;
use crate::render::{
    Camera, Light, LightingEnvironment, Mesh, NodeHandle, RenderError, RenderResult, Renderer, SceneNode,
};

use self::framebuffer::Framebuffer;
use self::raster::{RasterStats, ShadingContext};

/// Software renderer
///
/// Owns the scene graph and one framebuffer sized to the output resolution.
/// The framebuffer is reused across captures.
pub struct SoftwareRenderer {
    nodes: HandleMap<SceneNode>,
    active_camera: Option<NodeHandle>,
    ambient_color: Vec3,
    ambient_intensity: f32,
    background: [u8; 4],
    framebuffer: Framebuffer,
    capture_count: u64,
}

impl SoftwareRenderer {
    /// Create a renderer with the given output size and clear colour
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> RenderResult<Self> {
        let framebuffer = Framebuffer::new(width, height)?;
        log::info!("Software renderer initialized at {}x{}", width, height);

        Ok(Self {
            nodes: HandleMap::with_key(),
            active_camera: None,
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.0,
            background,
            framebuffer,
            capture_count: 0,
        })
    }

    /// Create a renderer from render settings
    pub fn from_config(config: &RenderConfig) -> RenderResult<Self> {
        Self::new(config.width, config.height, config.background)
    }

    /// Look up a node
    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle)
    }

    /// Number of live nodes of every kind
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The attached camera, if any
    pub fn active_camera(&self) -> Option<&Camera> {
        match self.active_camera.and_then(|h| self.nodes.get(h)) {
            Some(SceneNode::Camera(camera)) => Some(camera),
            _ => None,
        }
    }

    /// Number of completed captures
    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    fn lighting(&self) -> LightingEnvironment {
        self.nodes
            .values()
            .filter_map(|node| match node {
                SceneNode::Light(light) => Some(light.clone()),
                _ => None,
            })
            .fold(
                LightingEnvironment::new().with_ambient(self.ambient_color, self.ambient_intensity),
                LightingEnvironment::add_light,
            )
    }
}

impl Renderer for SoftwareRenderer {
    fn resolution(&self) -> (u32, u32) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    fn import_scene(&mut self, mesh: Mesh) -> RenderResult<NodeHandle> {
        if mesh.is_empty() {
            return Err(RenderError::ResourceCreationFailed("mesh has no triangles".to_string()));
        }
        log::debug!(
            "Importing mesh: {} vertices, {} triangles, {} materials",
            mesh.vertices.len(),
            mesh.triangle_count(),
            mesh.materials.len()
        );
        Ok(self.nodes.insert(SceneNode::Mesh(mesh)))
    }

    fn add_light(&mut self, light: Light) -> RenderResult<NodeHandle> {
        if !light.intensity.is_finite() || light.intensity < 0.0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "invalid light intensity {}",
                light.intensity
            )));
        }
        log::trace!("Adding {:?} light at {:?}", light.light_type, light.position);
        Ok(self.nodes.insert(SceneNode::Light(light)))
    }

    fn set_ambient(&mut self, color: Vec3, intensity: f32) {
        self.ambient_color = color;
        self.ambient_intensity = intensity;
    }

    fn attach_camera(&mut self, camera: Camera) -> RenderResult<NodeHandle> {
        if let Some(existing) = self.active_camera {
            return Err(RenderError::CameraAlreadyAttached(existing));
        }
        log::trace!("Attaching camera at {:?}", camera.position);
        let handle = self.nodes.insert(SceneNode::Camera(camera));
        self.active_camera = Some(handle);
        Ok(handle)
    }

    fn remove_node(&mut self, handle: NodeHandle) -> RenderResult<()> {
        let node = self.nodes.remove(handle).ok_or(RenderError::UnknownNode(handle))?;
        if self.active_camera == Some(handle) {
            self.active_camera = None;
        }
        log::trace!("Removed {} node {:?}", node.kind(), handle);
        Ok(())
    }

    fn capture(&mut self) -> RenderResult<RgbaImage> {
        let camera = self.active_camera().cloned().ok_or(RenderError::NoCamera)?;
        if !camera.is_well_formed() {
            return Err(RenderError::RenderingFailed(format!(
                "camera at {:?} looking at {:?} cannot form a projection",
                camera.position, camera.target
            )));
        }

        let lighting = self.lighting();
        let ctx = ShadingContext {
            view_projection: camera.get_view_projection_matrix(),
            eye: camera.position,
            lighting: &lighting,
        };

        self.framebuffer.clear(self.background);
        let mut stats = RasterStats::default();
        for node in self.nodes.values() {
            if let SceneNode::Mesh(mesh) = node {
                stats += raster::draw_mesh(&mut self.framebuffer, mesh, &ctx);
            }
        }

        self.capture_count += 1;
        log::debug!(
            "Capture {}: {} triangles, {} rejected, {} fragments",
            self.capture_count,
            stats.triangles,
            stats.rejected,
            stats.fragments
        );
        self.framebuffer.to_image()
    }
}

impl Drop for SoftwareRenderer {
    fn drop(&mut self) {
        log::debug!(
            "Releasing software renderer ({} nodes, {} captures)",
            self.nodes.len(),
            self.capture_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_renderer() -> SoftwareRenderer {
        let mut renderer = SoftwareRenderer::new(64, 48, [255, 255, 255, 255]).unwrap();
        renderer.import_scene(Mesh::cube(Vec3::zeros(), 1.0)).unwrap();
        renderer
            .add_lighting(&LightingEnvironment::six_directional(3.0, 0.6, 0.25))
            .unwrap();
        renderer
    }

    fn camera_at(position: Vec3) -> Camera {
        Camera::perspective(position, 60.0, 64.0 / 48.0, 0.1, 20.0)
    }

    #[test]
    fn test_capture_requires_camera() {
        let mut renderer = cube_renderer();
        assert!(matches!(renderer.capture(), Err(RenderError::NoCamera)));
    }

    #[test]
    fn test_second_camera_is_rejected_until_first_is_removed() {
        let mut renderer = cube_renderer();
        let first = renderer.attach_camera(camera_at(Vec3::new(0.0, 0.0, 3.0))).unwrap();
        match renderer.attach_camera(camera_at(Vec3::new(3.0, 0.0, 0.0))) {
            Err(RenderError::CameraAlreadyAttached(handle)) => assert_eq!(handle, first),
            other => panic!("expected CameraAlreadyAttached, got {other:?}"),
        }

        renderer.remove_node(first).unwrap();
        assert!(renderer.active_camera().is_none());
        let second = renderer.attach_camera(camera_at(Vec3::new(3.0, 0.0, 0.0))).unwrap();
        assert_ne!(first, second);
        assert!(matches!(renderer.remove_node(first), Err(RenderError::UnknownNode(_))));
    }

    #[test]
    fn test_capture_draws_cube_on_background() {
        let mut renderer = cube_renderer();
        renderer.attach_camera(camera_at(Vec3::new(0.0, 0.0, 3.0))).unwrap();
        let image = renderer.capture().unwrap();

        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_ne!(image.get_pixel(32, 24).0, [255, 255, 255, 255]);
        assert_eq!(renderer.capture_count(), 1);
    }

    #[test]
    fn test_lights_persist_across_camera_swaps() {
        let mut renderer = cube_renderer();
        // mesh + six lights
        assert_eq!(renderer.node_count(), 7);

        for position in [Vec3::new(0.0, 0.0, 3.0), Vec3::new(-3.0, 0.0, 0.0)] {
            let camera = renderer.attach_camera(camera_at(position)).unwrap();
            renderer.capture().unwrap();
            renderer.remove_node(camera).unwrap();
        }
        assert_eq!(renderer.node_count(), 7);
        assert_eq!(renderer.lighting().lights.len(), 6);
    }

    #[test]
    fn test_degenerate_camera_fails_capture() {
        let mut renderer = cube_renderer();
        // Default +Y up hint is parallel to a straight-down view
        renderer.attach_camera(camera_at(Vec3::new(0.0, 3.0, 0.0))).unwrap();
        assert!(matches!(renderer.capture(), Err(RenderError::RenderingFailed(_))));
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut renderer = SoftwareRenderer::new(8, 8, [0; 4]).unwrap();
        assert!(matches!(
            renderer.import_scene(Mesh::default()),
            Err(RenderError::ResourceCreationFailed(_))
        ));
    }
}
