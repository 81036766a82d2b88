//! Backend abstraction trait for the rendering system
//!
//! A renderer owns a small scene graph: the imported mesh, any number of
//! lights and at most one active camera. Nodes are addressed by generational
//! handles, so a handle to a removed camera never aliases its replacement.

use image::RgbaImage;

use crate::foundation::collections::NodeKey;
use crate::foundation::math::Vec3;
use crate::render::{Camera, Light, LightingEnvironment, Mesh, RenderResult};

/// Handle to a node owned by a renderer
pub type NodeHandle = NodeKey;

/// Scene graph node
#[derive(Debug, Clone)]
pub enum SceneNode {
    /// Imported geometry
    Mesh(Mesh),
    /// Light source
    Light(Light),
    /// Viewpoint; at most one per renderer
    Camera(Camera),
}

impl SceneNode {
    /// Short kind name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "mesh",
            Self::Light(_) => "light",
            Self::Camera(_) => "camera",
        }
    }
}

/// Offscreen rendering backend
///
/// The multi-view loop imports the scene once, adds the light rig once, then
/// for each view attaches a camera, captures, and removes the camera again.
pub trait Renderer {
    /// Output resolution (width, height) in pixels
    fn resolution(&self) -> (u32, u32);

    /// Add geometry to the scene
    fn import_scene(&mut self, mesh: Mesh) -> RenderResult<NodeHandle>;

    /// Add a light to the scene
    fn add_light(&mut self, light: Light) -> RenderResult<NodeHandle>;

    /// Set the ambient term added to every lit surface
    fn set_ambient(&mut self, color: Vec3, intensity: f32);

    /// Attach the active camera
    ///
    /// Fails with [`RenderError::CameraAlreadyAttached`](crate::render::RenderError::CameraAlreadyAttached)
    /// while another camera is still attached.
    fn attach_camera(&mut self, camera: Camera) -> RenderResult<NodeHandle>;

    /// Remove a node (mesh, light or camera)
    fn remove_node(&mut self, handle: NodeHandle) -> RenderResult<()>;

    /// Render the scene through the active camera
    fn capture(&mut self) -> RenderResult<RgbaImage>;

    /// Whether geometry is unlit unless explicit lights are added
    ///
    /// True for every shipped backend: materials carry no emissive or
    /// image-based lighting of their own.
    fn requires_light_rig(&self) -> bool {
        true
    }

    /// Install a whole lighting environment, returning the light handles
    fn add_lighting(&mut self, environment: &LightingEnvironment) -> RenderResult<Vec<NodeHandle>> {
        self.set_ambient(environment.ambient_color, environment.ambient_intensity);
        environment
            .lights
            .iter()
            .map(|light| self.add_light(light.clone()))
            .collect()
    }
}
