//! # Offscreen Render Loop
//!
//! Renders a normalized mesh from every requested view and writes one
//! `<view_name>.png` per view into an output directory.
//!
//! ## Session Lifecycle
//!
//! 1. Load and normalize the scene (failure aborts the job, nothing is written)
//! 2. Reject duplicate view names, create the output directory and remove
//!    canonical images this job does not render (failure aborts the job)
//! 3. Import the mesh and add the six-light rig, once
//! 4. Per view, in catalogue order: remove any stale `<name>.png`, attach the
//!    camera, capture, detach the camera, encode and write the PNG
//! 5. Drop the renderer, releasing its framebuffer
//!
//! A failure inside step 4 is recorded for that view only and the loop moves
//! on. Callers decide overall success by checking which files exist, see
//! [`outputs_present`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assets::AssetLoadError;
use crate::config::{ConfigError, RenderConfig};
use crate::foundation::math::utils;
use crate::render::analysis::{self, ViewAnalysis};
use crate::render::views::{self, DegenerateViewError, ViewSet, ViewSpec};
use crate::render::{LightingEnvironment, Mesh, RenderError, Renderer};
use crate::scene::{self, Normalization};

#[cfg(feature = "software")]
use crate::render::DefaultRenderer;

/// Radius used for framing when the normalized mesh has no extent
const MIN_FRAMING_RADIUS: f32 = 1e-3;

/// Output file or directory failure
#[derive(Error, Debug)]
pub enum WriteError {
    /// The output directory cannot be created
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The view name cannot be used as a file stem
    #[error("View name '{0}' is not a valid file name")]
    InvalidName(String),

    /// Two views of one job share a name, and so an output file
    #[error("View name '{0}' is used by more than one view")]
    DuplicateName(String),

    /// A previous job's file could not be removed
    #[error("Cannot remove stale output {path}: {source}")]
    RemoveStale {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding failed
    #[error("Cannot encode {path}: {source}")]
    Encode {
        /// Target file
        path: PathBuf,
        /// Encoder error
        #[source]
        source: image::ImageError,
    },

    /// Writing the encoded file failed
    #[error("Cannot write {path}: {source}")]
    Io {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single view; the remaining views are still attempted
#[derive(Error, Debug)]
pub enum ViewError {
    /// The view's camera basis cannot be built
    #[error(transparent)]
    Degenerate(#[from] DegenerateViewError),

    /// Camera attach or capture failed
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    /// The PNG could not be written
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Failure that prevents every view of a job
#[derive(Error, Debug)]
pub enum RenderJobError {
    /// The scene could not be loaded
    #[error("Asset load failed: {0}")]
    Asset(#[from] AssetLoadError),

    /// The output directory is unusable
    #[error("Output failed: {0}")]
    Write(#[from] WriteError),

    /// Render settings are invalid
    #[error("Invalid render configuration: {0}")]
    Config(#[from] ConfigError),

    /// The renderer could not be created or rejected the scene
    #[error("Renderer setup failed: {0}")]
    Renderer(#[from] RenderError),
}

/// Result of one view
#[derive(Debug)]
pub struct ViewOutcome {
    /// View name
    pub view_name: String,
    /// Where the image is (or would have been) written
    pub path: PathBuf,
    /// Success, or why this view has no file
    pub result: Result<(), ViewError>,
    /// Content statistics of the written image
    pub analysis: Option<ViewAnalysis>,
}

impl ViewOutcome {
    /// True when the image was written
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-view outcomes of a render job, in view order
#[derive(Debug)]
pub struct RenderReport {
    output_dir: PathBuf,
    outcomes: Vec<ViewOutcome>,
    normalization: Option<Normalization>,
}

impl RenderReport {
    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Every outcome, in view order
    pub fn outcomes(&self) -> &[ViewOutcome] {
        &self.outcomes
    }

    /// Outcome for a named view
    pub fn outcome(&self, view_name: &str) -> Option<&ViewOutcome> {
        self.outcomes.iter().find(|o| o.view_name == view_name)
    }

    /// Names of views whose image was written
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.view_name.as_str())
            .collect()
    }

    /// Failed views with their errors
    pub fn failures(&self) -> Vec<(&str, &ViewError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.view_name.as_str(), e)))
            .collect()
    }

    /// Paths of the written images
    pub fn written_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.path.as_path())
            .collect()
    }

    /// True when every view succeeded
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ViewOutcome::is_success)
    }

    /// Normalization applied to the scene, when the job loaded it
    pub fn normalization(&self) -> Option<&Normalization> {
        self.normalization.as_ref()
    }
}

/// One invocation: a scene file rendered into an output directory
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Scene asset to load
    pub scene_path: PathBuf,
    /// Directory receiving `<view_name>.png`
    pub output_dir: PathBuf,
    /// Canonical views to render
    pub views: ViewSet,
    /// Additional views in normalized scene coordinates, rendered after the canonical ones
    pub custom_views: Vec<ViewSpec>,
    /// Resolution, field of view, lighting and framing
    pub config: RenderConfig,
}

impl RenderJob {
    /// Job rendering all six canonical views with default settings
    pub fn new(scene_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            scene_path: scene_path.into(),
            output_dir: output_dir.into(),
            views: ViewSet::all(),
            custom_views: Vec::new(),
            config: RenderConfig::default(),
        }
    }

    /// Restrict the canonical views
    pub fn with_views(mut self, views: ViewSet) -> Self {
        self.views = views;
        self
    }

    /// Add a view beyond the canonical catalogue
    pub fn with_custom_view(mut self, view: ViewSpec) -> Self {
        self.custom_views.push(view);
        self
    }

    /// Replace the render settings
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Output resolution (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        self.config.resolution()
    }

    /// Run the job with the default renderer
    #[cfg(feature = "software")]
    pub fn run(&self) -> Result<RenderReport, RenderJobError> {
        self.config.validate()?;
        // Load before allocating the framebuffer so a bad asset costs nothing
        let (mesh, normalization) = scene::load_and_normalize_with(&self.scene_path, self.config.rescale_to_unit)?;
        let mut renderer = DefaultRenderer::from_config(&self.config)?;
        self.render_loaded(&mut renderer, mesh, normalization)
    }

    /// Run the job with a caller-supplied renderer
    pub fn run_with<R: Renderer>(&self, renderer: &mut R) -> Result<RenderReport, RenderJobError> {
        self.config.validate()?;
        let (mesh, normalization) = scene::load_and_normalize_with(&self.scene_path, self.config.rescale_to_unit)?;
        self.render_loaded(renderer, mesh, normalization)
    }

    fn render_loaded<R: Renderer>(
        &self,
        renderer: &mut R,
        mesh: Mesh,
        normalization: Normalization,
    ) -> Result<RenderReport, RenderJobError> {
        let (width, height) = renderer.resolution();
        #[allow(clippy::cast_precision_loss)]
        let aspect = width as f32 / height.max(1) as f32;
        let radius = normalization.radius().max(MIN_FRAMING_RADIUS);
        let distance = views::framing_distance(
            radius,
            utils::deg_to_rad(self.config.field_of_view_degrees),
            aspect,
            self.config.camera_distance_factor,
        );

        let mut view_list = views::canonical_views_for(self.views, distance);
        view_list.extend(self.custom_views.iter().cloned());

        log::info!(
            "Rendering {} views of {:?} at {}x{} (bounding radius {:.4}, camera distance {:.4})",
            view_list.len(),
            self.scene_path,
            width,
            height,
            radius,
            distance
        );

        let mut report = render_mesh_views(renderer, mesh, &view_list, &self.output_dir, &self.config)?;
        report.normalization = Some(normalization);
        Ok(report)
    }
}

/// Render the six canonical views of a scene file with default settings
///
/// The completion contract is file based: after this returns, the caller
/// checks for `<output_dir>/<view>.png` (see [`outputs_present`]).
#[cfg(feature = "software")]
pub fn render_views<P: AsRef<Path>, Q: AsRef<Path>>(scene_path: P, output_dir: Q) -> Result<RenderReport, RenderJobError> {
    RenderJob::new(scene_path.as_ref(), output_dir.as_ref()).run()
}

/// Render an already normalized mesh from each view
///
/// The mesh is imported and the light rig added once; each view then gets its
/// own camera, which is removed again before the next view is attached.
pub fn render_mesh_views<R: Renderer>(
    renderer: &mut R,
    mesh: Mesh,
    views: &[ViewSpec],
    output_dir: &Path,
    config: &RenderConfig,
) -> Result<RenderReport, RenderJobError> {
    reject_duplicate_names(views)?;
    std::fs::create_dir_all(output_dir).map_err(|source| WriteError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    remove_unrequested(output_dir, views)?;

    let radius = scene::BoundingVolume::from_mesh(&mesh)
        .map_or(MIN_FRAMING_RADIUS, |b| b.radius().max(MIN_FRAMING_RADIUS));

    renderer.import_scene(mesh)?;
    if renderer.requires_light_rig() {
        let rig = LightingEnvironment::six_directional(radius * 4.0, config.light_intensity, config.ambient_intensity);
        renderer.add_lighting(&rig)?;
    }

    let (width, height) = renderer.resolution();
    #[allow(clippy::cast_precision_loss)]
    let aspect = width as f32 / height.max(1) as f32;

    let outcomes = views
        .iter()
        .map(|view| {
            let path = output_dir.join(format!("{}.png", view.name));
            let (result, analysis) = match render_one(renderer, view, output_dir, radius, aspect, config) {
                Ok(stats) => (Ok(()), Some(stats)),
                Err(e) => {
                    log::warn!("View '{}' failed: {}", view.name, e);
                    (Err(e), None)
                }
            };
            ViewOutcome { view_name: view.name.clone(), path, result, analysis }
        })
        .collect::<Vec<_>>();

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed == 0 {
        log::info!("All {} views written to {:?}", outcomes.len(), output_dir);
    } else {
        log::warn!("{} of {} views failed in {:?}", failed, outcomes.len(), output_dir);
    }

    Ok(RenderReport { output_dir: output_dir.to_path_buf(), outcomes, normalization: None })
}

fn render_one<R: Renderer>(
    renderer: &mut R,
    view: &ViewSpec,
    output_dir: &Path,
    radius: f32,
    aspect: f32,
    config: &RenderConfig,
) -> Result<ViewAnalysis, ViewError> {
    let path = output_path(output_dir, &view.name)?;
    remove_stale(&path)?;
    view.validate()?;

    let distance = (view.eye - view.target).norm();
    let (near, far) = clip_planes(distance, radius);
    let camera = view.camera(config.field_of_view_degrees, aspect, near, far);

    let handle = renderer.attach_camera(camera)?;
    log::trace!("View '{}': camera {:?} attached", view.name, handle);
    let captured = renderer.capture();
    let detached = renderer.remove_node(handle);
    if let Err(e) = &detached {
        log::error!("View '{}': camera could not be detached: {}", view.name, e);
    }
    let image = captured?;
    detached?;

    write_png(&path, &image)?;

    let stats = analysis::analyze_image(&image, config.background);
    if !stats.has_content() {
        log::warn!("View '{}' rendered only background; check framing", view.name);
    }
    log::info!("Rendered {}", path.display());
    Ok(stats)
}

/// Near and far planes bracketing a sphere of `radius` seen from `distance`
fn clip_planes(distance: f32, radius: f32) -> (f32, f32) {
    let near = (distance - 2.0 * radius).max(distance * 0.01);
    let far = distance + 2.0 * radius;
    (near, far)
}

fn output_path(output_dir: &Path, name: &str) -> Result<PathBuf, WriteError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if valid {
        Ok(output_dir.join(format!("{name}.png")))
    } else {
        Err(WriteError::InvalidName(name.to_string()))
    }
}

fn reject_duplicate_names(views: &[ViewSpec]) -> Result<(), WriteError> {
    let mut seen = std::collections::HashSet::new();
    match views.iter().find(|view| !seen.insert(view.name.as_str())) {
        Some(view) => Err(WriteError::DuplicateName(view.name.clone())),
        None => Ok(()),
    }
}

/// Remove canonical `<name>.png` files left by an earlier job with a wider view set
fn remove_unrequested(output_dir: &Path, views: &[ViewSpec]) -> Result<(), WriteError> {
    ViewSet::all()
        .names()
        .into_iter()
        .filter(|name| views.iter().all(|view| view.name != *name))
        .try_for_each(|name| remove_stale(&output_dir.join(format!("{name}.png"))))
}

fn remove_stale(path: &Path) -> Result<(), WriteError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WriteError::RemoveStale { path: path.to_path_buf(), source }),
    }
}

/// Encode `image` as PNG in memory, then write it in one call
///
/// A failed write removes whatever partial file was left behind, so a file
/// that exists is always a complete image.
pub fn write_png(path: &Path, image: &image::RgbaImage) -> Result<(), WriteError> {
    let mut encoded = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
        .map_err(|source| WriteError::Encode { path: path.to_path_buf(), source })?;

    std::fs::write(path, &encoded).map_err(|source| {
        let _ = std::fs::remove_file(path);
        WriteError::Io { path: path.to_path_buf(), source }
    })
}

/// Whether every `<name>.png` exists in `output_dir`
pub fn outputs_present<S: AsRef<str>>(output_dir: &Path, names: &[S]) -> bool {
    missing_outputs(output_dir, names).is_empty()
}

/// Names whose `<name>.png` is absent from `output_dir`
pub fn missing_outputs<S: AsRef<str>>(output_dir: &Path, names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !output_dir.join(format!("{name}.png")).is_file())
        .map(str::to_string)
        .collect()
}

#[cfg(all(test, feature = "software"))]
#[path = "multiview_tests.rs"]
mod multiview_tests;

#[cfg(test)]
mod flat_renderer_tests {
    use super::*;
    use crate::foundation::collections::HandleMap;
    use crate::foundation::math::Vec3;
    use crate::render::{Camera, Light, NodeHandle, RenderResult};
    use image::{Rgba, RgbaImage};

    /// Backend that fills every capture with one colour
    #[derive(Default)]
    struct FlatRenderer {
        nodes: HandleMap<()>,
        camera: Option<NodeHandle>,
        captures: usize,
    }

    impl Renderer for FlatRenderer {
        fn resolution(&self) -> (u32, u32) {
            (8, 6)
        }

        fn import_scene(&mut self, _mesh: Mesh) -> RenderResult<NodeHandle> {
            Ok(self.nodes.insert(()))
        }

        fn add_light(&mut self, _light: Light) -> RenderResult<NodeHandle> {
            Ok(self.nodes.insert(()))
        }

        fn set_ambient(&mut self, _color: Vec3, _intensity: f32) {}

        fn attach_camera(&mut self, _camera: Camera) -> RenderResult<NodeHandle> {
            if let Some(active) = self.camera {
                return Err(RenderError::CameraAlreadyAttached(active));
            }
            let handle = self.nodes.insert(());
            self.camera = Some(handle);
            Ok(handle)
        }

        fn remove_node(&mut self, handle: NodeHandle) -> RenderResult<()> {
            self.nodes.remove(handle).ok_or(RenderError::UnknownNode(handle))?;
            if self.camera == Some(handle) {
                self.camera = None;
            }
            Ok(())
        }

        fn capture(&mut self) -> RenderResult<RgbaImage> {
            if self.camera.is_none() {
                return Err(RenderError::RenderingFailed("no camera attached".to_string()));
            }
            self.captures += 1;
            Ok(RgbaImage::from_pixel(8, 6, Rgba([200, 40, 40, 255])))
        }
    }

    #[test]
    fn test_render_loop_drives_any_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = FlatRenderer::default();
        let views = views::canonical_views(5.0);

        let report = render_mesh_views(
            &mut renderer,
            Mesh::cube(Vec3::zeros(), 2.0),
            &views,
            dir.path(),
            &RenderConfig::default(),
        )
        .unwrap();

        assert!(report.is_complete());
        assert_eq!(renderer.captures, 6);
        assert!(renderer.camera.is_none());
        for name in ViewSet::all().names() {
            let image = image::open(dir.path().join(format!("{name}.png"))).unwrap().to_rgba8();
            assert_eq!(image.get_pixel(3, 3).0, [200, 40, 40, 255], "{name}");
        }
    }
}
