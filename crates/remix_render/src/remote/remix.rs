//! Remix pipeline: model → views → edited image → new model
//!
//! Each stage reports success by writing a well-known file into its output
//! directory, so a caller in another process can check completion the same
//! way it checks a render job.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::assets::{image_loader, AssetLoadError, GltfLoader};
use crate::config::RenderConfig;
use crate::render::multiview::RenderJobError;
#[cfg(feature = "software")]
use crate::render::{
    multiview::{self, RenderJob},
    views::ViewSet,
};

use super::poll::{wait_for_task, PollPolicy};
use super::service::{ArtStyle, GenerationRequest, ImageEditService, MeshGenerationService, ReferenceImage, ServiceError};
use super::task::{TaskId, TaskOutcome};
use super::RemoteTaskError;

/// Draft model written by [`RemixPipeline::text_to_model`]
pub const DRAFT_MODEL_FILE: &str = "draft_model.glb";
/// Refined model written by [`RemixPipeline::text_to_model`]
pub const REFINED_MODEL_FILE: &str = "refined_model.glb";
/// Model written by [`RemixPipeline::image_to_model`]
pub const IMAGE_MODEL_FILE: &str = "model.glb";
/// Edited image written by [`RemixPipeline::remix`]
pub const EDITED_IMAGE_FILE: &str = "edited.png";
/// Final model written by [`RemixPipeline::remix`]
pub const REMIXED_MODEL_FILE: &str = "remixed_model.glb";
/// Subdirectory of the work directory receiving the rendered views
pub const VIEWS_DIR: &str = "views";

/// Remix pipeline failure
#[derive(Error, Debug)]
pub enum RemixError {
    /// Polling a generation task failed
    #[error(transparent)]
    Task(#[from] RemoteTaskError),

    /// A direct service call failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The generation task ended in failure
    #[error("Task {task} failed: {reason}")]
    TaskFailed {
        /// Task id
        task: TaskId,
        /// Service-reported reason
        reason: String,
    },

    /// The generation task was canceled
    #[error("Task {0} was canceled")]
    TaskCanceled(TaskId),

    /// Rendering the source model failed as a whole
    #[error(transparent)]
    Render(#[from] RenderJobError),

    /// Some views needed as edit references were not written
    #[error("Missing rendered views: {}", .0.join(", "))]
    MissingViews(Vec<String>),

    /// A downloaded model is not a loadable glTF scene
    #[error("Downloaded model is invalid: {0}")]
    InvalidModel(#[source] AssetLoadError),

    /// An input or edited image is not decodable
    #[error("Invalid image: {0}")]
    InvalidImage(#[source] AssetLoadError),

    /// The image edit service produced no image
    #[error("Image edit service returned no image")]
    NoImage,

    /// Reading or writing a stage file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Files written by [`RemixPipeline::text_to_model`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToModelOutput {
    /// Preview task id
    pub preview_task: TaskId,
    /// Untextured draft
    pub draft: PathBuf,
    /// Textured refinement of the draft
    pub refined: PathBuf,
}

/// Files written by [`RemixPipeline::remix`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemixOutput {
    /// Directory holding the rendered views
    pub views_dir: PathBuf,
    /// Edited image generated from the views
    pub edited_image: PathBuf,
    /// Model generated from the edited image
    pub model: PathBuf,
}

/// Orchestrates the generation services around the multi-view renderer
///
/// Borrows its service clients; the caller owns their lifetime.
pub struct RemixPipeline<'a, M: ?Sized, I: ?Sized> {
    meshes: &'a M,
    images: &'a I,
    policy: PollPolicy,
    render_config: RenderConfig,
    sleep: fn(Duration),
}

impl<'a, M, I> RemixPipeline<'a, M, I>
where
    M: MeshGenerationService + ?Sized,
    I: ImageEditService + ?Sized,
{
    /// Pipeline with the default poll policy and render settings
    pub fn new(meshes: &'a M, images: &'a I) -> Self {
        Self {
            meshes,
            images,
            policy: PollPolicy::default(),
            render_config: RenderConfig::default(),
            sleep: std::thread::sleep,
        }
    }

    /// Replace the poll policy
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the render settings used for the reference views
    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.render_config = config;
        self
    }

    /// Replace the wait between polls
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Text-to-3D: a draft, then a refinement of that draft
    pub fn text_to_model(&self, prompt: &str, art_style: ArtStyle, save_dir: &Path) -> Result<TextToModelOutput, RemixError> {
        create_dir(save_dir)?;

        let preview_request = GenerationRequest::TextPreview { prompt: prompt.to_string(), art_style };
        let (preview_task, draft) = self.generate(&preview_request, &save_dir.join(DRAFT_MODEL_FILE))?;

        let refine_request = GenerationRequest::TextRefine { preview: preview_task.clone() };
        let (_, refined) = self.generate(&refine_request, &save_dir.join(REFINED_MODEL_FILE))?;

        Ok(TextToModelOutput { preview_task, draft, refined })
    }

    /// Image-to-3D from a PNG on disk
    pub fn image_to_model(&self, image_path: &Path, save_dir: &Path) -> Result<PathBuf, RemixError> {
        let png = read_file(image_path)?;
        image_loader::texture_from_bytes(&png).map_err(RemixError::InvalidImage)?;
        create_dir(save_dir)?;
        let (_, model) = self.generate(&GenerationRequest::Image { png }, &save_dir.join(IMAGE_MODEL_FILE))?;
        Ok(model)
    }

    /// Render a model's canonical views, edit them into one image with
    /// `prompt`, and generate a new model from that image
    #[cfg(feature = "software")]
    pub fn remix(&self, model_path: &Path, prompt: &str, work_dir: &Path) -> Result<RemixOutput, RemixError> {
        let views_dir = work_dir.join(VIEWS_DIR);
        let report = RenderJob::new(model_path, &views_dir)
            .with_config(self.render_config.clone())
            .run()?;

        let names = ViewSet::all().names();
        let missing = multiview::missing_outputs(&views_dir, &names);
        if !missing.is_empty() {
            return Err(RemixError::MissingViews(missing));
        }

        let references = report
            .written_paths()
            .into_iter()
            .zip(report.succeeded())
            .map(|(path, name)| Ok(ReferenceImage { name: name.to_string(), bytes: read_file(path)? }))
            .collect::<Result<Vec<_>, RemixError>>()?;
        log::info!("Requesting image edit with {} reference views", references.len());

        let edited = self.images.edit(prompt, &references)?.ok_or(RemixError::NoImage)?;
        image_loader::texture_from_bytes(&edited).map_err(RemixError::InvalidImage)?;
        let edited_image = work_dir.join(EDITED_IMAGE_FILE);
        write_file(&edited_image, &edited)?;
        log::info!("Edited image written to {}", edited_image.display());

        let (_, model) = self.generate(&GenerationRequest::Image { png: edited }, &work_dir.join(REMIXED_MODEL_FILE))?;
        Ok(RemixOutput { views_dir, edited_image, model })
    }

    /// Submit, wait, download and validate one generation job
    fn generate(&self, request: &GenerationRequest, dest: &Path) -> Result<(TaskId, PathBuf), RemixError> {
        let task = self.meshes.submit(request)?;
        log::info!("Submitted {} task {}", request.kind(), task);

        match wait_for_task(self.meshes, &task, &self.policy, self.sleep)? {
            TaskOutcome::Succeeded { locator } => {
                let bytes = self.meshes.fetch(&locator)?;
                GltfLoader::load_from_slice(&bytes).map_err(RemixError::InvalidModel)?;
                write_file(dest, &bytes)?;
                log::info!("Model from task {} written to {}", task, dest.display());
                Ok((task, dest.to_path_buf()))
            }
            TaskOutcome::Failed { reason } => Err(RemixError::TaskFailed { task, reason }),
            TaskOutcome::Canceled => Err(RemixError::TaskCanceled(task)),
        }
    }
}

fn create_dir(path: &Path) -> Result<(), RemixError> {
    std::fs::create_dir_all(path).map_err(|source| RemixError::Io { path: path.to_path_buf(), source })
}

fn read_file(path: &Path) -> Result<Vec<u8>, RemixError> {
    std::fs::read(path).map_err(|source| RemixError::Io { path: path.to_path_buf(), source })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RemixError> {
    std::fs::write(path, bytes).map_err(|source| {
        let _ = std::fs::remove_file(path);
        RemixError::Io { path: path.to_path_buf(), source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_fixtures;
    use crate::remote::task::{TaskSnapshot, TaskStatus};
    use std::cell::RefCell;

    /// Mesh service whose tasks succeed on the second poll with a cube
    #[derive(Default)]
    struct MockMeshes {
        submitted: RefCell<Vec<GenerationRequest>>,
        polls: RefCell<u32>,
        fail_with: Option<String>,
    }

    impl MeshGenerationService for MockMeshes {
        fn submit(&self, request: &GenerationRequest) -> Result<TaskId, ServiceError> {
            let mut submitted = self.submitted.borrow_mut();
            submitted.push(request.clone());
            Ok(TaskId::new(format!("task-{}", submitted.len())))
        }

        fn poll(&self, task: &TaskId) -> Result<TaskSnapshot, ServiceError> {
            let mut polls = self.polls.borrow_mut();
            *polls += 1;
            if *polls % 2 == 1 {
                return Ok(TaskSnapshot::new(TaskStatus::InProgress, 50));
            }
            Ok(match &self.fail_with {
                Some(reason) => TaskSnapshot::failed(reason.clone()),
                None => TaskSnapshot::succeeded(format!("mem://{task}.glb")),
            })
        }

        fn fetch(&self, locator: &str) -> Result<Vec<u8>, ServiceError> {
            assert!(locator.starts_with("mem://"));
            Ok(test_fixtures::cube_glb([0.0, 0.0, 0.0], 1.0))
        }
    }

    /// Image service that checks its references and returns a PNG
    #[derive(Default)]
    struct MockImages {
        seen: RefCell<Vec<String>>,
        produce: bool,
    }

    impl ImageEditService for MockImages {
        fn edit(&self, prompt: &str, references: &[ReferenceImage]) -> Result<Option<Vec<u8>>, ServiceError> {
            assert!(!prompt.is_empty());
            self.seen.borrow_mut().extend(references.iter().map(|r| r.name.clone()));
            Ok(self.produce.then(test_fixtures::checker_png))
        }
    }

    fn no_wait(_: Duration) {}

    fn small_config() -> RenderConfig {
        RenderConfig::default().with_resolution(48, 36)
    }

    #[test]
    fn test_text_to_model_writes_draft_and_refined() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images).with_sleep(no_wait);

        let output = pipeline.text_to_model("a red teapot", ArtStyle::Sculpture, dir.path()).unwrap();

        assert!(output.draft.is_file());
        assert!(output.refined.is_file());
        assert_eq!(output.draft, dir.path().join(DRAFT_MODEL_FILE));
        assert_eq!(
            *meshes.submitted.borrow(),
            vec![
                GenerationRequest::TextPreview { prompt: "a red teapot".to_string(), art_style: ArtStyle::Sculpture },
                GenerationRequest::TextRefine { preview: output.preview_task.clone() },
            ]
        );
    }

    #[test]
    fn test_failed_task_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = MockMeshes { fail_with: Some("moderation".to_string()), ..MockMeshes::default() };
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images).with_sleep(no_wait);

        let err = pipeline.text_to_model("x", ArtStyle::Realistic, dir.path()).unwrap_err();

        assert!(matches!(err, RemixError::TaskFailed { reason, .. } if reason == "moderation"));
        assert!(!dir.path().join(DRAFT_MODEL_FILE).exists());
        assert_eq!(meshes.submitted.borrow().len(), 1, "refine is never submitted");
    }

    #[test]
    fn test_poll_budget_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images)
            .with_policy(PollPolicy::fixed(Duration::ZERO, 1))
            .with_sleep(no_wait);

        let err = pipeline.text_to_model("x", ArtStyle::Pbr, dir.path()).unwrap_err();
        assert!(matches!(err, RemixError::Task(RemoteTaskError::TimedOut { attempts: 1, .. })));
    }

    #[test]
    fn test_image_to_model_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = test_fixtures::write_fixture(dir.path(), "input.png", b"not a png");
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images).with_sleep(no_wait);

        let err = pipeline.image_to_model(&bogus, &dir.path().join("out")).unwrap_err();

        assert!(matches!(err, RemixError::InvalidImage(_)));
        assert!(meshes.submitted.borrow().is_empty());
    }

    #[test]
    fn test_image_to_model() {
        let dir = tempfile::tempdir().unwrap();
        let input = test_fixtures::write_fixture(dir.path(), "input.png", &test_fixtures::checker_png());
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images).with_sleep(no_wait);

        let model = pipeline.image_to_model(&input, &dir.path().join("out")).unwrap();

        assert_eq!(model, dir.path().join("out").join(IMAGE_MODEL_FILE));
        assert!(GltfLoader::load(&model).is_ok());
    }

    #[cfg(feature = "software")]
    #[test]
    fn test_remix_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = test_fixtures::write_fixture(dir.path(), "source.glb", &test_fixtures::multi_node_glb());
        let work = dir.path().join("work");
        let meshes = MockMeshes::default();
        let images = MockImages { produce: true, ..MockImages::default() };
        let pipeline = RemixPipeline::new(&meshes, &images)
            .with_render_config(small_config())
            .with_sleep(no_wait);

        let output = pipeline.remix(&source, "make it gold", &work).unwrap();

        assert_eq!(*images.seen.borrow(), vec!["front", "back", "left", "right", "top", "bottom"]);
        assert!(multiview::outputs_present(&output.views_dir, &ViewSet::all().names()));
        assert!(output.edited_image.is_file());
        assert!(output.model.is_file());
        assert_eq!(output.model, work.join(REMIXED_MODEL_FILE));
        assert!(matches!(meshes.submitted.borrow()[0], GenerationRequest::Image { .. }));
    }

    #[cfg(feature = "software")]
    #[test]
    fn test_remix_without_edited_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = test_fixtures::write_fixture(dir.path(), "source.glb", &test_fixtures::cube_glb([0.0; 3], 1.0));
        let work = dir.path().join("work");
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images)
            .with_render_config(small_config())
            .with_sleep(no_wait);

        let err = pipeline.remix(&source, "make it gold", &work).unwrap_err();

        assert!(matches!(err, RemixError::NoImage));
        assert!(!work.join(EDITED_IMAGE_FILE).exists());
        assert!(meshes.submitted.borrow().is_empty());
    }

    #[cfg(feature = "software")]
    #[test]
    fn test_remix_of_missing_model_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let meshes = MockMeshes::default();
        let images = MockImages::default();
        let pipeline = RemixPipeline::new(&meshes, &images).with_sleep(no_wait);

        let err = pipeline.remix(&dir.path().join("nope.glb"), "p", dir.path()).unwrap_err();
        assert!(matches!(err, RemixError::Render(RenderJobError::Asset(_))));
    }
}
