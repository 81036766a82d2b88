//! # Remote Collaborators
//!
//! Contracts for the generation services around the renderer: a mesh
//! generation service (text-to-3D and image-to-3D jobs that run
//! asynchronously) and an image edit service (prompt plus reference images in,
//! one image out).
//!
//! No HTTP client ships with this crate. Callers construct a client that
//! implements [`MeshGenerationService`] and/or [`ImageEditService`] once per
//! process and lend it to [`RemixPipeline`].
//!
//! Asynchronous jobs are tracked by [`TaskTracker`], an explicit state machine
//! over [`TaskStatus`], and driven by [`wait_for_task`] under a bounded
//! [`PollPolicy`].

pub mod task;
pub mod poll;
pub mod service;
pub mod remix;

pub use task::{TaskId, TaskStatus, TaskSnapshot, TaskTracker, TaskOutcome};
pub use poll::{PollPolicy, wait_for_task};
pub use service::{
    ArtStyle, GenerationRequest, ImageEditService, MeshGenerationService, ReferenceImage, ServiceError,
};
pub use remix::{RemixPipeline, RemixError, RemixOutput, TextToModelOutput};

use thiserror::Error;

/// Failure while tracking a remote task
#[derive(Error, Debug)]
pub enum RemoteTaskError {
    /// The service call itself failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The service reported a status outside the known vocabulary
    #[error("Unknown task status '{0}'")]
    UnknownStatus(String),

    /// The service reported a status change that cannot happen
    #[error("Task {task}: illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Task id
        task: TaskId,
        /// Status before the poll
        from: TaskStatus,
        /// Status reported by the poll
        to: TaskStatus,
    },

    /// The polling budget ran out before the task finished
    #[error("Task {task} still running after {attempts} polls")]
    TimedOut {
        /// Task id
        task: TaskId,
        /// Polls made
        attempts: u32,
    },

    /// The task succeeded but carried no result locator
    #[error("Task {0} succeeded without a result locator")]
    MissingLocator(TaskId),
}
