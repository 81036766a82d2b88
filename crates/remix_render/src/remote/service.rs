//! Service traits for mesh generation and image editing
//!
//! Implementations own their transport and credentials. Both traits take
//! `&self` so one client can be shared by reference across pipeline stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::task::{TaskId, TaskSnapshot};

/// Transport or protocol failure reported by a service client
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request never got a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with an error status
    #[error("Service returned status {code}: {body}")]
    Status {
        /// HTTP-style status code
        code: u16,
        /// Response body
        body: String,
    },

    /// The response could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Look of a generated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtStyle {
    /// Photographic surfaces
    #[default]
    Realistic,
    /// Untextured sculpt
    Sculpture,
    /// Physically based material maps
    Pbr,
}

impl ArtStyle {
    /// Name used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Realistic => "realistic",
            Self::Sculpture => "sculpture",
            Self::Pbr => "pbr",
        }
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realistic" => Ok(Self::Realistic),
            "sculpture" => Ok(Self::Sculpture),
            "pbr" => Ok(Self::Pbr),
            other => Err(format!("unknown art style '{other}' (expected realistic, sculpture or pbr)")),
        }
    }
}

/// Job submitted to a mesh generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Fast, coarse text-to-3D draft
    TextPreview {
        /// Text prompt
        prompt: String,
        /// Requested look
        art_style: ArtStyle,
    },
    /// Textured refinement of a finished preview
    TextRefine {
        /// The preview task being refined
        preview: TaskId,
    },
    /// Image-to-3D from one encoded image
    Image {
        /// PNG bytes
        png: Vec<u8>,
    },
}

impl GenerationRequest {
    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextPreview { .. } => "text preview",
            Self::TextRefine { .. } => "text refine",
            Self::Image { .. } => "image",
        }
    }
}

/// Named image passed to the image edit service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// View name or file stem
    pub name: String,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
}

/// Asynchronous 3D generation: submit, poll, fetch
pub trait MeshGenerationService {
    /// Submit a job and return its id
    fn submit(&self, request: &GenerationRequest) -> Result<TaskId, ServiceError>;

    /// Report the current state of a job
    fn poll(&self, task: &TaskId) -> Result<TaskSnapshot, ServiceError>;

    /// Download a finished asset
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Synchronous image edit from a prompt and reference images
pub trait ImageEditService {
    /// Produce one edited image; `Ok(None)` when the model returned no image
    fn edit(&self, prompt: &str, references: &[ReferenceImage]) -> Result<Option<Vec<u8>>, ServiceError>;
}
