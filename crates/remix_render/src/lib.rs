//! # Remix Render
//!
//! Deterministic offscreen rendering of a textured glTF asset to a fixed set of
//! calibrated camera views, the "3D model → images" step of a 3D remix pipeline.
//!
//! ## Features
//!
//! - **Scene Loading**: Binary glTF import with multi-node scenes merged into one mesh
//! - **Normalization**: Bounding-box centring (and optional unit rescale) of every asset
//! - **Camera Rig**: Six canonical views with hard-coded, validated up-hints
//! - **Offscreen Rendering**: CPU rasteriser behind a `Renderer` trait, PNG output per view
//! - **Collaborator Contracts**: Task state machine and bounded polling for remote generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remix_render::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = render_views("model.glb", "renders")?;
//!     for outcome in report.outcomes() {
//!         println!("{}: {}", outcome.view_name, outcome.is_success());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod assets;
pub mod scene;
pub mod render;
pub mod remote;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        foundation::math::{Vec3, Mat4, Mat4Ext},
        config::{Config, ConfigError, RenderConfig},
        assets::{AssetLoadError, GltfLoader},
        scene::{BoundingVolume, Normalization, load_and_normalize},
        render::{
            Camera, Mesh, Vertex, Material, Light, LightingEnvironment,
            Renderer, RenderError, NodeHandle,
            views::{ViewSpec, ViewSet, DegenerateViewError, canonical_views, build_view_transform},
            multiview::{
                RenderJob, RenderJobError, RenderReport, ViewError, ViewOutcome, WriteError,
                render_mesh_views, outputs_present,
            },
        },
    };

    #[cfg(feature = "software")]
    pub use crate::render::{DefaultRenderer, multiview::render_views};
}
