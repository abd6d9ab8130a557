//! ptint-rs: projected tetrahedra volume rendering with partial pre-integration.
//!
//! Loads a tetrahedral (or voxel) dataset, classifies every tetrahedron's
//! projection, sorts back to front and composites the resulting triangle fans
//! with a pre-integrated attenuation table.
//!
//! # Quick Start
//!
//! ```no_run
//! use ptint::*;
//!
//! fn main() -> RenderResult<()> {
//!     init_logging();
//!     let mesh = MeshStore::load("blunt.off", DatasetFormat::Off, &GridOptions::default())?;
//!     let mut pipeline = Pipeline::new(mesh, RenderConfig::default())?;
//!     pipeline.render_frame()?.save("blunt.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `ptint-core` - tables, classification, sorting, draw arrays, transfer
//!   function, illumination and the pre-integration table
//! - `ptint-mesh` - the mesh store and dataset readers
//! - `ptint-render` - CPU and wgpu backends, camera and frame images

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod headless;
mod pipeline;

pub use pipeline::{FrameState, Pipeline};

pub use ptint_core::{
    BackendKind, IlluminationControl, Mat4, ProjectionKind, PsiTable, PtintError, RenderConfig,
    SortMethod, TransferFunction, Vec2, Vec3, Vec4,
};
pub use ptint_mesh::{Decomposition, DatasetFormat, GridOptions, MeshStore};
pub use ptint_render::{
    Camera, CpuBackend, FrameImage, GpuBackend, ProjectionBackend, RenderError, RenderResult,
};

/// Installs an `env_logger` logger reading `RUST_LOG`, defaulting to `info`.
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
