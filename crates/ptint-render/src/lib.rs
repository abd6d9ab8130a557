//! Projection backends for ptint-rs.
//!
//! This crate runs the two passes of the projected tetrahedra pipeline:
//! - [`ProjectionBackend`], the strategy both backends implement
//! - [`CpuBackend`], plain loops and a software rasterizer
//! - [`GpuBackend`], a wgpu compute pass and an indexed draw (WGSL)
//! - [`Camera`] and [`FrameImage`] with PNG output

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_arguments)]

pub mod backend;
pub mod buffer;
pub mod camera;
pub mod cpu;
pub mod error;
pub mod frame;
pub mod gpu;

pub use backend::{CompositeParams, ProjectionBackend};
pub use camera::Camera;
pub use cpu::CpuBackend;
pub use error::{RenderError, RenderResult};
pub use frame::FrameImage;
pub use gpu::GpuBackend;

use ptint_core::BackendKind;

/// Creates the backend selected in the render config.
pub fn create_backend(kind: BackendKind) -> RenderResult<Box<dyn ProjectionBackend>> {
    Ok(match kind {
        BackendKind::Cpu => Box::new(CpuBackend::new()),
        BackendKind::Gpu => Box::new(GpuBackend::new()?),
    })
}
