//! Core data model for ptint-rs.
//!
//! This crate holds everything of the projected tetrahedra pipeline that does
//! not touch a GPU:
//! - the ternary [`tables`] that classify a tetrahedron's projection
//! - the first-step classifier reference ([`classify`])
//! - back-to-front [`sort`]ing and the [`draw_arrays`] builder
//! - square texture packing, transfer function, illumination and the
//!   pre-integration table
//! - [`RenderConfig`] and the error type

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
// Index and count conversions between u32 texture data and usize are pervasive
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod classify;
pub mod draw_arrays;
pub mod error;
pub mod illumination;
pub mod mesh_view;
pub mod options;
mod params;
pub mod preintegration;
pub mod sort;
pub mod tables;
pub mod texture;
pub mod transfer_function;

pub use classify::{classify_mesh, classify_tet, ClassificationRecord, ViewTransform};
pub use draw_arrays::{ArrayBuilder, DrawArrays, ThickVertex};
pub use error::{PtintError, Result};
pub use illumination::IlluminationControl;
pub use mesh_view::{MeshView, TetCorners};
pub use options::{BackendKind, ProjectionKind, RenderConfig, SortMethod};
pub use preintegration::PsiTable;
pub use sort::Sorter;
pub use tables::ProjectionClass;
pub use texture::{texture_size, SquareTexture};
pub use transfer_function::TransferFunction;

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
