//! Tetrahedral mesh store and dataset readers for ptint-rs.
//!
//! - [`MeshStore`] owns vertex and tetrahedron buffers and normalizes them
//! - [`io`] reads OFF, geological OFF and voxel grid datasets
//! - [`hexahedra`] splits grid cells into 5 or 6 tetrahedra

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod hexahedra;
pub mod io;
pub mod store;

pub use hexahedra::Decomposition;
pub use io::{DatasetFormat, GridOptions};
pub use store::{MeshStore, VisibleTets};
