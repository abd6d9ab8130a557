//! Dataset readers.
//!
//! Text formats produce explicit tetrahedra; binary voxel formats produce a
//! regular grid that is tetrahedralized with a fixed per-cell template.
//! Readers only fill a [`MeshStore`]; normalization happens in
//! [`MeshStore::load`].

mod grid;
mod off;

use std::path::Path;

use ptint_core::{PtintError, Result};

use crate::hexahedra::Decomposition;
use crate::MeshStore;

pub use grid::{read_grid, write_raw};
pub use off::{read_geo, read_off, write_off};

/// On-disk dataset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `nV nT`, vertex lines `x y z s`, tet lines `v0 v1 v2 v3`.
    Off,
    /// OFF with `x y z s gx gy gz` vertex lines.
    GradientOff,
    /// Geological OFF: `id x y z` vertices, `id v0 v1 v2 v3 region` tets.
    Geo,
    /// One file of 8-bit voxels.
    Bin8,
    /// One file of 16-bit little endian voxels.
    Bin16Le,
    /// One file of 16-bit big endian voxels.
    Bin16Be,
    /// One 8-bit file per slice, named `name.1`, `name.2`, ...
    MultiRaw8,
    /// One 16-bit little endian file per slice.
    MultiRaw16Le,
    /// One 16-bit big endian file per slice.
    MultiRaw16Be,
    /// One binary PPM (P6) per slice, named `name.1.pnm`, ...; the red channel is the scalar.
    Pnm8,
}

impl DatasetFormat {
    pub fn is_grid(self) -> bool {
        !matches!(self, Self::Off | Self::GradientOff | Self::Geo)
    }

    /// Guesses the format from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "off" => Some(Self::Off),
            "goff" | "gradoff" => Some(Self::GradientOff),
            "geo" => Some(Self::Geo),
            "raw" | "bin" => Some(Self::Bin8),
            _ => None,
        }
    }
}

/// Sampling options for voxel grids.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOptions {
    /// Voxel counts along x (rows), y (columns) and z (slices).
    pub dims: [u32; 3],
    /// Voxels cropped from the low end of each axis.
    pub crop_begin: [u32; 3],
    /// Voxels cropped from the high end of each axis.
    pub crop_end: [u32; 3],
    /// Sampling step in x and y.
    pub step_xy: u32,
    /// Sampling step in z.
    pub step_z: u32,
    pub decomposition: Decomposition,
    /// Slice spacing relative to the voxel spacing. Defaults to 20 for
    /// PNM stacks and 1 otherwise.
    pub z_scale: Option<f32>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            dims: [0; 3],
            crop_begin: [0; 3],
            crop_end: [0; 3],
            step_xy: 1,
            step_z: 1,
            decomposition: Decomposition::Five,
            z_scale: None,
        }
    }
}

impl GridOptions {
    pub fn with_dims(dims: [u32; 3]) -> Self {
        Self {
            dims,
            ..Default::default()
        }
    }

    /// Sampled voxel coordinates along one axis.
    pub(crate) fn axis_samples(&self, axis: usize) -> impl Iterator<Item = u32> {
        let step = if axis == 2 { self.step_z } else { self.step_xy };
        let end = self.dims[axis].saturating_sub(self.crop_end[axis]);
        (self.crop_begin[axis]..end).step_by(step.max(1) as usize)
    }

    /// Vertex counts of the sampled grid.
    pub fn sampled_dims(&self) -> [u32; 3] {
        [0, 1, 2].map(|axis| self.axis_samples(axis).count() as u32)
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_xy == 0 || self.step_z == 0 {
            return Err(PtintError::InvalidValue("sampling steps must be positive".into()));
        }
        for axis in 0..3 {
            if self.crop_begin[axis] + self.crop_end[axis] >= self.dims[axis] {
                return Err(PtintError::InvalidValue(format!(
                    "crop box is empty along axis {axis} ({} voxels, crop {} + {})",
                    self.dims[axis], self.crop_begin[axis], self.crop_end[axis]
                )));
            }
        }
        Ok(())
    }
}

/// Reads a dataset without normalizing it.
pub fn read(path: &Path, format: DatasetFormat, grid: &GridOptions) -> Result<MeshStore> {
    match format {
        DatasetFormat::Off => read_off(path, false),
        DatasetFormat::GradientOff => read_off(path, true),
        DatasetFormat::Geo => read_geo(path),
        _ => read_grid(path, format, grid),
    }
}
