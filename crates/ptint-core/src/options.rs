//! Render configuration for the projection pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-pipeline render configuration.
///
/// Replaces the global `sorting`/`integrating`/`shading` style flags with one
/// value that is handed to the pipeline and to both projection backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image width in pixels.
    pub width: u32,

    /// Output image height in pixels.
    pub height: u32,

    /// Which backend executes the first and second step.
    pub backend: BackendKind,

    /// Sort used for the exact frame rendered after an interaction ends.
    pub still_sort: SortMethod,

    /// Sort used while the view is rotating.
    pub rotating_sort: SortMethod,

    /// Number of depth layers used by [`SortMethod::Bucket`].
    pub layer_count: usize,

    /// Use the pre-integrated (Psi table) attenuation instead of the averaged exponential.
    pub integrating: bool,

    /// Modulate colors with gradient based shading.
    pub shading: bool,

    /// Side length of the pre-integration table.
    pub psi_table_size: usize,

    /// Background color, composited under the volume.
    pub background: [f32; 4],

    /// Camera projection.
    pub projection: ProjectionKind,

    /// Vertical field of view in degrees (perspective only).
    pub fov_degrees: f32,

    /// Drop tetrahedra whose four vertex scalars are all fully transparent.
    pub discard_transparent: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            backend: BackendKind::Cpu,
            still_sort: SortMethod::Centroid,
            rotating_sort: SortMethod::Bucket,
            layer_count: 100,
            integrating: true,
            shading: false,
            psi_table_size: 512,
            background: [0.0, 0.0, 0.0, 1.0],
            projection: ProjectionKind::Orthographic,
            fov_degrees: 45.0,
            discard_transparent: true,
        }
    }
}

impl RenderConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Width over height of the output image.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Sorting strategy applied to the classified tetrahedra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortMethod {
    /// Identity order (tetrahedron id order).
    None,
    /// Exact stable sort on the per-tetrahedron view depth.
    #[default]
    Centroid,
    /// Approximate depth-layer partition, unsorted inside a layer.
    Bucket,
}

/// Execution strategy for the two projection passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackendKind {
    /// Plain CPU loops and a software rasterizer.
    #[default]
    Cpu,
    /// wgpu compute + render passes.
    Gpu,
}

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectionKind {
    #[default]
    Orthographic,
    Perspective,
}
