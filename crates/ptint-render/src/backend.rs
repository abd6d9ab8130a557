//! The execution strategy shared by the CPU and GPU paths.

use glam::Vec3;
use ptint_core::{
    BackendKind, ClassificationRecord, DrawArrays, IlluminationControl, MeshView, PsiTable,
    TransferFunction, ViewTransform,
};

use crate::{FrameImage, RenderResult};

/// Per-frame inputs of the second step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub view: ViewTransform,
    pub width: u32,
    pub height: u32,
    /// Transfer function brightness, scales the normalized segment length.
    pub brightness: f32,
    /// Use the pre-integration table; otherwise the averaged exponential.
    pub integrating: bool,
    /// Gradient shading coefficients, `None` to disable shading.
    pub shading: Option<IlluminationControl>,
}

impl CompositeParams {
    /// Direction towards the viewer in object space (a headlight).
    pub fn light_direction(&self) -> Vec3 {
        self.view
            .model_view
            .inverse()
            .transform_vector3(Vec3::Z)
            .normalize_or_zero()
    }

    /// Brightness-scaled segment length normalized by the frame's thickest segment.
    pub fn segment_length(&self, thickness: f32, max_thickness: f32) -> f32 {
        if max_thickness > 0.0 {
            self.brightness * thickness / max_thickness
        } else {
            0.0
        }
    }
}

/// The two projection passes plus the resources they read.
///
/// Uploads happen when data changes; the passes run every frame. Both
/// implementations consume and produce the same data contracts, so the
/// pipeline is agnostic of where the work runs.
pub trait ProjectionBackend {
    fn kind(&self) -> BackendKind;

    /// Uploads vertex, gradient and tetrahedron buffers. Called after a load
    /// and after every discard pass.
    fn upload_mesh(&mut self, mesh: &MeshView<'_>) -> RenderResult<()>;

    fn upload_transfer_function(&mut self, tf: &TransferFunction) -> RenderResult<()>;

    fn upload_psi_table(&mut self, table: &PsiTable) -> RenderResult<()>;

    /// Classifies every uploaded tetrahedron, in tetrahedron order.
    fn first_step(&mut self, view: &ViewTransform) -> RenderResult<Vec<ClassificationRecord>>;

    /// Composites the sorted fans back to front.
    fn second_step(
        &mut self,
        arrays: &DrawArrays,
        params: &CompositeParams,
    ) -> RenderResult<FrameImage>;
}
