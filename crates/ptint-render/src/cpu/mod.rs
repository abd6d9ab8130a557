//! CPU backend: classification loops and a software compositor.

pub mod raster;

use glam::{Vec2, Vec3};
use ptint_core::classify::project_to_ndc;
use ptint_core::preintegration::composite_segment;
use ptint_core::{
    classify_mesh, BackendKind, ClassificationRecord, DrawArrays, MeshView, PsiTable, ThickVertex,
    TransferFunction, ViewTransform,
};

use crate::backend::{CompositeParams, ProjectionBackend};
use crate::{FrameImage, RenderError, RenderResult};

use raster::{ndc_to_pixel, rasterize_triangle};

/// Owned copies of the uploaded mesh buffers.
#[derive(Debug, Clone, Default)]
struct MeshBuffers {
    positions: Vec<Vec3>,
    scalars: Vec<f32>,
    gradients: Option<Vec<Vec3>>,
    tets: Vec<[u32; 4]>,
}

impl MeshBuffers {
    fn view(&self) -> MeshView<'_> {
        MeshView {
            positions: &self.positions,
            scalars: &self.scalars,
            gradients: self.gradients.as_deref(),
            tets: &self.tets,
        }
    }
}

/// Runs both passes on the calling thread.
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    mesh: Option<MeshBuffers>,
    transfer_function: TransferFunction,
    psi: Option<PsiTable>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-vertex attributes interpolated across a fan triangle.
#[derive(Debug, Clone, Copy, Default)]
struct Varyings {
    /// `(scalar front, scalar back, thickness)`.
    color: Vec3,
    gradient_front: Vec3,
    gradient_back: Vec3,
}

impl Varyings {
    fn fetch(arrays: &DrawArrays, slot: usize) -> Self {
        let mut v = Self {
            color: Vec3::from_array(arrays.colors[slot]),
            ..Default::default()
        };
        if arrays.has_gradients() {
            v.gradient_front = Vec3::from_array(arrays.gradients_front[slot]);
            v.gradient_back = Vec3::from_array(arrays.gradients_back[slot]);
        }
        v
    }

    fn interpolate(v: [Self; 3], l: Vec3) -> Self {
        let mix = |f: fn(&Self) -> Vec3| f(&v[0]) * l.x + f(&v[1]) * l.y + f(&v[2]) * l.z;
        Self {
            color: mix(|v| v.color),
            gradient_front: mix(|v| v.gradient_front),
            gradient_back: mix(|v| v.gradient_back),
        }
    }
}

impl ProjectionBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn upload_mesh(&mut self, mesh: &MeshView<'_>) -> RenderResult<()> {
        self.mesh = Some(MeshBuffers {
            positions: mesh.positions.to_vec(),
            scalars: mesh.scalars.to_vec(),
            gradients: mesh.gradients.map(<[Vec3]>::to_vec),
            tets: mesh.tets.to_vec(),
        });
        Ok(())
    }

    fn upload_transfer_function(&mut self, tf: &TransferFunction) -> RenderResult<()> {
        self.transfer_function = tf.clone();
        Ok(())
    }

    fn upload_psi_table(&mut self, table: &PsiTable) -> RenderResult<()> {
        self.psi = Some(table.clone());
        Ok(())
    }

    fn first_step(&mut self, view: &ViewTransform) -> RenderResult<Vec<ClassificationRecord>> {
        let mesh = self.mesh.as_ref().ok_or(RenderError::EmptyFrame)?;
        Ok(classify_mesh(&mesh.view(), view))
    }

    fn second_step(
        &mut self,
        arrays: &DrawArrays,
        params: &CompositeParams,
    ) -> RenderResult<FrameImage> {
        let (width, height) = (params.width, params.height);
        let mut frame = FrameImage::new(width, height);
        let mvp = params.view.model_view_projection();
        let light = params.light_direction();
        let table = if params.integrating { self.psi.as_ref() } else { None };
        let shading = params.shading.filter(|_| arrays.has_gradients());
        let tf = &self.transfer_function;

        let screen: Vec<Vec2> = arrays
            .vertices
            .iter()
            .map(|&v| {
                let ndc = match ThickVertex::unpack(v) {
                    ThickVertex::Projected { x, y, .. } => Vec2::new(x, y),
                    ThickVertex::ObjectSpace(p) => project_to_ndc(&mvp, p).truncate(),
                };
                ndc_to_pixel(ndc, width, height)
            })
            .collect();

        let triangles = arrays.triangle_list();
        for tri in triangles.chunks_exact(3) {
            let ids = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let varyings = ids.map(|i| Varyings::fetch(arrays, i));
            rasterize_triangle(width, height, ids.map(|i| screen[i]), |x, y, l| {
                let v = Varyings::interpolate(varyings, l);
                let mut front = tf.lookup(v.color.x);
                let mut back = tf.lookup(v.color.y);
                if let Some(illumination) = &shading {
                    front = illumination
                        .shade(front.truncate(), v.gradient_front, light)
                        .extend(front.w);
                    back = illumination
                        .shade(back.truncate(), v.gradient_back, light)
                        .extend(back.w);
                }
                let length = params.segment_length(v.color.z, arrays.max_thickness);
                frame.blend_over(x, y, composite_segment(front, back, length, table));
            });
        }
        log::debug!(
            "cpu second step: {} triangles, {} covered pixels",
            triangles.len() / 3,
            frame.covered_pixels()
        );
        Ok(frame)
    }
}
