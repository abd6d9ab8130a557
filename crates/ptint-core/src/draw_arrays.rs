//! Setup and reorder of the per-frame draw arrays.
//!
//! Every tetrahedron owns five vertex slots: slot 0 is its thick vertex,
//! slots 1-4 are copies of its original vertices. Slots are addressed by
//! tetrahedron id and never move; only the index arena is rewritten in
//! back-to-front order.

use glam::Vec3;

use crate::classify::ClassificationRecord;
use crate::mesh_view::MeshView;
use crate::tables::{FAN_TABLE, MAX_FAN};
use crate::{PtintError, Result};

/// Vertex slots per tetrahedron.
pub const VERTS_PER_TET: usize = 5;

/// Index arena stride per draw.
pub const INDEX_STRIDE: usize = MAX_FAN;

/// The thick vertex of a fan, tagged by the space its position lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThickVertex {
    /// Already projected: NDC position and depth, packed with `w = 0`.
    Projected { x: f32, y: f32, depth: f32 },
    /// An original vertex in object space, packed with `w = 1`.
    ObjectSpace(Vec3),
}

impl ThickVertex {
    pub fn pack(self) -> [f32; 4] {
        match self {
            Self::Projected { x, y, depth } => [x, y, depth, 0.0],
            Self::ObjectSpace(p) => [p.x, p.y, p.z, 1.0],
        }
    }

    pub fn unpack(v: [f32; 4]) -> Self {
        if v[3] == 0.0 {
            Self::Projected {
                x: v[0],
                y: v[1],
                depth: v[2],
            }
        } else {
            Self::ObjectSpace(Vec3::new(v[0], v[1], v[2]))
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, Self::Projected { .. })
    }
}

/// Vertex, color and index arrays for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawArrays {
    /// `VERTS_PER_TET` positions per tetrahedron, `w` is the projection flag.
    pub vertices: Vec<[f32; 4]>,
    /// `(scalar front, scalar back, thickness)` per vertex slot.
    pub colors: Vec<[f32; 3]>,
    /// Front gradient per vertex slot, empty for meshes without gradients.
    pub gradients_front: Vec<[f32; 3]>,
    /// Back gradient per vertex slot, empty for meshes without gradients.
    pub gradients_back: Vec<[f32; 3]>,
    /// `INDEX_STRIDE` indices per draw, in draw order.
    pub indices: Vec<u32>,
    /// Fan length per draw.
    pub counts: Vec<u32>,
    /// Largest thickness of this frame.
    pub max_thickness: f32,
}

impl DrawArrays {
    /// Number of tetrahedra (and draws).
    pub fn num_tets(&self) -> usize {
        self.counts.len()
    }

    pub fn has_gradients(&self) -> bool {
        !self.gradients_front.is_empty()
    }

    /// Offset into the index arena of draw `i`.
    pub fn offset(&self, draw: usize) -> usize {
        draw * INDEX_STRIDE
    }

    /// Fan indices of draw `i`.
    pub fn fan(&self, draw: usize) -> &[u32] {
        let start = self.offset(draw);
        &self.indices[start..start + self.counts[draw] as usize]
    }

    /// Fans in draw order.
    pub fn fans(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.num_tets()).map(|i| self.fan(i))
    }

    /// The thick vertex of tetrahedron `tet`.
    pub fn thick_vertex(&self, tet: usize) -> ThickVertex {
        ThickVertex::unpack(self.vertices[tet * VERTS_PER_TET])
    }

    /// Number of triangles in all fans.
    pub fn triangle_count(&self) -> usize {
        self.counts.iter().map(|&c| c.saturating_sub(2) as usize).sum()
    }

    /// Expands the fans into a triangle list, preserving draw order.
    pub fn triangle_list(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.triangle_count() * 3);
        for fan in self.fans() {
            for k in 1..fan.len().saturating_sub(1) {
                out.extend_from_slice(&[fan[0], fan[k], fan[k + 1]]);
            }
        }
        out
    }
}

/// Builds [`DrawArrays`] from classification records and a sort order.
#[derive(Debug, Clone, Default)]
pub struct ArrayBuilder {
    arrays: DrawArrays,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrays(&self) -> &DrawArrays {
        &self.arrays
    }

    /// Writes the original vertex slots of every tetrahedron.
    ///
    /// Reallocates all arrays when the tetrahedron count changed; draws are
    /// left empty (count 0) until the next [`Self::setup_and_reorder`].
    pub fn reset(&mut self, mesh: &MeshView<'_>) {
        let n = mesh.num_tets();
        let gradients = mesh.gradients.is_some();
        let a = &mut self.arrays;
        if a.counts.len() != n || a.has_gradients() != gradients {
            log::debug!("allocating draw arrays for {n} tetrahedra");
            let slots = n * VERTS_PER_TET;
            *a = DrawArrays {
                vertices: vec![[0.0; 4]; slots],
                colors: vec![[0.0; 3]; slots],
                gradients_front: if gradients { vec![[0.0; 3]; slots] } else { Vec::new() },
                gradients_back: if gradients { vec![[0.0; 3]; slots] } else { Vec::new() },
                indices: vec![0; n * INDEX_STRIDE],
                counts: vec![0; n],
                max_thickness: 0.0,
            };
        } else {
            a.counts.fill(0);
            a.max_thickness = 0.0;
        }

        for (t, tet) in mesh.tets.iter().enumerate() {
            for (k, &v) in tet.iter().enumerate() {
                let slot = t * VERTS_PER_TET + 1 + k;
                let p = mesh.positions[v as usize];
                let s = mesh.scalars[v as usize];
                a.vertices[slot] = [p.x, p.y, p.z, 1.0];
                a.colors[slot] = [s, s, 0.0];
                if let Some(g) = mesh.gradients {
                    let g = g[v as usize].to_array();
                    a.gradients_front[slot] = g;
                    a.gradients_back[slot] = g;
                }
            }
        }
    }

    /// Writes the thick vertices and rebuilds the index arena in `order`.
    ///
    /// `records` is indexed by tetrahedron id, `order` lists tetrahedron ids
    /// back to front. Must follow a [`Self::reset`] for the same mesh.
    pub fn setup_and_reorder(
        &mut self,
        mesh: &MeshView<'_>,
        records: &[ClassificationRecord],
        order: &[u32],
    ) -> Result<&DrawArrays> {
        let n = mesh.num_tets();
        for len in [records.len(), order.len(), self.arrays.counts.len()] {
            if len != n {
                return Err(PtintError::SizeMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }

        let a = &mut self.arrays;
        a.max_thickness = 0.0;
        for (draw, &tet) in order.iter().enumerate() {
            let t = tet as usize;
            let Some(record) = records.get(t) else {
                return Err(PtintError::InvalidIndex {
                    index: tet,
                    count: n,
                });
            };
            let row = record.row as usize % FAN_TABLE.len();
            let fan = &FAN_TABLE[row];
            let count = (record.fan_count as usize).clamp(4, MAX_FAN);

            let thick = if count == MAX_FAN {
                ThickVertex::Projected {
                    x: record.thick_position.x,
                    y: record.thick_position.y,
                    depth: record.thick_depth,
                }
            } else {
                let v = mesh.tets[t][fan[0] as usize];
                ThickVertex::ObjectSpace(mesh.positions[v as usize])
            };
            let base = t * VERTS_PER_TET;
            a.vertices[base] = thick.pack();
            a.colors[base] = [record.scalar_front, record.scalar_back, record.thickness];
            if a.has_gradients() {
                a.gradients_front[base] = record.gradient_front.to_array();
                a.gradients_back[base] = record.gradient_back.to_array();
            }

            let first = draw * INDEX_STRIDE;
            let indices = &mut a.indices[first..first + INDEX_STRIDE];
            indices.fill(base as u32);
            for j in 1..count {
                indices[j] = (base + 1) as u32 + u32::from(fan[j]);
            }
            a.counts[draw] = count as u32;
            a.max_thickness = a.max_thickness.max(record.thickness);
        }
        Ok(&self.arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_mesh, ViewTransform};
    use crate::tables::FAN_COUNT;
    use glam::Mat4;

    struct Fixture {
        positions: Vec<Vec3>,
        scalars: Vec<f32>,
        tets: Vec<[u32; 4]>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                positions: vec![
                    Vec3::new(-1.0, -1.0, 0.0),
                    Vec3::new(1.0, -1.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::new(0.0, -0.2, 0.5),
                    Vec3::new(0.0, -0.2, -0.5),
                    Vec3::new(-1.0, 0.0, 0.3),
                    Vec3::new(1.0, 0.0, 0.3),
                ],
                scalars: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
                tets: vec![[0, 1, 2, 3], [0, 2, 1, 4], [0, 1, 5, 6]],
            }
        }

        fn view(&self) -> MeshView<'_> {
            MeshView {
                positions: &self.positions,
                scalars: &self.scalars,
                gradients: None,
                tets: &self.tets,
            }
        }
    }

    fn camera() -> ViewTransform {
        ViewTransform::new(
            Mat4::look_at_rh(Vec3::new(0.3, 0.4, 3.0), Vec3::ZERO, Vec3::Y),
            Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, 0.1, 10.0),
        )
    }

    #[test]
    fn test_thick_vertex_pack() {
        let p = ThickVertex::Projected {
            x: 0.5,
            y: -0.5,
            depth: 0.25,
        };
        assert_eq!(p.pack(), [0.5, -0.5, 0.25, 0.0]);
        assert_eq!(ThickVertex::unpack(p.pack()), p);
        let o = ThickVertex::ObjectSpace(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(o.pack()[3], 1.0);
        assert!(!o.is_projected());
    }

    #[test]
    fn test_reset_writes_original_slots() {
        let fx = Fixture::new();
        let mut builder = ArrayBuilder::new();
        builder.reset(&fx.view());
        let a = builder.arrays();
        assert_eq!(a.vertices.len(), 15);
        assert_eq!(a.colors.len(), 15);
        assert_eq!(a.indices.len(), 18);
        // tet 1 vertex 3 is mesh vertex 4
        assert_eq!(a.vertices[5 + 4], [0.0, -0.2, -0.5, 1.0]);
        assert_eq!(a.colors[5 + 4], [0.4, 0.4, 0.0]);
        assert!(!a.has_gradients());
    }

    #[test]
    fn test_setup_follows_order_and_table() {
        let fx = Fixture::new();
        let mesh = fx.view();
        let records = classify_mesh(&mesh, &camera());
        let mut builder = ArrayBuilder::new();
        builder.reset(&mesh);
        let order = [2, 0, 1];
        let a = builder.setup_and_reorder(&mesh, &records, &order).unwrap();

        for (draw, &tet) in order.iter().enumerate() {
            let t = tet as usize;
            let r = &records[t];
            let row = r.row as usize;
            assert_eq!(a.counts[draw], u32::from(FAN_COUNT[row]));
            let fan = a.fan(draw);
            assert_eq!(fan[0], (t * VERTS_PER_TET) as u32);
            for &i in &fan[1..] {
                assert!((i as usize) > t * VERTS_PER_TET && (i as usize) < (t + 1) * VERTS_PER_TET);
            }
            assert_eq!(a.thick_vertex(t).is_projected(), FAN_COUNT[row] == 6);
            assert_eq!(a.colors[t * VERTS_PER_TET][2], r.thickness);
        }
        let max = records.iter().map(|r| r.thickness).fold(0.0, f32::max);
        assert_eq!(a.max_thickness, max);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let fx = Fixture::new();
        let mesh = fx.view();
        let records = classify_mesh(&mesh, &camera());
        let mut builder = ArrayBuilder::new();
        builder.reset(&mesh);
        let first = builder.setup_and_reorder(&mesh, &records, &[1, 2, 0]).unwrap().clone();
        let second = builder.setup_and_reorder(&mesh, &records, &[1, 2, 0]).unwrap();
        assert_eq!(&first, second);
    }

    #[test]
    fn test_triangle_list_expands_fans() {
        let fx = Fixture::new();
        let mesh = fx.view();
        let records = classify_mesh(&mesh, &camera());
        let mut builder = ArrayBuilder::new();
        builder.reset(&mesh);
        let a = builder.setup_and_reorder(&mesh, &records, &[0, 1, 2]).unwrap();
        let tris = a.triangle_list();
        assert_eq!(tris.len(), a.triangle_count() * 3);
        let fan = a.fan(0);
        assert_eq!(&tris[..3], &[fan[0], fan[1], fan[2]]);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let fx = Fixture::new();
        let mesh = fx.view();
        let mut builder = ArrayBuilder::new();
        builder.reset(&mesh);
        let result = builder.setup_and_reorder(&mesh, &[], &[0, 1, 2]);
        assert!(matches!(result, Err(PtintError::SizeMismatch { .. })));
    }
}
