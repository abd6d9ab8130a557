//! The mesh store: vertex and tetrahedron buffers of one loaded dataset.

use std::path::Path;

use glam::Vec3;
use ptint_core::{MeshView, PtintError, Result, TransferFunction};

use crate::io::{self, DatasetFormat, GridOptions};

/// Edges of a tetrahedron as pairs of corner indices.
const TET_EDGES: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

/// Per-vertex and per-tetrahedron buffers.
///
/// Built incrementally with [`add_vertex`](Self::add_vertex),
/// [`add_gradient`](Self::add_gradient) and [`add_cell`](Self::add_cell),
/// then normalized once.
#[derive(Debug, Clone, Default)]
pub struct MeshStore {
    positions: Vec<Vec3>,
    scalars: Vec<f32>,
    gradients: Vec<Vec3>,
    tets: Vec<[u32; 4]>,
    normalized: bool,
}

/// Result of dropping fully transparent tetrahedra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleTets {
    /// Surviving tetrahedra, in their original relative order.
    pub tets: Vec<[u32; 4]>,
    /// Number of tetrahedra dropped.
    pub discarded: usize,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for the given counts.
    pub fn with_capacity(num_vertices: usize, num_tets: usize) -> Self {
        Self {
            positions: Vec::with_capacity(num_vertices),
            scalars: Vec::with_capacity(num_vertices),
            gradients: Vec::new(),
            tets: Vec::with_capacity(num_tets),
            normalized: false,
        }
    }

    /// Loads and normalizes a dataset.
    pub fn load(path: impl AsRef<Path>, format: DatasetFormat, grid: &GridOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut mesh = io::read(path, format, grid)?;
        mesh.normalize()?;
        log::info!(
            "loaded {} ({} vertices, {} tetrahedra{})",
            path.display(),
            mesh.num_vertices(),
            mesh.num_tets(),
            if mesh.has_gradients() { ", with gradients" } else { "" }
        );
        Ok(mesh)
    }

    /// Appends a vertex and returns its id.
    pub fn add_vertex(&mut self, position: Vec3, scalar: f32) -> u32 {
        self.positions.push(position);
        self.scalars.push(scalar);
        (self.positions.len() - 1) as u32
    }

    /// Appends the gradient of the next vertex without one.
    pub fn add_gradient(&mut self, gradient: Vec3) {
        self.gradients.push(gradient);
    }

    /// Appends a tetrahedron. All four indices must name existing vertices.
    pub fn add_cell(&mut self, ids: [u32; 4]) -> Result<()> {
        let count = self.positions.len();
        if let Some(&index) = ids.iter().find(|&&i| i as usize >= count) {
            return Err(PtintError::InvalidIndex { index, count });
        }
        self.tets.push(ids);
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_tets(&self) -> usize {
        self.tets.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn scalars(&self) -> &[f32] {
        &self.scalars
    }

    pub fn tets(&self) -> &[[u32; 4]] {
        &self.tets
    }

    /// Per-vertex gradients, if every vertex has one.
    pub fn gradients(&self) -> Option<&[Vec3]> {
        self.has_gradients().then_some(self.gradients.as_slice())
    }

    pub fn has_gradients(&self) -> bool {
        !self.gradients.is_empty() && self.gradients.len() == self.positions.len()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn scalar(&self, id: u32) -> Option<f32> {
        self.scalars.get(id as usize).copied()
    }

    pub fn set_scalar(&mut self, id: u32, value: f32) -> Result<()> {
        let count = self.scalars.len();
        let slot = self
            .scalars
            .get_mut(id as usize)
            .ok_or(PtintError::InvalidIndex { index: id, count })?;
        *slot = value;
        Ok(())
    }

    /// Borrowed view used by the classifier and the array builder.
    pub fn view(&self) -> MeshView<'_> {
        MeshView {
            positions: &self.positions,
            scalars: &self.scalars,
            gradients: self.gradients(),
            tets: &self.tets,
        }
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }

    /// Longest tetrahedron edge.
    pub fn max_edge_length(&self) -> f32 {
        self.tets
            .iter()
            .flat_map(|tet| {
                TET_EDGES.iter().map(move |&(a, b)| {
                    self.positions[tet[a] as usize].distance(self.positions[tet[b] as usize])
                })
            })
            .fold(0.0, f32::max)
    }

    /// Checks buffer consistency.
    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() || self.tets.is_empty() {
            return Err(PtintError::EmptyMesh);
        }
        if !self.gradients.is_empty() && self.gradients.len() != self.positions.len() {
            return Err(PtintError::SizeMismatch {
                expected: self.positions.len(),
                actual: self.gradients.len(),
            });
        }
        let count = self.positions.len();
        for tet in &self.tets {
            if let Some(&index) = tet.iter().find(|&&i| i as usize >= count) {
                return Err(PtintError::InvalidIndex { index, count });
            }
        }
        Ok(())
    }

    /// Rescales positions into a cube centered at the origin whose longest
    /// axis spans `[-1, 1]`, scalars into `[0, 1]`, and gradients so the
    /// longest has unit length.
    ///
    /// Runs once per load; the store is validated before anything is written.
    pub fn normalize(&mut self) -> Result<()> {
        if self.normalized {
            return Err(PtintError::AlreadyNormalized);
        }
        self.validate()?;
        let (lo, hi) = self.bounding_box().ok_or(PtintError::EmptyMesh)?;

        let center = (lo + hi) * 0.5;
        let half = ((hi - lo) * 0.5).max_element();
        let scale = if half > 0.0 { 1.0 / half } else { 1.0 };
        for p in &mut self.positions {
            *p = (*p - center) * scale;
        }

        let (smin, smax) = self
            .scalars
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(a, b), &s| (a.min(s), b.max(s)));
        let range = smax - smin;
        for s in &mut self.scalars {
            *s = if range > 0.0 { (*s - smin) / range } else { 0.0 };
        }

        let gmax = self.gradients.iter().map(|g| g.length()).fold(0.0, f32::max);
        if gmax > 0.0 {
            for g in &mut self.gradients {
                *g /= gmax;
            }
        }

        self.normalized = true;
        log::debug!(
            "normalized mesh: center {center}, scale {scale}, scalar range [{smin}, {smax}]"
        );
        Ok(())
    }

    /// Drops tetrahedra whose four vertex scalars all map to zero opacity.
    pub fn visible_tets(&self, tf: &TransferFunction) -> VisibleTets {
        let tets: Vec<[u32; 4]> = self
            .tets
            .iter()
            .filter(|tet| !tet.iter().all(|&v| tf.is_transparent(self.scalars[v as usize])))
            .copied()
            .collect();
        VisibleTets {
            discarded: self.tets.len() - tets.len(),
            tets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single_tet() -> MeshStore {
        let mut mesh = MeshStore::new();
        mesh.add_vertex(Vec3::new(0.0, 0.0, 0.0), 10.0);
        mesh.add_vertex(Vec3::new(4.0, 0.0, 0.0), 20.0);
        mesh.add_vertex(Vec3::new(0.0, 2.0, 0.0), 30.0);
        mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0), 50.0);
        mesh.add_cell([0, 1, 2, 3]).unwrap();
        mesh
    }

    #[test]
    fn test_add_cell_rejects_bad_index() {
        let mut mesh = single_tet();
        let err = mesh.add_cell([0, 1, 2, 9]).unwrap_err();
        assert!(matches!(err, PtintError::InvalidIndex { index: 9, count: 4 }));
        assert_eq!(mesh.num_tets(), 1);
    }

    #[test]
    fn test_normalize() {
        let mut mesh = single_tet();
        mesh.normalize().unwrap();
        let (lo, hi) = mesh.bounding_box().unwrap();
        assert!((lo + hi).length() < 1e-6);
        assert!((hi.x - 1.0).abs() < 1e-6);
        assert!((hi.y - 0.5).abs() < 1e-6);
        assert_eq!(mesh.scalars(), &[0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_normalize_only_once() {
        let mut mesh = single_tet();
        mesh.normalize().unwrap();
        let before = mesh.positions().to_vec();
        assert!(matches!(mesh.normalize(), Err(PtintError::AlreadyNormalized)));
        assert_eq!(mesh.positions(), before.as_slice());
    }

    #[test]
    fn test_normalize_empty_mesh_fails_untouched() {
        let mut mesh = MeshStore::new();
        mesh.add_vertex(Vec3::new(5.0, 5.0, 5.0), 1.0);
        assert!(matches!(mesh.normalize(), Err(PtintError::EmptyMesh)));
        assert_eq!(mesh.positions()[0], Vec3::splat(5.0));
        assert!(!mesh.is_normalized());
    }

    #[test]
    fn test_constant_scalar_maps_to_zero() {
        let mut mesh = single_tet();
        for i in 0..4 {
            mesh.set_scalar(i, 3.0).unwrap();
        }
        mesh.normalize().unwrap();
        assert!(mesh.scalars().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_gradients_must_cover_all_vertices() {
        let mut mesh = single_tet();
        mesh.add_gradient(Vec3::X);
        assert!(mesh.gradients().is_none());
        assert!(matches!(mesh.validate(), Err(PtintError::SizeMismatch { .. })));
        for _ in 0..3 {
            mesh.add_gradient(Vec3::new(0.0, 2.0, 0.0));
        }
        mesh.normalize().unwrap();
        let g = mesh.gradients().unwrap();
        assert!((g[1].length() - 1.0).abs() < 1e-6);
        assert!((g[0].length() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_max_edge_length() {
        let mesh = single_tet();
        assert!((mesh.max_edge_length() - 20.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_set_scalar_out_of_range() {
        let mut mesh = single_tet();
        assert!(mesh.set_scalar(7, 1.0).is_err());
        assert_eq!(mesh.scalar(3), Some(50.0));
        assert_eq!(mesh.scalar(4), None);
    }

    #[test]
    fn test_visible_tets() {
        let mut mesh = single_tet();
        mesh.add_vertex(Vec3::new(1.0, 1.0, 1.0), 10.0);
        mesh.add_cell([0, 1, 2, 4]).unwrap();
        mesh.add_cell([0, 0, 0, 4]).unwrap();
        mesh.normalize().unwrap();

        let mut tf = TransferFunction::default();
        tf.clear_alpha_range(0.0, 0.3);
        // scalars: 0, 0.25, 0.5, 1, 0
        let visible = mesh.visible_tets(&tf);
        assert_eq!(visible.discarded, 1);
        assert_eq!(visible.tets, vec![[0, 1, 2, 3], [0, 1, 2, 4]]);
    }

    proptest! {
        #[test]
        fn prop_normalize_bounds(
            points in prop::collection::vec(
                (-1000.0f32..1000.0, -1000.0f32..1000.0, -1000.0f32..1000.0, -50.0f32..50.0),
                4..64,
            )
        ) {
            let mut mesh = MeshStore::new();
            for &(x, y, z, s) in &points {
                mesh.add_vertex(Vec3::new(x, y, z), s);
            }
            mesh.add_cell([0, 1, 2, 3]).unwrap();
            let (lo, hi) = mesh.bounding_box().unwrap();
            prop_assume!((hi - lo).max_element() > 1e-3);

            mesh.normalize().unwrap();
            let (lo, hi) = mesh.bounding_box().unwrap();
            let tol = 1e-4;
            prop_assert!(((lo + hi) * 0.5).abs().max_element() < tol);
            prop_assert!(((hi - lo).max_element() * 0.5 - 1.0).abs() < tol);
            for &s in mesh.scalars() {
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }
    }
}
