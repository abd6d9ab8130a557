//! Borrowed view of a tetrahedral mesh, shared by the classifier and the array builder.

use glam::Vec3;

/// Read-only slices of one loaded mesh.
#[derive(Debug, Clone, Copy)]
pub struct MeshView<'a> {
    pub positions: &'a [Vec3],
    pub scalars: &'a [f32],
    pub gradients: Option<&'a [Vec3]>,
    pub tets: &'a [[u32; 4]],
}

impl<'a> MeshView<'a> {
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_tets(&self) -> usize {
        self.tets.len()
    }

    /// The same vertices with a different set of tetrahedra.
    #[must_use]
    pub fn with_tets(self, tets: &'a [[u32; 4]]) -> Self {
        Self { tets, ..self }
    }

    /// Corner data of one tetrahedron.
    pub fn corners(&self, tet: usize) -> TetCorners {
        let ids = self.tets[tet];
        let positions = ids.map(|v| self.positions[v as usize]);
        let scalars = ids.map(|v| self.scalars[v as usize]);
        let gradients = self
            .gradients
            .map_or([Vec3::ZERO; 4], |g| ids.map(|v| g[v as usize]));
        TetCorners {
            positions,
            scalars,
            gradients,
        }
    }
}

/// Positions, scalars and gradients of the four corners of one tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetCorners {
    pub positions: [Vec3; 4],
    pub scalars: [f32; 4],
    pub gradients: [Vec3; 4],
}
