//! Tetrahedralization of regular grids.

/// How each hexahedral cell is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decomposition {
    #[default]
    Five,
    Six,
}

impl Decomposition {
    pub fn tets_per_cell(self) -> usize {
        match self {
            Self::Five => 5,
            Self::Six => 6,
        }
    }
}

/// Corner `k` of the hexahedron at `(x, y, z)` uses the bit pattern
/// `k = dx + 2 dy + 4 dz`.
fn corner_ids(x: u32, y: u32, z: u32, dims: [u32; 3]) -> [u32; 8] {
    let [dx, dy, _] = dims;
    let id = |x: u32, y: u32, z: u32| x + y * dx + z * dx * dy;
    [
        id(x, y, z),
        id(x + 1, y, z),
        id(x, y + 1, z),
        id(x + 1, y + 1, z),
        id(x, y, z + 1),
        id(x + 1, y, z + 1),
        id(x, y + 1, z + 1),
        id(x + 1, y + 1, z + 1),
    ]
}

/// Five tetrahedra per cell: four corner tetrahedra around a central one.
pub const FIVE_TET_TEMPLATE: [[usize; 4]; 5] = [
    [0, 2, 3, 6],
    [3, 5, 6, 7],
    [0, 4, 5, 6],
    [0, 1, 3, 5],
    [0, 3, 5, 6],
];

/// Six tetrahedra per cell, all sharing the diagonal 1-6.
pub const SIX_TET_TEMPLATE: [[usize; 4]; 6] = [
    [1, 5, 6, 7],
    [1, 2, 3, 6],
    [1, 3, 6, 7],
    [0, 1, 2, 6],
    [1, 0, 4, 6],
    [1, 6, 4, 5],
];

/// Number of tetrahedra a grid of `dims` vertices decomposes into.
pub fn tet_count(dims: [u32; 3], decomposition: Decomposition) -> usize {
    let cells = dims
        .iter()
        .map(|&d| d.saturating_sub(1) as usize)
        .product::<usize>();
    cells * decomposition.tets_per_cell()
}

/// Tetrahedra of a grid with `dims` vertices in x-fastest order.
pub fn tetrahedralize(dims: [u32; 3], decomposition: Decomposition) -> Vec<[u32; 4]> {
    let template: &[[usize; 4]] = match decomposition {
        Decomposition::Five => &FIVE_TET_TEMPLATE,
        Decomposition::Six => &SIX_TET_TEMPLATE,
    };
    let mut tets = Vec::with_capacity(tet_count(dims, decomposition));
    for z in 0..dims[2].saturating_sub(1) {
        for y in 0..dims[1].saturating_sub(1) {
            for x in 0..dims[0].saturating_sub(1) {
                let c = corner_ids(x, y, z, dims);
                tets.extend(template.iter().map(|t| t.map(|k| c[k])));
            }
        }
    }
    tets
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit_cube_volume(template: &[[usize; 4]]) -> f32 {
        let corner =
            |k: usize| Vec3::new((k & 1) as f32, ((k >> 1) & 1) as f32, ((k >> 2) & 1) as f32);
        template
            .iter()
            .map(|t| {
                let [a, b, c, d] = t.map(corner);
                (b - a).dot((c - a).cross(d - a)).abs() / 6.0
            })
            .sum()
    }

    #[test]
    fn test_templates_fill_the_cell() {
        assert!((unit_cube_volume(&FIVE_TET_TEMPLATE) - 1.0).abs() < 1e-6);
        assert!((unit_cube_volume(&SIX_TET_TEMPLATE) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_cell() {
        let tets = tetrahedralize([2, 2, 2], Decomposition::Five);
        assert_eq!(tets.len(), 5);
        assert_eq!(tets[0], [0, 2, 3, 6]);
        assert_eq!(tets[4], [0, 3, 5, 6]);
    }

    #[test]
    fn test_grid_counts_and_indices() {
        let dims = [4, 3, 3];
        for decomposition in [Decomposition::Five, Decomposition::Six] {
            let tets = tetrahedralize(dims, decomposition);
            assert_eq!(tets.len(), tet_count(dims, decomposition));
            assert_eq!(tets.len(), 3 * 2 * 2 * decomposition.tets_per_cell());
            let max = tets.iter().flatten().copied().max().unwrap();
            assert_eq!(max, 4 * 3 * 3 - 1);
        }
    }

    #[test]
    fn test_flat_grid_has_no_cells() {
        assert!(tetrahedralize([5, 5, 1], Decomposition::Six).is_empty());
    }
}
