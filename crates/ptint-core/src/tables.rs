//! The ternary classification table.
//!
//! A tetrahedron's projection is classified by the sign of the projected area
//! of each of its four faces. Face `i` is the face opposite vertex `i`, wound
//! so that all four faces of a positively oriented tetrahedron point outward:
//!
//! | face | vertices  |
//! |------|-----------|
//! | 0    | 1, 2, 3   |
//! | 1    | 0, 3, 2   |
//! | 2    | 0, 1, 3   |
//! | 3    | 0, 2, 1   |
//!
//! Each face contributes one ternary digit (0 = zero area, 1 = positive,
//! 2 = negative) and the row is `d0 + 3 d1 + 9 d2 + 27 d3`. Flipping the
//! orientation of a tetrahedron swaps 1 and 2 in every digit, and every row
//! and its mirror describe the same projection class, so input meshes need
//! not be consistently oriented.
//!
//! Column comments spell the row as `d0 d1 d2 d3`.

use serde::{Deserialize, Serialize};

/// Number of rows in the classification tables (3^4).
pub const NUM_ROWS: usize = 81;

/// Longest triangle fan emitted for a tetrahedron.
pub const MAX_FAN: usize = 6;

/// Projection class of a tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionClass {
    /// Two front and two back faces: the projection is a quadrilateral whose
    /// diagonals are two opposite edges. The thick vertex is their crossing.
    Crossing,
    /// One face against three: one vertex projects inside the triangle of
    /// the other three and is the thick vertex.
    Interior,
    /// One face is seen edge-on: a vertex projects onto the segment of two
    /// others and is the thick vertex.
    OnEdge,
    /// Two faces are seen edge-on: two vertices project onto the same point.
    Coincident,
    /// No valid projection (impossible sign pattern or zero projected area).
    Degenerate,
}

/// Vertex permutation used by the classifier, per row.
///
/// - `Crossing`: `[a, b, c, d]`, edges `ab` and `cd` cross on screen.
/// - `Interior`: `[m, o1, o2, o3]`, `m` projects inside triangle `o1 o2 o3`.
/// - `OnEdge`: `[m, e1, e2, apex]`, `m` projects onto segment `e1 e2`.
/// - `Coincident`: `[k, l, i, j]`, `k` and `l` project onto the same point.
pub const ORDER_TABLE: [[u8; 4]; NUM_ROWS] = [
    [0, 1, 2, 3], //  0: 0000 Degenerate
    [0, 1, 2, 3], //  1: 1000 Degenerate
    [0, 1, 2, 3], //  2: 2000 Degenerate
    [0, 1, 2, 3], //  3: 0100 Degenerate
    [0, 1, 2, 3], //  4: 1100 Degenerate
    [0, 1, 2, 3], //  5: 2100 Coincident
    [0, 1, 2, 3], //  6: 0200 Degenerate
    [0, 1, 2, 3], //  7: 1200 Coincident
    [0, 1, 2, 3], //  8: 2200 Degenerate
    [0, 1, 2, 3], //  9: 0010 Degenerate
    [0, 1, 2, 3], // 10: 1010 Degenerate
    [0, 2, 1, 3], // 11: 2010 Coincident
    [0, 1, 2, 3], // 12: 0110 Degenerate
    [0, 1, 2, 3], // 13: 1110 Degenerate
    [0, 1, 2, 3], // 14: 2110 OnEdge
    [1, 2, 0, 3], // 15: 0210 Coincident
    [1, 0, 2, 3], // 16: 1210 OnEdge
    [2, 0, 1, 3], // 17: 2210 OnEdge
    [0, 1, 2, 3], // 18: 0020 Degenerate
    [0, 2, 1, 3], // 19: 1020 Coincident
    [0, 1, 2, 3], // 20: 2020 Degenerate
    [1, 2, 0, 3], // 21: 0120 Coincident
    [2, 0, 1, 3], // 22: 1120 OnEdge
    [1, 0, 2, 3], // 23: 2120 OnEdge
    [0, 1, 2, 3], // 24: 0220 Degenerate
    [0, 1, 2, 3], // 25: 1220 OnEdge
    [0, 1, 2, 3], // 26: 2220 Degenerate
    [0, 1, 2, 3], // 27: 0001 Degenerate
    [0, 1, 2, 3], // 28: 1001 Degenerate
    [0, 3, 1, 2], // 29: 2001 Coincident
    [0, 1, 2, 3], // 30: 0101 Degenerate
    [0, 1, 2, 3], // 31: 1101 Degenerate
    [0, 1, 3, 2], // 32: 2101 OnEdge
    [1, 3, 0, 2], // 33: 0201 Coincident
    [1, 0, 3, 2], // 34: 1201 OnEdge
    [3, 0, 1, 2], // 35: 2201 OnEdge
    [0, 1, 2, 3], // 36: 0011 Degenerate
    [0, 1, 2, 3], // 37: 1011 Degenerate
    [0, 2, 3, 1], // 38: 2011 OnEdge
    [0, 1, 2, 3], // 39: 0111 Degenerate
    [0, 1, 2, 3], // 40: 1111 Degenerate
    [0, 1, 2, 3], // 41: 2111 Interior
    [1, 2, 3, 0], // 42: 0211 OnEdge
    [1, 0, 2, 3], // 43: 1211 Interior
    [2, 3, 0, 1], // 44: 2211 Crossing
    [2, 3, 0, 1], // 45: 0021 Coincident
    [2, 0, 3, 1], // 46: 1021 OnEdge
    [3, 0, 2, 1], // 47: 2021 OnEdge
    [2, 1, 3, 0], // 48: 0121 OnEdge
    [2, 0, 1, 3], // 49: 1121 Interior
    [1, 3, 0, 2], // 50: 2121 Crossing
    [3, 1, 2, 0], // 51: 0221 OnEdge
    [0, 3, 1, 2], // 52: 1221 Crossing
    [3, 0, 1, 2], // 53: 2221 Interior
    [0, 1, 2, 3], // 54: 0002 Degenerate
    [0, 3, 1, 2], // 55: 1002 Coincident
    [0, 1, 2, 3], // 56: 2002 Degenerate
    [1, 3, 0, 2], // 57: 0102 Coincident
    [3, 0, 1, 2], // 58: 1102 OnEdge
    [1, 0, 3, 2], // 59: 2102 OnEdge
    [0, 1, 2, 3], // 60: 0202 Degenerate
    [0, 1, 3, 2], // 61: 1202 OnEdge
    [0, 1, 2, 3], // 62: 2202 Degenerate
    [2, 3, 0, 1], // 63: 0012 Coincident
    [3, 0, 2, 1], // 64: 1012 OnEdge
    [2, 0, 3, 1], // 65: 2012 OnEdge
    [3, 1, 2, 0], // 66: 0112 OnEdge
    [3, 0, 1, 2], // 67: 1112 Interior
    [1, 2, 0, 3], // 68: 2112 Crossing
    [2, 1, 3, 0], // 69: 0212 OnEdge
    [0, 2, 1, 3], // 70: 1212 Crossing
    [2, 0, 1, 3], // 71: 2212 Interior
    [0, 1, 2, 3], // 72: 0022 Degenerate
    [0, 2, 3, 1], // 73: 1022 OnEdge
    [0, 1, 2, 3], // 74: 2022 Degenerate
    [1, 2, 3, 0], // 75: 0122 OnEdge
    [0, 1, 2, 3], // 76: 1122 Crossing
    [1, 0, 2, 3], // 77: 2122 Interior
    [0, 1, 2, 3], // 78: 0222 Degenerate
    [0, 1, 2, 3], // 79: 1222 Interior
    [0, 1, 2, 3], // 80: 2222 Degenerate
];

/// Triangle fan order, per row.
///
/// Entry 0 names the tetrahedron vertex used as the thick vertex when the fan
/// count is below 6 (for `Crossing` rows the thick vertex is synthetic).
/// Entries `1..FAN_COUNT[row]` are the remaining fan vertices after the thick
/// vertex; unused entries are zero.
pub const FAN_TABLE: [[u8; MAX_FAN]; NUM_ROWS] = [
    [0, 1, 2, 3, 0, 0], //  0: 0000 Degenerate
    [0, 1, 2, 3, 0, 0], //  1: 1000 Degenerate
    [0, 1, 2, 3, 0, 0], //  2: 2000 Degenerate
    [0, 1, 2, 3, 0, 0], //  3: 0100 Degenerate
    [0, 1, 2, 3, 0, 0], //  4: 1100 Degenerate
    [0, 2, 3, 1, 0, 0], //  5: 2100 Coincident
    [0, 1, 2, 3, 0, 0], //  6: 0200 Degenerate
    [0, 2, 3, 1, 0, 0], //  7: 1200 Coincident
    [0, 1, 2, 3, 0, 0], //  8: 2200 Degenerate
    [0, 1, 2, 3, 0, 0], //  9: 0010 Degenerate
    [0, 1, 2, 3, 0, 0], // 10: 1010 Degenerate
    [0, 1, 3, 2, 0, 0], // 11: 2010 Coincident
    [0, 1, 2, 3, 0, 0], // 12: 0110 Degenerate
    [0, 1, 2, 3, 0, 0], // 13: 1110 Degenerate
    [0, 1, 3, 2, 0, 0], // 14: 2110 OnEdge
    [1, 0, 3, 2, 0, 0], // 15: 0210 Coincident
    [1, 0, 3, 2, 0, 0], // 16: 1210 OnEdge
    [2, 0, 3, 1, 0, 0], // 17: 2210 OnEdge
    [0, 1, 2, 3, 0, 0], // 18: 0020 Degenerate
    [0, 1, 3, 2, 0, 0], // 19: 1020 Coincident
    [0, 1, 2, 3, 0, 0], // 20: 2020 Degenerate
    [1, 0, 3, 2, 0, 0], // 21: 0120 Coincident
    [2, 0, 3, 1, 0, 0], // 22: 1120 OnEdge
    [1, 0, 3, 2, 0, 0], // 23: 2120 OnEdge
    [0, 1, 2, 3, 0, 0], // 24: 0220 Degenerate
    [0, 1, 3, 2, 0, 0], // 25: 1220 OnEdge
    [0, 1, 2, 3, 0, 0], // 26: 2220 Degenerate
    [0, 1, 2, 3, 0, 0], // 27: 0001 Degenerate
    [0, 1, 2, 3, 0, 0], // 28: 1001 Degenerate
    [0, 1, 2, 3, 0, 0], // 29: 2001 Coincident
    [0, 1, 2, 3, 0, 0], // 30: 0101 Degenerate
    [0, 1, 2, 3, 0, 0], // 31: 1101 Degenerate
    [0, 1, 2, 3, 0, 0], // 32: 2101 OnEdge
    [1, 0, 2, 3, 0, 0], // 33: 0201 Coincident
    [1, 0, 2, 3, 0, 0], // 34: 1201 OnEdge
    [3, 0, 2, 1, 0, 0], // 35: 2201 OnEdge
    [0, 1, 2, 3, 0, 0], // 36: 0011 Degenerate
    [0, 1, 2, 3, 0, 0], // 37: 1011 Degenerate
    [0, 2, 1, 3, 0, 0], // 38: 2011 OnEdge
    [0, 1, 2, 3, 0, 0], // 39: 0111 Degenerate
    [0, 1, 2, 3, 0, 0], // 40: 1111 Degenerate
    [0, 1, 2, 3, 1, 0], // 41: 2111 Interior
    [1, 2, 0, 3, 0, 0], // 42: 0211 OnEdge
    [1, 0, 2, 3, 0, 0], // 43: 1211 Interior
    [2, 2, 0, 3, 1, 2], // 44: 2211 Crossing
    [2, 0, 1, 3, 0, 0], // 45: 0021 Coincident
    [2, 0, 1, 3, 0, 0], // 46: 1021 OnEdge
    [3, 0, 1, 2, 0, 0], // 47: 2021 OnEdge
    [2, 1, 0, 3, 0, 0], // 48: 0121 OnEdge
    [2, 0, 1, 3, 0, 0], // 49: 1121 Interior
    [1, 1, 0, 3, 2, 1], // 50: 2121 Crossing
    [3, 1, 0, 2, 0, 0], // 51: 0221 OnEdge
    [0, 0, 1, 3, 2, 0], // 52: 1221 Crossing
    [3, 0, 1, 2, 0, 0], // 53: 2221 Interior
    [0, 1, 2, 3, 0, 0], // 54: 0002 Degenerate
    [0, 1, 2, 3, 0, 0], // 55: 1002 Coincident
    [0, 1, 2, 3, 0, 0], // 56: 2002 Degenerate
    [1, 0, 2, 3, 0, 0], // 57: 0102 Coincident
    [3, 0, 2, 1, 0, 0], // 58: 1102 OnEdge
    [1, 0, 2, 3, 0, 0], // 59: 2102 OnEdge
    [0, 1, 2, 3, 0, 0], // 60: 0202 Degenerate
    [0, 1, 2, 3, 0, 0], // 61: 1202 OnEdge
    [0, 1, 2, 3, 0, 0], // 62: 2202 Degenerate
    [2, 0, 1, 3, 0, 0], // 63: 0012 Coincident
    [3, 0, 1, 2, 0, 0], // 64: 1012 OnEdge
    [2, 0, 1, 3, 0, 0], // 65: 2012 OnEdge
    [3, 1, 0, 2, 0, 0], // 66: 0112 OnEdge
    [3, 0, 1, 2, 0, 0], // 67: 1112 Interior
    [1, 1, 0, 2, 3, 1], // 68: 2112 Crossing
    [2, 1, 0, 3, 0, 0], // 69: 0212 OnEdge
    [0, 0, 1, 2, 3, 0], // 70: 1212 Crossing
    [2, 0, 1, 3, 0, 0], // 71: 2212 Interior
    [0, 1, 2, 3, 0, 0], // 72: 0022 Degenerate
    [0, 2, 1, 3, 0, 0], // 73: 1022 OnEdge
    [0, 1, 2, 3, 0, 0], // 74: 2022 Degenerate
    [1, 2, 0, 3, 0, 0], // 75: 0122 OnEdge
    [0, 0, 2, 1, 3, 0], // 76: 1122 Crossing
    [1, 0, 2, 3, 0, 0], // 77: 2122 Interior
    [0, 1, 2, 3, 0, 0], // 78: 0222 Degenerate
    [0, 1, 2, 3, 1, 0], // 79: 1222 Interior
    [0, 1, 2, 3, 0, 0], // 80: 2222 Degenerate
];

/// Triangle fan length (thick vertex included), per row.
pub const FAN_COUNT: [u8; NUM_ROWS] = [
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 4, 5, 6, 4, 4, 4, 4, 5, 6, 4, 6, 5,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 6, 4, 6, 5, 4, 4, 4, 4, 6, 5, 4, 5, 4,
];

/// Projection class, per row.
pub const CLASS_TABLE: [ProjectionClass; NUM_ROWS] = [
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::Degenerate,
    ProjectionClass::Interior,
    ProjectionClass::OnEdge,
    ProjectionClass::Interior,
    ProjectionClass::Crossing,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Interior,
    ProjectionClass::Crossing,
    ProjectionClass::OnEdge,
    ProjectionClass::Crossing,
    ProjectionClass::Interior,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::Coincident,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::OnEdge,
    ProjectionClass::Interior,
    ProjectionClass::Crossing,
    ProjectionClass::OnEdge,
    ProjectionClass::Crossing,
    ProjectionClass::Interior,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Degenerate,
    ProjectionClass::OnEdge,
    ProjectionClass::Crossing,
    ProjectionClass::Interior,
    ProjectionClass::Degenerate,
    ProjectionClass::Interior,
    ProjectionClass::Degenerate,
];

/// Ternary digit for one signed face area.
#[must_use]
pub fn face_digit(area: f32, epsilon: f32) -> u32 {
    if area > epsilon {
        1
    } else if area < -epsilon {
        2
    } else {
        0
    }
}

/// Combines four face digits into a table row.
#[must_use]
pub fn row_index(digits: [u32; 4]) -> usize {
    (digits[0] + 3 * digits[1] + 9 * digits[2] + 27 * digits[3]) as usize
}

/// Whether the fan of this row starts at a synthetic (already projected) vertex.
#[must_use]
pub fn has_synthetic_thick_vertex(row: usize) -> bool {
    FAN_COUNT[row] as usize == MAX_FAN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(row: usize) -> [u32; 4] {
        let mut d = [0; 4];
        let mut r = row as u32;
        for digit in &mut d {
            *digit = r % 3;
            r /= 3;
        }
        d
    }

    #[test]
    fn test_row_index_round_trip() {
        for row in 0..NUM_ROWS {
            assert_eq!(row_index(digits(row)), row);
        }
    }

    #[test]
    fn test_counts_within_bounds() {
        for row in 0..NUM_ROWS {
            let count = FAN_COUNT[row] as usize;
            assert!((4..=MAX_FAN).contains(&count), "row {row}");
            assert_eq!(count == MAX_FAN, CLASS_TABLE[row] == ProjectionClass::Crossing);
        }
    }

    #[test]
    fn test_order_rows_are_permutations() {
        for row in 0..NUM_ROWS {
            let mut seen = [false; 4];
            for &v in &ORDER_TABLE[row] {
                assert!(v < 4);
                seen[v as usize] = true;
            }
            assert!(seen.iter().all(|&s| s), "row {row} is not a permutation");
        }
    }

    #[test]
    fn test_fans_cover_all_vertices() {
        for row in 0..NUM_ROWS {
            let count = FAN_COUNT[row] as usize;
            let fan = &FAN_TABLE[row];
            let mut seen = [false; 4];
            let first = usize::from(has_synthetic_thick_vertex(row));
            for &v in &fan[first..count] {
                seen[v as usize] = true;
            }
            assert!(seen.iter().all(|&s| s), "row {row} fan misses a vertex");
        }
    }

    #[test]
    fn test_mirrored_rows_share_class() {
        for row in 0..NUM_ROWS {
            let mirrored = digits(row).map(|d| match d {
                1 => 2,
                2 => 1,
                other => other,
            });
            assert_eq!(CLASS_TABLE[row], CLASS_TABLE[row_index(mirrored)]);
            assert_eq!(FAN_COUNT[row], FAN_COUNT[row_index(mirrored)]);
        }
    }

    #[test]
    fn test_known_rows() {
        // faces 0, 1 positive and 2, 3 negative: edges 01 and 23 cross
        let row = row_index([1, 1, 2, 2]);
        assert_eq!(CLASS_TABLE[row], ProjectionClass::Crossing);
        assert_eq!(ORDER_TABLE[row], [0, 1, 2, 3]);
        assert_eq!(&FAN_TABLE[row][1..6], &[0, 2, 1, 3, 0]);

        // face 3 alone: vertex 3 is inside triangle 0 1 2
        let row = row_index([1, 1, 1, 2]);
        assert_eq!(CLASS_TABLE[row], ProjectionClass::Interior);
        assert_eq!(FAN_TABLE[row][0], 3);
        assert_eq!(FAN_COUNT[row], 5);

        assert_eq!(CLASS_TABLE[0], ProjectionClass::Degenerate);
        assert_eq!(CLASS_TABLE[row_index([1, 1, 1, 1])], ProjectionClass::Degenerate);
    }

    #[test]
    fn test_face_digit() {
        assert_eq!(face_digit(0.5, 1e-6), 1);
        assert_eq!(face_digit(-0.5, 1e-6), 2);
        assert_eq!(face_digit(1e-9, 1e-6), 0);
    }
}
