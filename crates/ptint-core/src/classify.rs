//! First-step classification of one tetrahedron against a view.
//!
//! This is the reference implementation of the first step; the GPU compute
//! shader follows the same arithmetic so both backends emit identical
//! records up to float rounding.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::mesh_view::{MeshView, TetCorners};
use crate::tables::{face_digit, row_index, FAN_COUNT, ORDER_TABLE};

/// Vertex order of each face, indexed by the opposite vertex.
pub const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// Relative tolerance below which a projected face counts as edge-on.
pub const AREA_EPSILON: f32 = 1.0e-6;

/// Number of RGBA quads one record occupies in the first-step output.
pub const QUADS_PER_RECORD: usize = 4;

/// Model-view and projection of the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl ViewTransform {
    pub fn new(model_view: Mat4, projection: Mat4) -> Self {
        Self {
            model_view,
            projection,
        }
    }

    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.model_view
    }
}

/// Per-tetrahedron, per-frame classification output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassificationRecord {
    /// Classification table row (0-80).
    pub row: u32,
    /// Triangle fan length (4-6).
    pub fan_count: u32,
    /// NDC position of the thick vertex.
    pub thick_position: Vec2,
    /// NDC depth of the front point of the thick vertex.
    pub thick_depth: f32,
    pub scalar_front: f32,
    pub scalar_back: f32,
    /// Eye-space length of the ray segment through the thick vertex.
    pub thickness: f32,
    /// Eye-space z of the centroid; ascending order is back to front.
    pub centroid_depth: f32,
    pub gradient_front: Vec3,
    pub gradient_back: Vec3,
}

impl ClassificationRecord {
    /// Packs the record into its four output quads:
    /// `(ix, iy, thickness, row)`, `(sf, sb, centroid depth, count)`,
    /// `(gradient front, thick depth)`, `(gradient back, 0)`.
    pub fn encode(&self) -> [[f32; 4]; QUADS_PER_RECORD] {
        [
            [
                self.thick_position.x,
                self.thick_position.y,
                self.thickness,
                self.row as f32,
            ],
            [
                self.scalar_front,
                self.scalar_back,
                self.centroid_depth,
                self.fan_count as f32,
            ],
            self.gradient_front.extend(self.thick_depth).to_array(),
            self.gradient_back.extend(0.0).to_array(),
        ]
    }

    /// Inverse of [`Self::encode`].
    pub fn decode(quads: &[[f32; 4]]) -> Self {
        let [q0, q1, q2, q3] = [quads[0], quads[1], quads[2], quads[3]];
        Self {
            row: q0[3].round() as u32,
            fan_count: q1[3].round() as u32,
            thick_position: Vec2::new(q0[0], q0[1]),
            thick_depth: q2[3],
            scalar_front: q1[0],
            scalar_back: q1[1],
            thickness: q0[2],
            centroid_depth: q1[2],
            gradient_front: Vec3::new(q2[0], q2[1], q2[2]),
            gradient_back: Vec3::new(q3[0], q3[1], q3[2]),
        }
    }
}

/// Decodes the first `count` records of a slot buffer.
pub fn decode_records(quads: &[[f32; 4]], count: usize) -> Vec<ClassificationRecord> {
    quads
        .chunks_exact(QUADS_PER_RECORD)
        .take(count)
        .map(ClassificationRecord::decode)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Projected {
    eye: Vec3,
    screen: Vec2,
    w: f32,
}

/// A point inside the tetrahedron with its interpolated attributes.
#[derive(Debug, Clone, Copy)]
struct Sample {
    eye: Vec3,
    scalar: f32,
    gradient: Vec3,
}

impl Sample {
    fn vertex(c: &TetCorners, p: &[Projected; 4], i: usize) -> Self {
        Self {
            eye: p[i].eye,
            scalar: c.scalars[i],
            gradient: c.gradients[i],
        }
    }

    fn on_edge(c: &TetCorners, p: &[Projected; 4], a: usize, b: usize, t: f32) -> Self {
        let t = perspective_param(t, p[a].w, p[b].w);
        Self {
            eye: p[a].eye.lerp(p[b].eye, t),
            scalar: c.scalars[a] + (c.scalars[b] - c.scalars[a]) * t,
            gradient: c.gradients[a].lerp(c.gradients[b], t),
        }
    }
}

/// Converts a screen-space edge parameter to the object-space parameter.
fn perspective_param(t: f32, wa: f32, wb: f32) -> f32 {
    let num = t / wb;
    let den = (1.0 - t) / wa + num;
    if den.abs() <= f32::EPSILON {
        t
    } else {
        (num / den).clamp(0.0, 1.0)
    }
}

fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Projection parameter of `p` on segment `a b`, clamped to the segment.
fn segment_param(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON * f32::EPSILON {
        0.0
    } else {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    }
}

/// Classification table row of four projected vertices.
pub fn classification_row(screen: [Vec2; 4]) -> usize {
    let areas = FACES.map(|[a, b, c]| signed_area(screen[a], screen[b], screen[c]));
    let scale: f32 = areas.iter().map(|a| a.abs()).sum();
    if scale <= f32::MIN_POSITIVE {
        return 0;
    }
    let eps = scale * AREA_EPSILON;
    row_index(areas.map(|a| face_digit(a, eps)))
}

/// Classifies one tetrahedron.
pub fn classify_tet(corners: &TetCorners, view: &ViewTransform) -> ClassificationRecord {
    let p: [Projected; 4] = corners.positions.map(|pos| {
        let eye = view.model_view.transform_point3(pos);
        let clip = view.projection * eye.extend(1.0);
        let w = if clip.w.abs() <= f32::EPSILON { f32::EPSILON } else { clip.w };
        Projected {
            eye,
            screen: Vec2::new(clip.x / w, clip.y / w),
            w,
        }
    });

    let row = classification_row(p.map(|v| v.screen));
    let fan_count = u32::from(FAN_COUNT[row]);
    let [o0, o1, o2, o3] = ORDER_TABLE[row].map(usize::from);

    let (thick_position, first, second) = match fan_count {
        6 => {
            // edges o0-o1 and o2-o3 cross on screen
            let (a, b, c, d) = (p[o0].screen, p[o1].screen, p[o2].screen, p[o3].screen);
            let ab = b - a;
            let cd = d - c;
            let denom = ab.perp_dot(cd);
            let (t, u) = if denom.abs() <= f32::EPSILON {
                (0.5, 0.5)
            } else {
                (
                    ((c - a).perp_dot(cd) / denom).clamp(0.0, 1.0),
                    ((c - a).perp_dot(ab) / denom).clamp(0.0, 1.0),
                )
            };
            (
                a + ab * t,
                Sample::on_edge(corners, &p, o0, o1, t),
                Sample::on_edge(corners, &p, o2, o3, u),
            )
        }
        5 => {
            // o0 projects inside triangle o1 o2 o3
            let (m, a, b, c) = (p[o0].screen, p[o1].screen, p[o2].screen, p[o3].screen);
            let total = signed_area(a, b, c);
            let mut lambda = if total.abs() <= f32::MIN_POSITIVE {
                Vec3::splat(1.0 / 3.0)
            } else {
                Vec3::new(signed_area(m, b, c) / total, signed_area(a, m, c) / total, 0.0)
            };
            lambda.z = 1.0 - lambda.x - lambda.y;
            let lambda = lambda.max(Vec3::ZERO);
            // perspective-correct barycentrics
            let persp = lambda / Vec3::new(p[o1].w, p[o2].w, p[o3].w);
            let sum = persp.x + persp.y + persp.z;
            let l = if sum <= f32::MIN_POSITIVE { Vec3::splat(1.0 / 3.0) } else { persp / sum };
            let s = &corners.scalars;
            let g = &corners.gradients;
            let face = Sample {
                eye: p[o1].eye * l.x + p[o2].eye * l.y + p[o3].eye * l.z,
                scalar: s[o1] * l.x + s[o2] * l.y + s[o3] * l.z,
                gradient: g[o1] * l.x + g[o2] * l.y + g[o3] * l.z,
            };
            (m, Sample::vertex(corners, &p, o0), face)
        }
        _ => {
            // o0 projects onto segment o1 o2 (or onto o1 itself)
            let t = segment_param(p[o0].screen, p[o1].screen, p[o2].screen);
            (
                p[o0].screen,
                Sample::vertex(corners, &p, o0),
                Sample::on_edge(corners, &p, o1, o2, t),
            )
        }
    };

    // the camera looks down -z, so larger eye z is nearer
    let (front, back) = if first.eye.z >= second.eye.z {
        (first, second)
    } else {
        (second, first)
    };
    let front_clip = view.projection * front.eye.extend(1.0);
    let thick_depth = if front_clip.w.abs() <= f32::EPSILON {
        front_clip.z
    } else {
        front_clip.z / front_clip.w
    };
    let centroid_depth = p.iter().map(|v| v.eye.z).sum::<f32>() * 0.25;

    ClassificationRecord {
        row: row as u32,
        fan_count,
        thick_position,
        thick_depth,
        scalar_front: front.scalar,
        scalar_back: back.scalar,
        thickness: front.eye.distance(back.eye),
        centroid_depth,
        gradient_front: front.gradient,
        gradient_back: back.gradient,
    }
}

/// Classifies every tetrahedron of a mesh, in tetrahedron order.
pub fn classify_mesh(mesh: &MeshView<'_>, view: &ViewTransform) -> Vec<ClassificationRecord> {
    (0..mesh.num_tets())
        .map(|t| classify_tet(&mesh.corners(t), view))
        .collect()
}

/// Projects a point with a full model-view-projection matrix into NDC.
pub fn project_to_ndc(mvp: &Mat4, p: Vec3) -> Vec3 {
    let clip: Vec4 = *mvp * p.extend(1.0);
    clip.truncate() / clip.w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{ProjectionClass, CLASS_TABLE, FAN_TABLE};

    fn ortho_view() -> ViewTransform {
        ViewTransform::new(
            Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)),
            Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, 0.1, 10.0),
        )
    }

    fn corners(positions: [Vec3; 4], scalars: [f32; 4]) -> TetCorners {
        TetCorners {
            positions,
            scalars,
            gradients: [Vec3::ZERO; 4],
        }
    }

    #[test]
    fn test_interior_vertex() {
        let c = corners(
            [
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, -0.2, 0.5),
            ],
            [0.0, 0.0, 0.0, 1.0],
        );
        let r = classify_tet(&c, &ortho_view());
        let row = r.row as usize;
        assert_eq!(CLASS_TABLE[row], ProjectionClass::Interior);
        assert_eq!(r.fan_count, 5);
        assert_eq!(FAN_TABLE[row][0], 3);
        assert!((r.thickness - 0.5).abs() < 1e-5);
        assert!((r.scalar_front - 1.0).abs() < 1e-6);
        assert!(r.scalar_back.abs() < 1e-6);
        assert!((r.thick_position - Vec2::new(0.0, -0.1)).length() < 1e-5);
    }

    #[test]
    fn test_crossing_edges() {
        let c = corners(
            [
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, -1.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            [0.0, 0.2, 0.6, 1.0],
        );
        let r = classify_tet(&c, &ortho_view());
        assert_eq!(CLASS_TABLE[r.row as usize], ProjectionClass::Crossing);
        assert_eq!(r.fan_count, 6);
        assert!(r.thick_position.length() < 1e-5);
        assert!((r.thickness - 1.0).abs() < 1e-5);
        // the cd edge is nearer the camera
        assert!((r.scalar_front - 0.8).abs() < 1e-5);
        assert!((r.scalar_back - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_coincident_vertices() {
        let c = corners(
            [
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            [0.25, 0.0, 0.0, 0.75],
        );
        let r = classify_tet(&c, &ortho_view());
        assert_eq!(CLASS_TABLE[r.row as usize], ProjectionClass::Coincident);
        assert_eq!(r.fan_count, 4);
        assert!((r.thickness - 1.0).abs() < 1e-5);
        assert!((r.scalar_front - 0.75).abs() < 1e-6);
        assert!((r.scalar_back - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_does_not_panic() {
        let c = corners([Vec3::ZERO; 4], [0.5; 4]);
        let r = classify_tet(&c, &ortho_view());
        assert_eq!(r.row, 0);
        assert_eq!(r.fan_count, 4);
        assert_eq!(r.thickness, 0.0);
    }

    #[test]
    fn test_centroid_depth_is_mean_eye_z() {
        let c = corners(
            [
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, -0.2, 1.0),
            ],
            [0.0; 4],
        );
        let r = classify_tet(&c, &ortho_view());
        assert!((r.centroid_depth - (-3.0 + 0.25)).abs() < 1e-5);
    }

    #[test]
    fn test_perspective_param() {
        assert_eq!(perspective_param(0.5, 1.0, 1.0), 0.5);
        // the nearer endpoint covers more of the screen
        assert!(perspective_param(0.5, 1.0, 3.0) < 0.5);
        assert_eq!(perspective_param(0.0, 2.0, 5.0), 0.0);
        assert_eq!(perspective_param(1.0, 2.0, 5.0), 1.0);
    }

    #[test]
    fn test_encode_decode() {
        let r = ClassificationRecord {
            row: 76,
            fan_count: 6,
            thick_position: Vec2::new(0.25, -0.5),
            thick_depth: 0.4,
            scalar_front: 0.3,
            scalar_back: 0.9,
            thickness: 0.7,
            centroid_depth: -2.5,
            gradient_front: Vec3::X,
            gradient_back: Vec3::Y,
        };
        let quads = r.encode();
        assert_eq!(ClassificationRecord::decode(&quads), r);
    }
}
