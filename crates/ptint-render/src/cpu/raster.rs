//! Triangle scan conversion with a top-left fill rule.

use glam::{Vec2, Vec3};

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top or left edge of a triangle with positive [`edge`] area in y-down pixel space.
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

/// Maps NDC to pixel coordinates with a top-left origin.
pub fn ndc_to_pixel(ndc: Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
    )
}

/// Calls `fragment(x, y, barycentric)` for every pixel whose center lies in
/// the triangle. Either winding is accepted; pixels on a shared edge belong
/// to exactly one of the two triangles.
pub fn rasterize_triangle(
    width: u32,
    height: u32,
    triangle: [Vec2; 3],
    mut fragment: impl FnMut(u32, u32, Vec3),
) {
    let [v0, mut v1, mut v2] = triangle;
    let mut area = edge(v0, v1, v2);
    let flipped = area < 0.0;
    if flipped {
        std::mem::swap(&mut v1, &mut v2);
        area = -area;
    }
    if !(area.is_finite() && area > 0.0) {
        return;
    }

    let lo = v0.min(v1).min(v2);
    let hi = v0.max(v1).max(v2);
    let x0 = lo.x.floor().max(0.0) as u32;
    let y0 = lo.y.floor().max(0.0) as u32;
    let x1 = hi.x.ceil().min(width as f32) as u32;
    let y1 = hi.y.ceil().min(height as f32) as u32;

    let top_left = [is_top_left(v1, v2), is_top_left(v2, v0), is_top_left(v0, v1)];
    let covers = |w: f32, tl: bool| w > 0.0 || (w == 0.0 && tl);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w = [edge(v1, v2, p), edge(v2, v0, p), edge(v0, v1, p)];
            if !(0..3).all(|i| covers(w[i], top_left[i])) {
                continue;
            }
            let l = Vec3::from_array(w) / area;
            fragment(x, y, if flipped { Vec3::new(l.x, l.z, l.y) } else { l });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coverage(width: u32, height: u32, triangles: &[[Vec2; 3]]) -> Vec<u32> {
        let mut hits = vec![0; (width * height) as usize];
        for &tri in triangles {
            rasterize_triangle(width, height, tri, |x, y, _| hits[(y * width + x) as usize] += 1);
        }
        hits
    }

    #[test]
    fn test_shared_edge_covered_once() {
        // a 4x4 square split along its diagonal, vertices on pixel centers
        let a = Vec2::new(0.5, 0.5);
        let b = Vec2::new(3.5, 0.5);
        let c = Vec2::new(3.5, 3.5);
        let d = Vec2::new(0.5, 3.5);
        let hits = coverage(4, 4, &[[a, b, c], [a, c, d]]);
        assert!(hits.iter().all(|&h| h <= 1), "{hits:?}");
        // diagonal pixels up to the far corner lie on the shared edge
        for i in 0..3 {
            assert_eq!(hits[i * 4 + i], 1);
        }
    }

    #[test]
    fn test_winding_independent() {
        let tri = [Vec2::new(0.0, 0.0), Vec2::new(8.0, 1.0), Vec2::new(2.0, 7.0)];
        let ccw = coverage(8, 8, &[tri]);
        let cw = coverage(8, 8, &[[tri[0], tri[2], tri[1]]]);
        assert_eq!(ccw, cw);
        assert!(ccw.iter().sum::<u32>() > 10);
    }

    #[test]
    fn test_barycentrics_follow_input_order() {
        let tri = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 16.0), Vec2::new(16.0, 0.0)];
        rasterize_triangle(16, 16, tri, |x, y, l| {
            assert!((l.x + l.y + l.z - 1.0).abs() < 1e-5);
            let p = tri[0] * l.x + tri[1] * l.y + tri[2] * l.z;
            assert!((p - Vec2::new(x as f32 + 0.5, y as f32 + 0.5)).length() < 1e-3);
        });
    }

    #[test]
    fn test_degenerate_and_offscreen() {
        let line = [Vec2::ZERO, Vec2::new(4.0, 4.0), Vec2::new(8.0, 8.0)];
        assert_eq!(coverage(8, 8, &[line]).iter().sum::<u32>(), 0);
        let off = [Vec2::new(-10.0, -10.0), Vec2::new(-5.0, -10.0), Vec2::new(-5.0, -2.0)];
        assert_eq!(coverage(8, 8, &[off]).iter().sum::<u32>(), 0);
    }

    #[test]
    fn test_ndc_to_pixel() {
        assert_eq!(ndc_to_pixel(Vec2::new(-1.0, 1.0), 10, 20), Vec2::ZERO);
        assert_eq!(ndc_to_pixel(Vec2::new(1.0, -1.0), 10, 20), Vec2::new(10.0, 20.0));
    }

    fn grid_point() -> impl Strategy<Value = Vec2> {
        (0u32..=32, 0u32..=32).prop_map(|(x, y)| Vec2::new(x as f32, y as f32))
    }

    proptest! {
        #[test]
        fn test_split_triangle_covers_same_pixels(
            a in grid_point(),
            b in grid_point(),
            c in grid_point(),
            heavy in 0usize..3,
        ) {
            prop_assume!(edge(a, b, c) != 0.0);
            // an interior point on the quarter-pixel grid keeps every edge test exact
            let mut weights = [1.0, 1.0, 1.0];
            weights[heavy] = 2.0;
            let p = (a * weights[0] + b * weights[1] + c * weights[2]) * 0.25;

            let whole = coverage(32, 32, &[[a, b, c]]);
            let split = coverage(32, 32, &[[a, b, p], [b, c, p], [c, a, p]]);
            prop_assert_eq!(whole, split);
        }
    }
}
