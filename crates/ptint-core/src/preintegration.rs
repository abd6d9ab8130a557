//! Partial pre-integration.
//!
//! For a ray segment whose extinction varies linearly from `a` (front) to
//! `b` (back), both already multiplied by the segment length, the emitted
//! color of a linearly varying source term is
//!
//! ```text
//! C = Cb (Psi - zeta) + Cf (1 - Psi),   alpha = 1 - zeta
//! zeta = exp(-(a + b) / 2)
//! Psi  = integral_0^1 exp(-(a t + (b - a) t^2 / 2)) dt
//! ```
//!
//! `Psi` only depends on `a` and `b`, so it is tabulated once over
//! `gamma = x / (1 + x)`, which maps `[0, inf)` onto `[0, 1)`.

use glam::{Vec3, Vec4};

const QUADRATURE_STEPS: usize = 128;
const MAX_OPTICAL_DEPTH: f32 = 1.0e4;

/// Evaluates `Psi(a, b)` by composite Simpson quadrature.
pub fn psi(a: f32, b: f32) -> f32 {
    let f = |t: f32| (-(a * t + (b - a) * t * t * 0.5)).exp();
    let h = 1.0 / QUADRATURE_STEPS as f32;
    let mut sum = f(0.0) + f(1.0);
    for k in 1..QUADRATURE_STEPS {
        let w = if k % 2 == 1 { 4.0 } else { 2.0 };
        sum += w * f(k as f32 * h);
    }
    (sum * h / 3.0).clamp(0.0, 1.0)
}

/// Maps an optical depth to the table coordinate `x / (1 + x)`.
pub fn gamma(depth: f32) -> f32 {
    let d = depth.max(0.0);
    d / (1.0 + d)
}

fn depth_of(gamma: f32) -> f32 {
    if gamma >= 1.0 {
        MAX_OPTICAL_DEPTH
    } else {
        (gamma / (1.0 - gamma)).min(MAX_OPTICAL_DEPTH)
    }
}

/// Square table of `Psi` indexed by `(gamma_front, gamma_back)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PsiTable {
    size: usize,
    /// Row-major, `data[back * size + front]`.
    data: Vec<f32>,
}

impl PsiTable {
    /// Tabulates `Psi` on a `size` x `size` grid over `[0, 1]^2`.
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let step = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size);
        for j in 0..size {
            let b = depth_of(j as f32 * step);
            for i in 0..size {
                data.push(psi(depth_of(i as f32 * step), b));
            }
        }
        log::debug!("computed {size}x{size} pre-integration table");
        Self { size, data }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Raw table, row-major by back gamma.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Bilinear lookup at `(gamma_front, gamma_back)`.
    pub fn sample(&self, gamma_front: f32, gamma_back: f32) -> f32 {
        let n = self.size - 1;
        let x = gamma_front.clamp(0.0, 1.0) * n as f32;
        let y = gamma_back.clamp(0.0, 1.0) * n as f32;
        let (x0, y0) = ((x as usize).min(n - 1), (y as usize).min(n - 1));
        let (fx, fy) = (x - x0 as f32, y - y0 as f32);
        let at = |i: usize, j: usize| self.data[j * self.size + i];
        let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
        let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Composites one ray segment.
///
/// `front` and `back` are transfer function entries (RGB color, alpha used
/// as extinction coefficient), `length` is the brightness-scaled, normalized
/// segment length. Returns a premultiplied RGBA color. Without a table the
/// averaged exponential attenuation is used.
pub fn composite_segment(front: Vec4, back: Vec4, length: f32, table: Option<&PsiTable>) -> Vec4 {
    let a = front.w * length;
    let b = back.w * length;
    match table {
        Some(table) => {
            let zeta = (-(a + b) * 0.5).exp();
            let p = table.sample(gamma(a), gamma(b));
            let color = back.truncate() * (p - zeta).max(0.0) + front.truncate() * (1.0 - p);
            color.extend(1.0 - zeta)
        }
        None => {
            let alpha = 1.0 - (-(a + b) * 0.5).exp();
            let color: Vec3 = (front.truncate() + back.truncate()) * 0.5 * alpha;
            color.extend(alpha)
        }
    }
}
