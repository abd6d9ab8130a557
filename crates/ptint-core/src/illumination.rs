//! Illumination control: shading coefficients consumed by the compositor.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::params::read_floats;
use crate::{PtintError, Result};

pub const KS_MAX: f32 = 1.0;
pub const KD_MAX: f32 = 1.0;
pub const KA_MAX: f32 = 1.0;
pub const SHININESS_MAX: f32 = 100.0;

const HEADER: &str = "# Illumination Control #";

/// Phong-style shading coefficients and the gradient-magnitude ramp.
///
/// `rho` holds three `(x, y)` control points of a piecewise linear ramp that
/// maps the normalized gradient magnitude (x) to a shading weight (y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IlluminationControl {
    pub ks: f32,
    pub kd: f32,
    pub ka: f32,
    pub shininess: f32,
    pub rho: [[f32; 2]; 3],
}

impl Default for IlluminationControl {
    fn default() -> Self {
        Self {
            ks: 0.5,
            kd: 0.5,
            ka: 0.1,
            shininess: 1.0,
            rho: [[0.2, 0.0], [0.5, 0.0], [0.7, 0.5]],
        }
    }
}

impl IlluminationControl {
    /// Clamps every coefficient into its editable range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.ks = self.ks.clamp(0.0, KS_MAX);
        self.kd = self.kd.clamp(0.0, KD_MAX);
        self.ka = self.ka.clamp(0.0, KA_MAX);
        self.shininess = self.shininess.clamp(0.0, SHININESS_MAX);
        for p in &mut self.rho {
            p[0] = p[0].clamp(0.0, 1.0);
            p[1] = p[1].clamp(0.0, 1.0);
        }
        self
    }

    /// Evaluates the rho ramp at a gradient magnitude in `[0, 1]`.
    ///
    /// Below the first control point the weight is the first point's value;
    /// above the last it rises linearly to 1 at magnitude 1.
    pub fn shading_weight(&self, magnitude: f32) -> f32 {
        let m = magnitude.clamp(0.0, 1.0);
        let pts = [self.rho[0], self.rho[1], self.rho[2], [1.0, 1.0]];
        if m <= pts[0][0] {
            return pts[0][1];
        }
        for w in pts.windows(2) {
            let ([x0, y0], [x1, y1]) = (w[0], w[1]);
            if m <= x1 {
                if x1 - x0 <= f32::EPSILON {
                    return y1;
                }
                return y0 + (y1 - y0) * (m - x0) / (x1 - x0);
            }
        }
        1.0
    }

    /// Shades a transfer function color with a headlight along `light`.
    ///
    /// The gradient acts as the surface normal (either orientation); the
    /// result is blended with the unshaded color by [`Self::shading_weight`]
    /// of the gradient magnitude.
    pub fn shade(&self, color: Vec3, gradient: Vec3, light: Vec3) -> Vec3 {
        let magnitude = gradient.length();
        let weight = self.shading_weight(magnitude);
        if weight <= 0.0 || magnitude <= f32::EPSILON {
            return color;
        }
        let n_dot_l = (gradient / magnitude).dot(light).abs();
        let specular = self.ks * n_dot_l.powf(self.shininess);
        let lit = color * (self.ka + self.kd * n_dot_l) + Vec3::splat(specular);
        color.lerp(lit.min(Vec3::ONE), weight)
    }

    /// Reads an illumination file: a header line followed by
    /// `rho00 rho01 rho10 rho11 rho20 rho21 ks kd ka alphai`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let values = read_floats(path, &text)?;
        if values.len() != 10 {
            return Err(PtintError::SizeMismatch {
                expected: 10,
                actual: values.len(),
            });
        }
        Ok(Self {
            rho: [
                [values[0], values[1]],
                [values[2], values[3]],
                [values[4], values[5]],
            ],
            ks: values[6],
            kd: values[7],
            ka: values[8],
            shininess: values[9],
        }
        .clamped())
    }

    /// Writes the file format accepted by [`Self::read`].
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let r = &self.rho;
        let text = format!(
            "{HEADER}\n{} {} {} {} {} {} {} {} {} {}\n",
            r[0][0],
            r[0][1],
            r[1][0],
            r[1][1],
            r[2][0],
            r[2][1],
            self.ks,
            self.kd,
            self.ka,
            self.shininess
        );
        std::fs::write(path, text)?;
        Ok(())
    }
}
