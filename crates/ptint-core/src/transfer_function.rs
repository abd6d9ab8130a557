//! Transfer function: 256 RGBA entries plus a brightness scale.
//!
//! Alpha is edited through control points; the entries between two
//! neighbouring control points are linearly interpolated. Colors come from
//! one of ten preset color codes.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use glam::Vec4;

use crate::params::read_floats;
use crate::{PtintError, Result};

/// Number of transfer function entries.
pub const TF_SIZE: usize = 256;

/// Allowed brightness range.
pub const MIN_BRIGHTNESS: f32 = 0.0;
pub const MAX_BRIGHTNESS: f32 = 8.0;

const HEADER: &str = "# Transfer Function #";

/// A 256-entry color/opacity lookup with brightness.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    entries: Vec<Vec4>,
    brightness: f32,
    control_points: BTreeSet<u8>,
}

impl Default for TransferFunction {
    fn default() -> Self {
        let mut tf = Self {
            entries: vec![Vec4::ZERO; TF_SIZE],
            brightness: 1.0,
            control_points: [0, 63, 127, 191, 255].into_iter().collect(),
        };
        tf.apply_color_code(1);
        for (i, e) in tf.entries.iter_mut().enumerate() {
            e.w = i as f32 / (TF_SIZE - 1) as f32;
        }
        tf
    }
}

impl TransferFunction {
    /// Builds a transfer function from explicit entries.
    pub fn from_entries(entries: Vec<Vec4>, brightness: f32) -> Result<Self> {
        if entries.len() != TF_SIZE {
            return Err(PtintError::SizeMismatch {
                expected: TF_SIZE,
                actual: entries.len(),
            });
        }
        let mut tf = Self {
            entries,
            brightness: 1.0,
            control_points: [0, 255].into_iter().collect(),
        };
        tf.set_brightness(brightness);
        Ok(tf)
    }

    /// All entries, indexed by quantized scalar.
    pub fn entries(&self) -> &[Vec4] {
        &self.entries
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Sets the brightness, clamped to `[MIN_BRIGHTNESS, MAX_BRIGHTNESS]`.
    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
    }

    /// Entry index of a normalized scalar.
    pub fn index_of(scalar: f32) -> usize {
        ((scalar * (TF_SIZE - 1) as f32) as i64).clamp(0, TF_SIZE as i64 - 1) as usize
    }

    /// Nearest-entry lookup for a normalized scalar.
    pub fn lookup(&self, scalar: f32) -> Vec4 {
        self.entries[Self::index_of(scalar)]
    }

    /// Whether a scalar maps to zero opacity.
    pub fn is_transparent(&self, scalar: f32) -> bool {
        self.lookup(scalar).w <= 0.0
    }

    /// Control points, ascending.
    pub fn control_points(&self) -> impl Iterator<Item = u8> + '_ {
        self.control_points.iter().copied()
    }

    /// Sets the alpha at `index`, making it a control point, and
    /// re-interpolates the entries towards its neighbouring control points.
    pub fn set_control_point(&mut self, index: u8, alpha: f32) {
        self.control_points.insert(index);
        self.entries[index as usize].w = alpha.clamp(0.0, 1.0);
        self.interpolate_around(index);
    }

    /// Removes a control point. The two end points cannot be removed.
    ///
    /// Returns whether a point was removed.
    pub fn remove_control_point(&mut self, index: u8) -> bool {
        if index == 0 || index == u8::MAX || !self.control_points.remove(&index) {
            return false;
        }
        let prev = self.control_points.range(..index).next_back().copied();
        if let Some(prev) = prev {
            self.interpolate_around(prev);
        }
        true
    }

    /// Sets the alpha of every entry whose scalar lies in `[lo, hi)` to zero.
    pub fn clear_alpha_range(&mut self, lo: f32, hi: f32) {
        for (i, e) in self.entries.iter_mut().enumerate() {
            let s = i as f32 / (TF_SIZE - 1) as f32;
            if s >= lo && s < hi {
                e.w = 0.0;
            }
        }
    }

    /// Fills the RGB channels with one of the preset color codes (0-9).
    ///
    /// 0 is a grey ramp, 1-6 are four-segment hue ramps, 7 and 8 blend
    /// between red and green, 9 is an inverted grey ramp. Unknown codes
    /// leave the colors untouched.
    pub fn apply_color_code(&mut self, code: u32) {
        let quarter = TF_SIZE / 4;
        let step_quarter = 1.0 / quarter as f32;
        let step = 1.0 / TF_SIZE as f32;
        for (i, e) in self.entries.iter_mut().enumerate() {
            let seg = i / quarter;
            let up = (i - seg * quarter) as f32 * step_quarter;
            let down = 1.0 - up;
            let ramp = i as f32 * step;
            let rgb = match (code, seg) {
                (0, _) => [ramp, ramp, ramp],
                (1, 0) => [1.0, up, 0.0],
                (1, 1) => [down, 1.0, 0.0],
                (1, 2) => [0.0, 1.0, up],
                (1, _) => [0.0, down, 1.0],
                (2, 0) => [0.0, up, 1.0],
                (2, 1) => [0.0, 1.0, down],
                (2, 2) => [up, 1.0, 0.0],
                (2, _) => [1.0, down, 0.0],
                (3, 0) => [0.0, 1.0, up],
                (3, 1) => [0.0, down, 1.0],
                (3, 2) => [up, 0.0, 1.0],
                (3, _) => [1.0, 0.0, down],
                (4, 0) => [1.0, 0.0, up],
                (4, 1) => [down, 0.0, 1.0],
                (4, 2) => [0.0, up, 1.0],
                (4, _) => [0.0, 1.0, down],
                (5, 0) => [up, 1.0, 0.0],
                (5, 1) => [1.0, down, 0.0],
                (5, 2) => [1.0, 0.0, up],
                (5, _) => [down, 0.0, 1.0],
                (6, 0) => [up, 0.0, 1.0],
                (6, 1) => [1.0, 0.0, down],
                (6, 2) => [1.0, up, 0.0],
                (6, _) => [down, 1.0, 0.0],
                (7, _) => [ramp, 1.0 - ramp, 0.0],
                (8, _) => [1.0 - ramp, ramp, 0.0],
                (9, _) => [1.0 - ramp, 1.0 - ramp, 1.0 - ramp],
                _ => return,
            };
            e.x = rgb[0];
            e.y = rgb[1];
            e.z = rgb[2];
        }
    }

    /// Reads a transfer function file.
    ///
    /// Format: a `#` header line, 256 lines of `r g b a`, then the
    /// brightness. Entries are whitespace separated floats; `#` lines are
    /// comments.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let values = read_floats(path, &text)?;
        if values.len() != TF_SIZE * 4 + 1 {
            return Err(PtintError::SizeMismatch {
                expected: TF_SIZE * 4 + 1,
                actual: values.len(),
            });
        }
        let entries = values[..TF_SIZE * 4]
            .chunks_exact(4)
            .map(Vec4::from_slice)
            .collect();
        log::debug!("read transfer function from {}", path.display());
        Self::from_entries(entries, values[TF_SIZE * 4])
    }

    /// Writes the transfer function in the format accepted by [`Self::read`].
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = String::with_capacity(TF_SIZE * 40);
        out.push_str(HEADER);
        out.push('\n');
        for e in &self.entries {
            // `{}` prints the shortest representation that parses back exactly
            let _ = writeln!(out, "{} {} {} {}", e.x, e.y, e.z, e.w);
        }
        let _ = writeln!(out, "{}", self.brightness);
        std::fs::write(path, out)?;
        Ok(())
    }

    fn interpolate_around(&mut self, index: u8) {
        let x = index as usize;
        if let Some(&prev) = self.control_points.range(..index).next_back() {
            self.interpolate_span(prev as usize, x);
        }
        if let Some(&next) = self.control_points.range(index.saturating_add(1)..).next() {
            if next > index {
                self.interpolate_span(x, next as usize);
            }
        }
    }

    fn interpolate_span(&mut self, x0: usize, x1: usize) {
        let (y0, y1) = (self.entries[x0].w, self.entries[x1].w);
        let slope = (y1 - y0) / (x1 - x0) as f32;
        for i in x0 + 1..x1 {
            self.entries[i].w = y0 + slope * (i - x0) as f32;
        }
    }
}
