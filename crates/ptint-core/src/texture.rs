//! Square texture packing.
//!
//! Per-vertex and per-tetrahedron buffers are serialized into square,
//! row-major textures so a GPU pass can address element `i` at
//! `(i % size, i / size)`. The side length depends on the element count and
//! must be recomputed (and the texture recreated) whenever the count changes.

use crate::tables::{FAN_COUNT, FAN_TABLE, NUM_ROWS, ORDER_TABLE};

/// Side length of the smallest square holding `count` elements.
///
/// `size * size >= count` and `(size - 1) * (size - 1) < count` for every
/// non-zero count; zero elements need a zero sized texture.
#[must_use]
pub fn texture_size(count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut size = (count as f64).sqrt().ceil() as usize;
    // correct float rounding near perfect squares
    while size * size < count {
        size += 1;
    }
    while size > 1 && (size - 1) * (size - 1) >= count {
        size -= 1;
    }
    size as u32
}

/// A square, row-major texel buffer with `channels` components per texel.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareTexture<T> {
    /// Side length in texels.
    pub size: u32,
    /// Components per texel.
    pub channels: u32,
    /// `size * size * channels` components, zero padded past the last element.
    pub data: Vec<T>,
}

impl<T: Copy + Default> SquareTexture<T> {
    /// Packs `N`-component elements into a square texture.
    pub fn pack<const N: usize>(elements: &[[T; N]]) -> Self {
        let size = texture_size(elements.len());
        let texels = (size * size) as usize;
        let mut data = vec![T::default(); texels * N];
        for (dst, src) in data.chunks_exact_mut(N).zip(elements) {
            dst.copy_from_slice(src);
        }
        Self {
            size,
            channels: N as u32,
            data,
        }
    }

    /// Number of texels (`size * size`).
    pub fn texel_count(&self) -> usize {
        (self.size * self.size) as usize
    }

    /// Components of texel `index`.
    pub fn texel(&self, index: usize) -> &[T] {
        let c = self.channels as usize;
        &self.data[index * c..(index + 1) * c]
    }
}

/// Tetrahedron connectivity as an `Rgba32Uint`-style texture.
#[must_use]
pub fn pack_tets(tets: &[[u32; 4]]) -> SquareTexture<u32> {
    SquareTexture::pack(tets)
}

/// Vertex positions with the scalar in the fourth component.
#[must_use]
pub fn pack_vertices(positions: &[glam::Vec3], scalars: &[f32]) -> SquareTexture<f32> {
    let texels: Vec<[f32; 4]> = positions
        .iter()
        .zip(scalars)
        .map(|(p, &s)| [p.x, p.y, p.z, s])
        .collect();
    SquareTexture::pack(&texels)
}

/// Gradients, padded from RGB to RGBA.
#[must_use]
pub fn pack_gradients(gradients: &[glam::Vec3]) -> SquareTexture<f32> {
    let texels: Vec<[f32; 4]> = gradients.iter().map(|g| [g.x, g.y, g.z, 0.0]).collect();
    SquareTexture::pack(&texels)
}

/// The classification table as an 81x2 RGBA integer image.
///
/// Row 0 holds [`ORDER_TABLE`]; row 1 holds `(fan count, fan[0], 0, 0)`.
#[must_use]
pub fn pack_order_table() -> Vec<[u32; 4]> {
    let mut texels = Vec::with_capacity(NUM_ROWS * 2);
    texels.extend(ORDER_TABLE.iter().map(|o| o.map(u32::from)));
    texels.extend(
        FAN_COUNT
            .iter()
            .zip(FAN_TABLE.iter())
            .map(|(&count, fan)| [u32::from(count), u32::from(fan[0]), 0, 0]),
    );
    texels
}
