//! Frame images and PNG output.

use std::path::Path;

use glam::Vec4;
use image::{ImageBuffer, Rgba};

use crate::{RenderError, RenderResult};

/// A rendered frame: premultiplied RGBA in linear `f32`, row-major with a
/// top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl FrameImage {
    /// Creates a fully transparent frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    /// Wraps existing pixels; fails when the count does not match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Vec4>) -> RenderResult<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(RenderError::InvalidImageData);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Blends a premultiplied color over pixel `(x, y)`.
    pub fn blend_over(&mut self, x: u32, y: u32, src: Vec4) {
        let dst = &mut self.pixels[(y * self.width + x) as usize];
        *dst = src + *dst * (1.0 - src.w);
    }

    /// Composites the frame over a straight-alpha background color.
    #[must_use]
    pub fn over_background(&self, background: [f32; 4]) -> Self {
        let bg = Vec4::from_array(background);
        let bg = (bg.truncate() * bg.w).extend(bg.w);
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&p| p + bg * (1.0 - p.w)).collect(),
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| p.w > 0.0).count()
    }

    /// Converts to 8-bit RGBA.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.to_array())
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// Saves the frame as PNG (or JPEG, by extension).
    pub fn save(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.to_rgba8())
                .ok_or(RenderError::InvalidImageData)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" => {
                let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
                rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
            }
            _ => img.save_with_format(path, image::ImageFormat::Png)?,
        }
        log::info!("wrote {}x{} frame to {}", self.width, self.height, path.display());
        Ok(())
    }

    /// Encodes the frame as PNG in memory.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.to_rgba8())
                .ok_or(RenderError::InvalidImageData)?;
        let mut buffer = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}
