//! Rendering error types.

use ptint_core::PtintError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// A pass ran before any mesh was uploaded.
    #[error("no mesh uploaded")]
    EmptyFrame,

    /// Image encoding or file output failed.
    #[error("failed to save image: {0}")]
    ImageSave(#[from] image::ImageError),

    /// Invalid image dimensions or data.
    #[error("invalid image data")]
    InvalidImageData,

    #[error(transparent)]
    Core(#[from] PtintError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
