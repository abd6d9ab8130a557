//! Headless rendering helpers.
//!
//! Render a pipeline to an image buffer or file without a window. Useful for
//! batch processing, the command-line tool and integration tests.

use std::path::Path;

use ptint_core::RenderConfig;
use ptint_mesh::MeshStore;
use ptint_render::RenderResult;

use crate::Pipeline;

/// Renders the current frame to a raw RGBA pixel buffer.
///
/// The buffer has `width * height * 4` bytes, row by row from the top-left.
pub fn render_to_image(pipeline: &mut Pipeline) -> RenderResult<Vec<u8>> {
    Ok(pipeline.render_frame()?.to_rgba8())
}

/// Renders the current frame and saves it as PNG or JPEG (by extension).
pub fn render_to_file(pipeline: &mut Pipeline, filename: impl AsRef<Path>) -> RenderResult<()> {
    pipeline.render_frame()?.save(filename)
}

/// Renders `frames` frames while orbiting by `(delta_x, delta_y)` radians per
/// frame, then the exact still frame, and saves the result.
///
/// With `frames == 0` only the still frame is rendered.
pub fn render_orbit_to_file(
    pipeline: &mut Pipeline,
    frames: u32,
    delta: (f32, f32),
    filename: impl AsRef<Path>,
) -> RenderResult<()> {
    if frames > 0 {
        pipeline.begin_interaction();
        for _ in 0..frames {
            pipeline.rotate(delta.0, delta.1);
            pipeline.render_frame()?;
        }
        pipeline.end_interaction();
    }
    render_to_file(pipeline, filename)
}

/// Builds a pipeline for `mesh` and renders one still frame to `filename`.
pub fn render_mesh_to_file(
    mesh: MeshStore,
    config: RenderConfig,
    filename: impl AsRef<Path>,
) -> RenderResult<()> {
    let mut pipeline = Pipeline::new(mesh, config)?;
    render_to_file(&mut pipeline, filename)
}
