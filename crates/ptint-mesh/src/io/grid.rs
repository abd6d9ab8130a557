//! Binary voxel grids: single files, per-slice files and PPM stacks.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::Vec3;
use nom::{
    bytes::complete::tag,
    character::complete::{digit1, multispace1},
    combinator::map_res,
    sequence::{preceded, tuple},
    IResult,
};
use ptint_core::{PtintError, Result};

use super::{DatasetFormat, GridOptions};
use crate::hexahedra::{tet_count, tetrahedralize};
use crate::MeshStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    U8,
    U16Le,
    U16Be,
}

impl Sample {
    fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16Le | Self::U16Be => 2,
        }
    }

    fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            Self::U8 => f32::from(bytes[0]),
            Self::U16Le => f32::from(LittleEndian::read_u16(bytes)),
            Self::U16Be => f32::from(BigEndian::read_u16(bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Single,
    PerSlice,
    Pnm,
}

fn layout_of(format: DatasetFormat) -> Option<(Sample, Layout)> {
    Some(match format {
        DatasetFormat::Bin8 => (Sample::U8, Layout::Single),
        DatasetFormat::Bin16Le => (Sample::U16Le, Layout::Single),
        DatasetFormat::Bin16Be => (Sample::U16Be, Layout::Single),
        DatasetFormat::MultiRaw8 => (Sample::U8, Layout::PerSlice),
        DatasetFormat::MultiRaw16Le => (Sample::U16Le, Layout::PerSlice),
        DatasetFormat::MultiRaw16Be => (Sample::U16Be, Layout::PerSlice),
        DatasetFormat::Pnm8 => (Sample::U8, Layout::Pnm),
        DatasetFormat::Off | DatasetFormat::GradientOff | DatasetFormat::Geo => return None,
    })
}

/// Path of slice `z` (0-based) of a per-slice dataset.
fn slice_path(base: &Path, z: u32, pnm: bool) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}", z + 1));
    if pnm {
        name.push(".pnm");
    }
    PathBuf::from(name)
}

fn ppm_number(i: &[u8]) -> IResult<&[u8], u32> {
    preceded(
        multispace1,
        map_res(digit1, |d: &[u8]| {
            std::str::from_utf8(d)
                .map_err(|_| ())
                .and_then(|s| s.parse::<u32>().map_err(|_| ()))
        }),
    )(i)
}

/// Parses a binary PPM header; returns `(width, height, maxval)` and the pixel data.
fn ppm_header(i: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    let (i, (_, w, h, max)) = tuple((tag("P6"), ppm_number, ppm_number, ppm_number))(i)?;
    // exactly one whitespace byte separates the header from the raster
    let (i, _) = nom::bytes::complete::take(1usize)(i)?;
    Ok((i, (w, h, max)))
}

/// One z slice of raw samples, `rows * cols` texels of `stride` bytes.
struct Slice<'a> {
    data: Cow<'a, [u8]>,
    offset: usize,
    stride: usize,
}

impl Slice<'_> {
    fn texel(&self, index: usize) -> &[u8] {
        let start = self.offset + index * self.stride;
        &self.data[start..start + self.stride]
    }
}

/// Reads slice `z` of a per-slice or PPM dataset.
fn load_slice(
    path: &Path,
    pnm: bool,
    sample: Sample,
    texels: usize,
    z: u32,
) -> Result<Slice<'static>> {
    if !pnm {
        let file = slice_path(path, z, false);
        let data = std::fs::read(&file)?;
        check_len(&data, texels * sample.bytes())?;
        return Ok(Slice {
            data: Cow::Owned(data),
            offset: 0,
            stride: sample.bytes(),
        });
    }
    let file = slice_path(path, z, true);
    let data = std::fs::read(&file)?;
    let (pixels, (w, h, max)) = ppm_header(&data)
        .map_err(|_| PtintError::parse(&file, 1, "invalid binary PPM header"))?;
    if max > 255 {
        return Err(PtintError::parse(&file, 1, "only 8-bit PPM slices are supported"));
    }
    if (w as usize) * (h as usize) != texels {
        return Err(PtintError::SizeMismatch {
            expected: texels,
            actual: (w as usize) * (h as usize),
        });
    }
    let offset = data.len() - pixels.len();
    check_len(pixels, texels * 3)?;
    Ok(Slice {
        data: Cow::Owned(data),
        offset,
        stride: 3,
    })
}

fn check_len(data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(PtintError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Reads a voxel grid and tetrahedralizes it.
pub fn read_grid(path: &Path, format: DatasetFormat, grid: &GridOptions) -> Result<MeshStore> {
    let (sample, layout) = layout_of(format)
        .ok_or_else(|| PtintError::InvalidValue(format!("{format:?} is not a voxel format")))?;
    grid.validate()?;

    let [rows, cols, slices] = grid.dims.map(|d| d as usize);
    let sampled = grid.sampled_dims();
    let num_vertices = sampled.iter().map(|&d| d as usize).product();
    let mut mesh = MeshStore::with_capacity(num_vertices, tet_count(sampled, grid.decomposition));
    let z_scale = grid
        .z_scale
        .unwrap_or(if layout == Layout::Pnm { 20.0 } else { 1.0 });

    let whole = if layout == Layout::Single {
        let data = std::fs::read(path)?;
        check_len(&data, rows * cols * slices * sample.bytes())?;
        Some(data)
    } else {
        None
    };

    for z in grid.axis_samples(2) {
        let slice = match &whole {
            Some(data) => Slice {
                data: Cow::Borrowed(data.as_slice()),
                offset: z as usize * rows * cols * sample.bytes(),
                stride: sample.bytes(),
            },
            None => load_slice(path, layout == Layout::Pnm, sample, rows * cols, z)?,
        };
        for y in grid.axis_samples(1) {
            for x in grid.axis_samples(0) {
                let index = y as usize * rows + x as usize;
                let value = sample.decode(slice.texel(index));
                mesh.add_vertex(Vec3::new(x as f32, y as f32, z as f32 * z_scale), value);
            }
        }
    }

    for tet in tetrahedralize(sampled, grid.decomposition) {
        mesh.add_cell(tet)?;
    }
    log::debug!(
        "read {:?} grid {}x{}x{} sampled to {}x{}x{}",
        format,
        rows,
        cols,
        slices,
        sampled[0],
        sampled[1],
        sampled[2]
    );
    Ok(mesh)
}

/// Writes a single-file 8 or 16-bit grid; used to produce test volumes.
pub fn write_raw(path: &Path, format: DatasetFormat, values: &[u16]) -> Result<()> {
    let (sample, _) = layout_of(format)
        .filter(|(_, layout)| *layout == Layout::Single)
        .ok_or_else(|| PtintError::InvalidValue(format!("cannot write {format:?}")))?;
    let mut out = vec![0u8; values.len() * sample.bytes()];
    for (chunk, &v) in out.chunks_exact_mut(sample.bytes()).zip(values) {
        match sample {
            Sample::U8 => chunk[0] = v.min(255) as u8,
            Sample::U16Le => LittleEndian::write_u16(chunk, v),
            Sample::U16Be => BigEndian::write_u16(chunk, v),
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}
