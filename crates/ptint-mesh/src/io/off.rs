//! OFF style text formats.

use std::fmt::Write as _;
use std::path::Path;

use glam::Vec3;
use nom::{
    character::complete::{multispace0, u32 as parse_u32},
    number::complete::float,
    sequence::{preceded, tuple},
    IResult,
};
use ptint_core::{PtintError, Result};

use crate::MeshStore;

fn ws_u32(i: &str) -> IResult<&str, u32> {
    preceded(multispace0, parse_u32)(i)
}

fn ws_f32(i: &str) -> IResult<&str, f32> {
    preceded(multispace0, float)(i)
}

fn counts(i: &str) -> IResult<&str, (u32, u32)> {
    tuple((ws_u32, ws_u32))(i)
}

fn vec3(i: &str) -> IResult<&str, Vec3> {
    let (i, (x, y, z)) = tuple((ws_f32, ws_f32, ws_f32))(i)?;
    Ok((i, Vec3::new(x, y, z)))
}

fn cell(i: &str) -> IResult<&str, [u32; 4]> {
    let (i, (a, b, c, d)) = tuple((ws_u32, ws_u32, ws_u32, ws_u32))(i)?;
    Ok((i, [a, b, c, d]))
}

/// Preallocation for `count` records of at least `min_len` bytes each,
/// bounded by the length of the text.
fn capacity(count: u32, text: &str, min_len: usize) -> usize {
    (count as usize).min(text.len() / min_len)
}

/// A cursor over the file text that reports failures with line numbers.
struct Reader<'a> {
    path: &'a Path,
    text: &'a str,
    rest: &'a str,
}

impl<'a> Reader<'a> {
    fn new(path: &'a Path, text: &'a str) -> Self {
        Self {
            path,
            text,
            rest: text,
        }
    }

    /// Line of the next token.
    fn line(&self) -> usize {
        let consumed = &self.text[..self.text.len() - self.rest.trim_start().len()];
        consumed.matches('\n').count() + 1
    }

    fn parse<O>(
        &mut self,
        what: &str,
        parser: impl Fn(&'a str) -> IResult<&'a str, O>,
    ) -> Result<O> {
        match parser(self.rest) {
            Ok((rest, value)) => {
                self.rest = rest;
                Ok(value)
            }
            Err(_) => Err(PtintError::parse(self.path, self.line(), format!("expected {what}"))),
        }
    }
}

/// Reads an OFF file, with per-vertex gradients when `gradients` is set.
pub fn read_off(path: &Path, gradients: bool) -> Result<MeshStore> {
    let text = std::fs::read_to_string(path)?;
    let mut r = Reader::new(path, &text);
    let (num_vertices, num_tets) = r.parse("vertex and tetrahedron counts", counts)?;

    let mut mesh = MeshStore::with_capacity(
        capacity(num_vertices, &text, 8),
        capacity(num_tets, &text, 8),
    );
    for _ in 0..num_vertices {
        let position = r.parse("vertex position", vec3)?;
        let scalar = r.parse("vertex scalar", ws_f32)?;
        mesh.add_vertex(position, scalar);
        if gradients {
            mesh.add_gradient(r.parse("vertex gradient", vec3)?);
        }
    }
    for _ in 0..num_tets {
        let line = r.line();
        let ids = r.parse("tetrahedron indices", cell)?;
        mesh.add_cell(ids)
            .map_err(|e| PtintError::parse(path, line, e.to_string()))?;
    }
    Ok(mesh)
}

/// Reads a geological OFF file; each tetrahedron's region id becomes the
/// scalar of its four vertices (later cells overwrite earlier ones).
pub fn read_geo(path: &Path) -> Result<MeshStore> {
    let text = std::fs::read_to_string(path)?;
    let mut r = Reader::new(path, &text);
    let (num_vertices, num_tets) = r.parse("vertex and tetrahedron counts", counts)?;

    let mut mesh = MeshStore::with_capacity(
        capacity(num_vertices, &text, 8),
        capacity(num_tets, &text, 12),
    );
    for _ in 0..num_vertices {
        let _id = r.parse("vertex id", ws_u32)?;
        let position = r.parse("vertex position", vec3)?;
        mesh.add_vertex(position, 1.0);
    }
    for _ in 0..num_tets {
        let line = r.line();
        let _id = r.parse("tetrahedron id", ws_u32)?;
        let ids = r.parse("tetrahedron indices", cell)?;
        let region = r.parse("region id", ws_u32)?;
        mesh.add_cell(ids)
            .map_err(|e| PtintError::parse(path, line, e.to_string()))?;
        for v in ids {
            mesh.set_scalar(v, region as f32)?;
        }
    }
    Ok(mesh)
}

/// Writes a mesh as OFF (with gradients when the mesh has them).
pub fn write_off(mesh: &MeshStore, path: &Path) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", mesh.num_vertices(), mesh.num_tets());
    for (i, (p, s)) in mesh.positions().iter().zip(mesh.scalars()).enumerate() {
        let _ = write!(out, "{} {} {} {}", p.x, p.y, p.z, s);
        if let Some(g) = mesh.gradients() {
            let _ = write!(out, " {} {} {}", g[i].x, g[i].y, g[i].z);
        }
        out.push('\n');
    }
    for [a, b, c, d] in mesh.tets() {
        let _ = writeln!(out, "{a} {b} {c} {d}");
    }
    std::fs::write(path, out)?;
    Ok(())
}
