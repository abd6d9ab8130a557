//! End-to-end pipeline scenarios on a single hexahedron.

use std::path::PathBuf;

use ptint::{
    headless, BackendKind, DatasetFormat, FrameState, GridOptions, MeshStore, Pipeline,
    ProjectionKind, RenderConfig, SortMethod, TransferFunction, Vec3, Vec4,
};
use ptint_core::classify::project_to_ndc;
use ptint_core::tables::{ProjectionClass, CLASS_TABLE, FAN_COUNT};
use ptint_core::ThickVertex;
use ptint_mesh::hexahedra::FIVE_TET_TEMPLATE;

/// File vertex for each cube corner `dx + 2 dy + 4 dz`. Corners 0, 2, 3, 6
/// (the first template tetrahedron) get the four lowest scalars.
const CORNER_TO_VERTEX: [usize; 8] = [0, 4, 1, 2, 5, 6, 3, 7];

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ptint_pipeline_{}_{name}", std::process::id()))
}

/// Writes a unit cube split into five tetrahedra; vertex `i` has scalar `i`.
fn write_hexahedron(name: &str) -> PathBuf {
    let mut corners = [0usize; 8];
    for (corner, &vertex) in CORNER_TO_VERTEX.iter().enumerate() {
        corners[vertex] = corner;
    }
    let mut text = String::from("8 5\n");
    for (vertex, &k) in corners.iter().enumerate() {
        text.push_str(&format!("{} {} {} {vertex}\n", k & 1, (k >> 1) & 1, (k >> 2) & 1));
    }
    for tet in FIVE_TET_TEMPLATE {
        let ids = tet.map(|k| CORNER_TO_VERTEX[k].to_string());
        text.push_str(&ids.join(" "));
        text.push('\n');
    }
    let path = temp_path(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn load_hexahedron(name: &str) -> MeshStore {
    let path = write_hexahedron(name);
    let mesh = MeshStore::load(&path, DatasetFormat::Off, &GridOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);
    mesh
}

fn config() -> RenderConfig {
    RenderConfig {
        width: 48,
        height: 48,
        psi_table_size: 64,
        background: [0.0; 4],
        ..Default::default()
    }
}

fn low_half_transparent() -> TransferFunction {
    let entries = (0..256)
        .map(|i| Vec4::new(1.0, 0.5, 0.0, if i < 128 { 0.0 } else { 1.0 }))
        .collect();
    TransferFunction::from_entries(entries, 1.0).unwrap()
}

#[test]
fn test_single_hexahedron_end_to_end() {
    let mesh = load_hexahedron("end_to_end.off");
    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.num_tets(), 5);
    let expected: Vec<f32> = (0..8).map(|i| i as f32 / 7.0).collect();
    for (s, e) in mesh.scalars().iter().zip(&expected) {
        assert!((s - e).abs() < 1e-6);
    }

    let mut pipeline = Pipeline::new(mesh, config()).unwrap();
    let camera = pipeline.camera_mut();
    camera.projection_mode = ProjectionKind::Orthographic;
    camera.position = camera.target + Vec3::new(2.0, 3.0, 7.0);
    let covered = pipeline.render_frame().unwrap().covered_pixels();
    assert!(covered > 0);

    // Looking down (-2, -3, -7): corner 7 projects inside the triangle of its
    // three neighbours, and corner 0 inside the top face triangle 4 5 6.
    let expected = [
        (ProjectionClass::Crossing, None),
        (ProjectionClass::Interior, Some(Vec3::ONE)),
        (ProjectionClass::Interior, Some(Vec3::NEG_ONE)),
        (ProjectionClass::Crossing, None),
        (ProjectionClass::Crossing, None),
    ];

    let mvp = pipeline.camera().view_transform().model_view_projection();
    let records = pipeline.records();
    let arrays = pipeline.arrays();
    assert_eq!(records.len(), 5);
    assert_eq!(arrays.num_tets(), 5);
    for (t, (record, (class, thick))) in records.iter().zip(expected).enumerate() {
        let row = record.row as usize;
        assert_eq!(CLASS_TABLE[row], class, "tetrahedron {t}");
        assert_eq!(record.fan_count, u32::from(FAN_COUNT[row]));
        assert!(record.thickness > 0.0);
        match thick {
            Some(position) => {
                assert_eq!(record.fan_count, 5);
                assert_eq!(arrays.thick_vertex(t), ThickVertex::ObjectSpace(position));
                assert_eq!(arrays.vertices[t * 5], [position.x, position.y, position.z, 1.0]);
                let ndc = project_to_ndc(&mvp, position);
                assert!(record.thick_position.distance(ndc.truncate()) < 1e-5);
            }
            None => {
                assert_eq!(record.fan_count, 6);
                let packed = arrays.vertices[t * 5];
                assert_eq!(packed[3], 0.0);
                assert_eq!(packed[0], record.thick_position.x);
                assert_eq!(packed[1], record.thick_position.y);
            }
        }
    }
    for fan in arrays.fans() {
        let tet = fan[0] as usize / 5;
        assert_eq!(fan.len() as u32, records[tet].fan_count);
    }
    assert!(arrays.max_thickness > 0.0);
}

#[test]
fn test_transparent_tetrahedra_are_discarded() {
    let mut pipeline = Pipeline::new(load_hexahedron("discard.off"), config()).unwrap();
    assert_eq!(pipeline.cur_tets(), 5);
    assert_eq!(pipeline.discarded_tets(), 0);
    pipeline.render_frame().unwrap();
    assert_eq!(pipeline.state(), FrameState::Still);

    pipeline.set_transfer_function(low_half_transparent()).unwrap();
    assert_eq!(pipeline.discarded_tets(), 1);
    assert_eq!(pipeline.cur_tets(), pipeline.num_tets() - 1);
    assert_eq!(pipeline.texture_size(), 2);
    assert_eq!(pipeline.state(), FrameState::FirstStill);

    let before = pipeline.frames_rendered();
    pipeline.render_frame().unwrap();
    assert_eq!(pipeline.frames_rendered(), before + 1);
    assert_eq!(pipeline.records().len(), 4);
    assert_eq!(pipeline.arrays().num_tets(), 4);
}

#[test]
fn test_discard_disabled_keeps_all_tetrahedra() {
    let config = RenderConfig {
        discard_transparent: false,
        ..config()
    };
    let mut pipeline = Pipeline::new(load_hexahedron("no_discard.off"), config).unwrap();
    pipeline.set_transfer_function(low_half_transparent()).unwrap();
    assert_eq!(pipeline.cur_tets(), 5);
    assert_eq!(pipeline.discarded_tets(), 0);
}

#[test]
fn test_rotating_uses_rotating_sort() {
    let config = RenderConfig {
        rotating_sort: SortMethod::None,
        ..config()
    };
    let mut pipeline = Pipeline::new(load_hexahedron("rotating.off"), config).unwrap();
    pipeline.render_frame().unwrap();
    let still = pipeline.arrays().clone();

    pipeline.begin_interaction();
    pipeline.render_frame().unwrap();
    assert_eq!(pipeline.state(), FrameState::Rotating);
    // identity order: draw i is tetrahedron i
    for (draw, fan) in pipeline.arrays().fans().enumerate() {
        assert_eq!(fan[0] as usize, draw * 5);
    }

    pipeline.end_interaction();
    pipeline.render_frame().unwrap();
    assert_eq!(pipeline.arrays(), &still);
}

#[test]
fn test_headless_orbit_writes_png() {
    let mut pipeline = Pipeline::new(load_hexahedron("orbit.off"), config()).unwrap();
    let output = temp_path("orbit.png");
    headless::render_orbit_to_file(&mut pipeline, 3, (0.1, 0.05), &output).unwrap();
    assert_eq!(pipeline.state(), FrameState::Still);
    assert_eq!(pipeline.frames_rendered(), 4);

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let _ = std::fs::remove_file(&output);

    let pixels = headless::render_to_image(&mut pipeline).unwrap();
    assert_eq!(pixels.len(), 48 * 48 * 4);
    assert_eq!(pipeline.frames_rendered(), 4);
}

#[test]
fn test_gpu_pipeline_matches_cpu_coverage() {
    let gpu_config = RenderConfig {
        backend: BackendKind::Gpu,
        ..config()
    };
    let mut gpu = match Pipeline::new(load_hexahedron("gpu.off"), gpu_config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            println!("Skipping GPU pipeline test: {e}");
            return;
        }
    };
    let mut cpu = Pipeline::new(load_hexahedron("cpu.off"), config()).unwrap();
    let gpu_covered = gpu.render_frame().unwrap().covered_pixels() as f32;
    let cpu_covered = cpu.render_frame().unwrap().covered_pixels() as f32;
    assert!((gpu_covered - cpu_covered).abs() <= cpu_covered * 0.05);
}
