//! Both passes on a single tetrahedron, on the CPU and (when available) the GPU.

use glam::{Vec2, Vec3, Vec4};
use ptint_core::{
    classify_mesh, ArrayBuilder, ClassificationRecord, IlluminationControl, MeshView, PsiTable,
    TransferFunction,
};
use ptint_render::cpu::raster::ndc_to_pixel;
use ptint_render::{Camera, CompositeParams, CpuBackend, FrameImage, GpuBackend, ProjectionBackend};

const SIZE: u32 = 64;

struct Fixture {
    positions: Vec<Vec3>,
    scalars: Vec<f32>,
    gradients: Vec<Vec3>,
    tets: Vec<[u32; 4]>,
}

impl Fixture {
    /// A tetrahedron whose apex projects inside its base when seen along -z.
    fn new() -> Self {
        Self {
            positions: vec![
                Vec3::new(-0.5, -0.5, -0.5),
                Vec3::new(0.5, -0.5, -0.5),
                Vec3::new(0.0, 0.5, -0.5),
                Vec3::new(0.0, 0.0, 0.5),
            ],
            scalars: vec![0.0, 0.3, 0.6, 1.0],
            gradients: vec![Vec3::Z, Vec3::Z, Vec3::Z, Vec3::Z],
            tets: vec![[0, 1, 2, 3]],
        }
    }

    fn view(&self, with_gradients: bool) -> MeshView<'_> {
        MeshView {
            positions: &self.positions,
            scalars: &self.scalars,
            gradients: with_gradients.then_some(self.gradients.as_slice()),
            tets: &self.tets,
        }
    }
}

fn opaque_white() -> TransferFunction {
    TransferFunction::from_entries(vec![Vec4::ONE; 256], 8.0).unwrap()
}

fn params(camera: &Camera, tf: &TransferFunction) -> CompositeParams {
    CompositeParams {
        view: camera.view_transform(),
        width: SIZE,
        height: SIZE,
        brightness: tf.brightness(),
        integrating: true,
        shading: None,
    }
}

fn render(
    backend: &mut dyn ProjectionBackend,
    mesh: &MeshView<'_>,
    tf: &TransferFunction,
    params: &CompositeParams,
) -> (Vec<ClassificationRecord>, FrameImage) {
    backend.upload_mesh(mesh).unwrap();
    backend.upload_transfer_function(tf).unwrap();
    backend.upload_psi_table(&PsiTable::new(64)).unwrap();
    let records = backend.first_step(&params.view).unwrap();
    let mut builder = ArrayBuilder::new();
    builder.reset(mesh);
    let arrays = builder.setup_and_reorder(mesh, &records, &[0]).unwrap();
    let frame = backend.second_step(arrays, params).unwrap();
    (records, frame)
}

fn thick_pixel(record: &ClassificationRecord) -> (u32, u32) {
    let p: Vec2 = ndc_to_pixel(record.thick_position, SIZE, SIZE);
    (p.x as u32, p.y as u32)
}

#[test]
fn test_cpu_first_step_matches_reference() {
    let fixture = Fixture::new();
    let mesh = fixture.view(false);
    let camera = Camera::new(1.0);
    let mut backend = CpuBackend::new();
    backend.upload_mesh(&mesh).unwrap();
    let records = backend.first_step(&camera.view_transform()).unwrap();
    assert_eq!(records, classify_mesh(&mesh, &camera.view_transform()));
    assert_eq!(records[0].fan_count, 5);
    assert!((records[0].thickness - 1.0).abs() < 1e-5);
}

#[test]
fn test_cpu_first_step_requires_mesh() {
    let mut backend = CpuBackend::new();
    let camera = Camera::new(1.0);
    assert!(backend.first_step(&camera.view_transform()).is_err());
}

#[test]
fn test_cpu_thick_tet_is_nearly_opaque() {
    let fixture = Fixture::new();
    let mesh = fixture.view(false);
    let camera = Camera::new(1.0);
    let tf = opaque_white();
    let (records, frame) = render(&mut CpuBackend::new(), &mesh, &tf, &params(&camera, &tf));

    let (x, y) = thick_pixel(&records[0]);
    let center = frame.pixel(x, y);
    assert!(center.w > 0.99, "{center:?}");
    assert!((center.x - center.w).abs() < 0.02);
    assert_eq!(frame.pixel(0, 0), Vec4::ZERO);
    assert_eq!(frame.pixel(SIZE - 1, SIZE - 1), Vec4::ZERO);
    // the silhouette is the projected base triangle
    let covered = frame.covered_pixels();
    assert!(covered > 100 && covered < (SIZE * SIZE / 2) as usize, "{covered}");
}

#[test]
fn test_cpu_transparent_transfer_function() {
    let fixture = Fixture::new();
    let mesh = fixture.view(false);
    let camera = Camera::new(1.0);
    let tf = TransferFunction::from_entries(vec![Vec4::new(1.0, 1.0, 1.0, 0.0); 256], 1.0).unwrap();
    let (_, frame) = render(&mut CpuBackend::new(), &mesh, &tf, &params(&camera, &tf));
    assert_eq!(frame.covered_pixels(), 0);
}

#[test]
fn test_cpu_average_attenuation_without_integration() {
    let fixture = Fixture::new();
    let mesh = fixture.view(false);
    let camera = Camera::new(1.0);
    let tf =
        TransferFunction::from_entries(vec![Vec4::new(1.0, 0.0, 0.0, 0.25); 256], 1.0).unwrap();
    let mut p = params(&camera, &tf);
    p.integrating = false;
    let (records, frame) = render(&mut CpuBackend::new(), &mesh, &tf, &p);

    let (x, y) = thick_pixel(&records[0]);
    let c = frame.pixel(x, y);
    // thickness close to the maximum: alpha = 1 - exp(-0.25)
    let expected = 1.0 - (-0.25_f32).exp();
    assert!((c.w - expected).abs() < 0.03, "{c:?}");
    assert!((c.x - c.w).abs() < 1e-5);
    assert_eq!(c.y, 0.0);
}

#[test]
fn test_cpu_shading_changes_color() {
    let fixture = Fixture::new();
    let camera = Camera::new(1.0);
    let mut tf = opaque_white();
    tf.apply_color_code(2);
    let plain = params(&camera, &tf);
    let shaded = CompositeParams {
        shading: Some(IlluminationControl {
            ks: 0.0,
            kd: 0.2,
            ka: 0.0,
            ..Default::default()
        }),
        ..plain
    };

    let mesh = fixture.view(true);
    let (records, unlit) = render(&mut CpuBackend::new(), &mesh, &tf, &plain);
    let (_, lit) = render(&mut CpuBackend::new(), &mesh, &tf, &shaded);
    let (x, y) = thick_pixel(&records[0]);
    let (a, b) = (unlit.pixel(x, y), lit.pixel(x, y));
    assert!((a.w - b.w).abs() < 1e-6);
    assert!(b.truncate().length() < a.truncate().length());

    // without gradients the shading flag is ignored
    let flat = fixture.view(false);
    let (_, a) = render(&mut CpuBackend::new(), &flat, &tf, &plain);
    let (_, b) = render(&mut CpuBackend::new(), &flat, &tf, &shaded);
    assert_eq!(a, b);
}

#[test]
fn test_gpu_matches_cpu() {
    let mut gpu = match GpuBackend::new() {
        Ok(gpu) => gpu,
        Err(e) => {
            println!("Skipping GPU test: {e}");
            return;
        }
    };
    let fixture = Fixture::new();
    let mesh = fixture.view(true);
    let mut camera = Camera::new(1.0);
    camera.orbit(0.4, 0.2);
    let tf = opaque_white();
    let p = params(&camera, &tf);

    let (cpu_records, cpu_frame) = render(&mut CpuBackend::new(), &mesh, &tf, &p);
    let (gpu_records, gpu_frame) = render(&mut gpu, &mesh, &tf, &p);

    assert_eq!(cpu_records.len(), gpu_records.len());
    for (c, g) in cpu_records.iter().zip(&gpu_records) {
        assert_eq!(c.row, g.row);
        assert_eq!(c.fan_count, g.fan_count);
        assert!((c.thick_position - g.thick_position).length() < 1e-4);
        assert!((c.thickness - g.thickness).abs() < 1e-4);
        assert!((c.scalar_front - g.scalar_front).abs() < 1e-4);
        assert!((c.scalar_back - g.scalar_back).abs() < 1e-4);
        assert!((c.centroid_depth - g.centroid_depth).abs() < 1e-4);
        assert!((c.gradient_front - g.gradient_front).length() < 1e-4);
    }

    let (x, y) = thick_pixel(&cpu_records[0]);
    assert!((cpu_frame.pixel(x, y).w - gpu_frame.pixel(x, y).w).abs() < 0.01);
    let (cpu_cov, gpu_cov) = (cpu_frame.covered_pixels() as f32, gpu_frame.covered_pixels() as f32);
    assert!((cpu_cov - gpu_cov).abs() <= cpu_cov * 0.05, "{cpu_cov} vs {gpu_cov}");
}
