//! The per-frame projection pipeline and its interaction state machine.

use ptint_core::{
    texture_size, ArrayBuilder, ClassificationRecord, DrawArrays, IlluminationControl, PsiTable,
    RenderConfig, SortMethod, Sorter, TransferFunction,
};
use ptint_mesh::MeshStore;
use ptint_render::{
    create_backend, Camera, CompositeParams, FrameImage, ProjectionBackend, RenderResult,
};

/// Where the pipeline is in the still / rotating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Nothing rendered yet for the current mesh upload.
    #[default]
    FirstStill,
    /// The view is changing; every frame is rebuilt with the rotating sort.
    Rotating,
    /// The view is fixed; the last frame is reused until something changes.
    Still,
}

/// Owns the mesh, the backend and every per-frame buffer.
pub struct Pipeline {
    mesh: MeshStore,
    config: RenderConfig,
    backend: Box<dyn ProjectionBackend>,
    camera: Camera,
    sorter: Sorter,
    builder: ArrayBuilder,
    transfer_function: TransferFunction,
    illumination: IlluminationControl,
    psi: PsiTable,
    /// Tetrahedra that survived the discard pass.
    visible: Vec<[u32; 4]>,
    discarded_tets: usize,
    texture_size: u32,
    records: Vec<ClassificationRecord>,
    state: FrameState,
    needs_rebuild: bool,
    frame: Option<FrameImage>,
    frames_rendered: u64,
}

impl Pipeline {
    /// Creates a pipeline with the backend named by `config.backend`.
    pub fn new(mesh: MeshStore, config: RenderConfig) -> RenderResult<Self> {
        let backend = create_backend(config.backend)?;
        Self::with_backend(mesh, config, backend)
    }

    /// Creates a pipeline around an existing backend.
    pub fn with_backend(
        mesh: MeshStore,
        config: RenderConfig,
        mut backend: Box<dyn ProjectionBackend>,
    ) -> RenderResult<Self> {
        mesh.validate()?;
        let mut camera = Camera::from_config(&config);
        if let Some((min, max)) = mesh.bounding_box() {
            camera.look_at_box(min, max);
        }
        let transfer_function = TransferFunction::default();
        let psi = PsiTable::new(config.psi_table_size);
        backend.upload_transfer_function(&transfer_function)?;
        backend.upload_psi_table(&psi)?;

        let mut pipeline = Self {
            sorter: Sorter::new(config.layer_count),
            mesh,
            config,
            backend,
            camera,
            builder: ArrayBuilder::new(),
            transfer_function,
            illumination: IlluminationControl::default(),
            psi,
            visible: Vec::new(),
            discarded_tets: 0,
            texture_size: 0,
            records: Vec::new(),
            state: FrameState::FirstStill,
            needs_rebuild: true,
            frame: None,
            frames_rendered: 0,
        };
        pipeline.reload_tet_texture()?;
        Ok(pipeline)
    }

    /// Runs the discard pass and uploads the surviving tetrahedra.
    ///
    /// Tetrahedra whose four vertex scalars all map to zero opacity are
    /// dropped when `discard_transparent` is set. The draw arrays are
    /// reallocated when the tetrahedron count changed.
    pub fn reload_tet_texture(&mut self) -> RenderResult<()> {
        if self.config.discard_transparent {
            let visible = self.mesh.visible_tets(&self.transfer_function);
            self.visible = visible.tets;
            self.discarded_tets = visible.discarded;
        } else {
            self.visible = self.mesh.tets().to_vec();
            self.discarded_tets = 0;
        }
        if self.discarded_tets > 0 {
            log::info!(
                "discarded {} of {} tetrahedra as fully transparent",
                self.discarded_tets,
                self.num_tets()
            );
        }

        self.texture_size = texture_size(self.cur_tets());
        let mesh = self.mesh.view().with_tets(&self.visible);
        if mesh.num_tets() > 0 {
            self.backend.upload_mesh(&mesh)?;
        } else {
            log::warn!("no visible tetrahedra left");
        }
        self.builder.reset(&mesh);
        self.records.clear();
        self.state = FrameState::FirstStill;
        self.needs_rebuild = true;
        Ok(())
    }

    /// Renders a frame, or returns the previous one while still and unchanged.
    ///
    /// The returned image is composited over the configured background.
    pub fn render_frame(&mut self) -> RenderResult<&FrameImage> {
        let reuse = self.state == FrameState::Still && !self.needs_rebuild && self.frame.is_some();
        if !reuse {
            let method = match self.state {
                FrameState::Rotating => self.config.rotating_sort,
                FrameState::FirstStill | FrameState::Still => self.config.still_sort,
            };
            let frame = self.compose(method)?;
            self.frame = Some(frame.over_background(self.config.background));
            self.needs_rebuild = false;
            if self.state == FrameState::FirstStill {
                self.state = FrameState::Still;
            }
            self.frames_rendered += 1;
        }
        self.frame.as_ref().ok_or(ptint_render::RenderError::EmptyFrame)
    }

    fn compose(&mut self, method: SortMethod) -> RenderResult<FrameImage> {
        let (width, height) = (self.config.width, self.config.height);
        let mesh = self.mesh.view().with_tets(&self.visible);
        if mesh.num_tets() == 0 {
            self.records.clear();
            return Ok(FrameImage::new(width, height));
        }

        let view = self.camera.view_transform();
        self.records = self.backend.first_step(&view)?;
        let order = self.sorter.sort(method, &self.records);
        let arrays = self.builder.setup_and_reorder(&mesh, &self.records, order)?;
        let params = CompositeParams {
            view,
            width,
            height,
            brightness: self.transfer_function.brightness(),
            integrating: self.config.integrating,
            shading: self.config.shading.then_some(self.illumination),
        };
        let frame = self.backend.second_step(arrays, &params)?;
        log::debug!(
            "frame {} ({:?}, {method:?} sort): {} tetrahedra, max thickness {:.4}",
            self.frames_rendered,
            self.state,
            mesh.num_tets(),
            arrays.max_thickness
        );
        Ok(frame)
    }

    /// Enters the rotating state without moving the camera.
    pub fn begin_interaction(&mut self) {
        self.state = FrameState::Rotating;
    }

    /// Orbits the camera around its target (radians).
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.camera.orbit(delta_x, delta_y);
        self.state = FrameState::Rotating;
    }

    /// Zooms the camera; factors above 1 magnify.
    pub fn zoom(&mut self, factor: f32) {
        self.camera.zoom(factor);
        self.state = FrameState::Rotating;
    }

    /// Leaves the rotating state; the next frame runs the exact sort once.
    pub fn end_interaction(&mut self) {
        if self.state == FrameState::Rotating {
            self.state = FrameState::Still;
            self.needs_rebuild = true;
        }
    }

    /// Replaces the transfer function and reruns the discard pass.
    pub fn set_transfer_function(&mut self, tf: TransferFunction) -> RenderResult<()> {
        self.backend.upload_transfer_function(&tf)?;
        self.transfer_function = tf;
        self.reload_tet_texture()
    }

    pub fn set_illumination(&mut self, illumination: IlluminationControl) {
        self.illumination = illumination.clamped();
        self.needs_rebuild = true;
    }

    /// Applies a new configuration, recreating whatever it invalidates.
    pub fn set_config(&mut self, config: RenderConfig) -> RenderResult<()> {
        let old = std::mem::replace(&mut self.config, config);
        self.sorter.set_layer_count(self.config.layer_count);
        self.camera.projection_mode = self.config.projection;
        self.camera.set_fov_degrees(self.config.fov_degrees);
        self.camera.set_aspect_ratio(self.config.aspect_ratio());

        let new_backend = old.backend != self.config.backend;
        if new_backend {
            self.backend = create_backend(self.config.backend)?;
            self.backend.upload_transfer_function(&self.transfer_function)?;
        }
        if new_backend || old.psi_table_size != self.config.psi_table_size {
            self.psi = PsiTable::new(self.config.psi_table_size);
            self.backend.upload_psi_table(&self.psi)?;
        }
        if new_backend || old.discard_transparent != self.config.discard_transparent {
            self.reload_tet_texture()?;
        }
        self.needs_rebuild = true;
        Ok(())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn mesh(&self) -> &MeshStore {
        &self.mesh
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.needs_rebuild = true;
        &mut self.camera
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer_function
    }

    pub fn illumination(&self) -> &IlluminationControl {
        &self.illumination
    }

    /// Total tetrahedra in the mesh.
    pub fn num_tets(&self) -> usize {
        self.mesh.num_tets()
    }

    /// Tetrahedra currently uploaded and drawn.
    pub fn cur_tets(&self) -> usize {
        self.visible.len()
    }

    pub fn discarded_tets(&self) -> usize {
        self.discarded_tets
    }

    /// Side length of the square tetrahedron texture for [`Self::cur_tets`].
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Classification records of the last rebuilt frame, by visible tetrahedron.
    pub fn records(&self) -> &[ClassificationRecord] {
        &self.records
    }

    /// Draw arrays of the last rebuilt frame.
    pub fn arrays(&self) -> &DrawArrays {
        self.builder.arrays()
    }

    /// Number of frames actually rebuilt (reused frames are not counted).
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.kind())
            .field("state", &self.state)
            .field("num_tets", &self.num_tets())
            .field("cur_tets", &self.cur_tets())
            .field("frames_rendered", &self.frames_rendered)
            .finish_non_exhaustive()
    }
}
