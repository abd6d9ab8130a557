//! wgpu backend: a compute first step and a render second step.

pub mod first_step;
pub mod second_step;

use ptint_core::{
    BackendKind, ClassificationRecord, DrawArrays, MeshView, PsiTable, TransferFunction,
    ViewTransform,
};

use crate::backend::{CompositeParams, ProjectionBackend};
use crate::{FrameImage, RenderError, RenderResult};

pub use first_step::{FirstStepPass, FirstStepUniforms};
pub use second_step::{SecondStepPass, SecondStepUniforms};

/// Headless GPU execution of both passes.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    first_step: FirstStepPass,
    second_step: SecondStepPass,
}

impl GpuBackend {
    /// Creates a headless device and both pipelines.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ptint device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let first_step = FirstStepPass::new(&device, &queue);
        let second_step = SecondStepPass::new(&device, &queue);
        Ok(Self {
            device,
            queue,
            first_step,
            second_step,
        })
    }

    /// Blocking variant of [`Self::new_headless`].
    pub fn new() -> RenderResult<Self> {
        pollster::block_on(Self::new_headless())
    }
}

impl ProjectionBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn upload_mesh(&mut self, mesh: &MeshView<'_>) -> RenderResult<()> {
        self.first_step.upload_mesh(&self.device, &self.queue, mesh)
    }

    fn upload_transfer_function(&mut self, tf: &TransferFunction) -> RenderResult<()> {
        self.second_step
            .upload_transfer_function(&self.device, &self.queue, tf);
        Ok(())
    }

    fn upload_psi_table(&mut self, table: &PsiTable) -> RenderResult<()> {
        self.second_step
            .upload_psi_table(&self.device, &self.queue, table);
        Ok(())
    }

    fn first_step(&mut self, view: &ViewTransform) -> RenderResult<Vec<ClassificationRecord>> {
        self.first_step.run(&self.device, &self.queue, view)
    }

    fn second_step(
        &mut self,
        arrays: &DrawArrays,
        params: &CompositeParams,
    ) -> RenderResult<FrameImage> {
        self.second_step
            .run(&self.device, &self.queue, arrays, params)
    }
}
