//! First step on the GPU: one compute invocation per output slot.

use ptint_core::classify::{decode_records, QUADS_PER_RECORD};
use ptint_core::tables::NUM_ROWS;
use ptint_core::texture::{pack_gradients, pack_order_table, pack_tets, pack_vertices};
use ptint_core::{ClassificationRecord, MeshView, SquareTexture, ViewTransform};

use crate::buffer::{
    create_data_texture, create_output_buffer, create_readback_buffer, create_uniform_buffer,
    read_buffer,
};
use crate::{RenderError, RenderResult};

const WORKGROUP_SIZE: u32 = 64;

/// Bytes of one output slot (four vec4<f32>).
const SLOT_BYTES: u64 = (QUADS_PER_RECORD * 16) as u64;

/// Uniforms for the first step.
/// Layout must match WGSL Uniforms in `first_step.wgsl` (144 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FirstStepUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub num_tets: u32,
    /// Side of the square tetrahedron texture.
    pub tex_size: u32,
    pub has_gradients: u32,
    pub _padding: u32,
}

/// Resources that depend on the uploaded mesh.
struct MeshResources {
    bind_group: wgpu::BindGroup,
    output_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
    num_tets: u32,
    tex_size: u32,
    has_gradients: bool,
}

/// Compute pipeline and resources of the first step.
pub struct FirstStepPass {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    order_texture: wgpu::Texture,
    mesh: Option<MeshResources>,
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn upload_square<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    format: wgpu::TextureFormat,
    texture: &SquareTexture<T>,
) -> RenderResult<wgpu::Texture> {
    let max = device.limits().max_texture_dimension_2d;
    if texture.size > max {
        return Err(RenderError::TextureCreationFailed(format!(
            "{label}: {0}x{0} exceeds the device limit of {max}",
            texture.size
        )));
    }
    let bytes_per_texel = (std::mem::size_of::<T>() as u32) * texture.channels;
    Ok(create_data_texture(
        device,
        queue,
        label,
        format,
        (texture.size, texture.size),
        bytes_per_texel,
        bytemuck::cast_slice(&texture.data),
    ))
}

impl FirstStepPass {
    /// Creates the pipeline and uploads the classification table.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("first step shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/first_step.wgsl").into()),
        });

        let float = wgpu::TextureSampleType::Float { filterable: false };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("first step bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // tetrahedra, vertices, gradients, classification table
                texture_entry(1, wgpu::TextureSampleType::Uint),
                texture_entry(2, float),
                texture_entry(3, float),
                texture_entry(4, wgpu::TextureSampleType::Uint),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("first step pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("first step pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let uniform_buffer = create_uniform_buffer(
            device,
            &<FirstStepUniforms as bytemuck::Zeroable>::zeroed(),
            Some("first step uniforms"),
        );

        let order_table = pack_order_table();
        let order_texture = create_data_texture(
            device,
            queue,
            "classification table",
            wgpu::TextureFormat::Rgba32Uint,
            (NUM_ROWS as u32, 2),
            16,
            bytemuck::cast_slice(&order_table),
        );

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            order_texture,
            mesh: None,
        }
    }

    /// Packs the mesh into square textures and sizes the output buffers.
    pub fn upload_mesh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mesh: &MeshView<'_>,
    ) -> RenderResult<()> {
        let tets = pack_tets(mesh.tets);
        let vertices = pack_vertices(mesh.positions, mesh.scalars);
        let gradients = mesh.gradients.map(pack_gradients);

        let uint = wgpu::TextureFormat::Rgba32Uint;
        let float = wgpu::TextureFormat::Rgba32Float;
        let tet_texture = upload_square(device, queue, "tetrahedra", uint, &tets)?;
        let vertex_texture = upload_square(device, queue, "vertices", float, &vertices)?;
        let gradient_texture = match &gradients {
            Some(g) => upload_square(device, queue, "gradients", float, g)?,
            None => create_data_texture(device, queue, "gradients", float, (1, 1), 16, &[]),
        };

        let slots = u64::from(tets.size) * u64::from(tets.size);
        let output_size = slots.max(1) * SLOT_BYTES;
        let limits = device.limits();
        if output_size > u64::from(limits.max_storage_buffer_binding_size) {
            return Err(RenderError::BufferCreationFailed(format!(
                "first step output of {output_size} bytes exceeds the storage binding limit"
            )));
        }
        let workgroups = slots.div_ceil(u64::from(WORKGROUP_SIZE));
        if workgroups > u64::from(limits.max_compute_workgroups_per_dimension) {
            return Err(RenderError::BufferCreationFailed(format!(
                "{} tetrahedra exceed the compute dispatch limit",
                mesh.num_tets()
            )));
        }
        let output_buffer = create_output_buffer(device, output_size, Some("first step output"));
        let readback_buffer =
            create_readback_buffer(device, output_size, Some("first step readback"));

        let views = [&tet_texture, &vertex_texture, &gradient_texture, &self.order_texture]
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("first step bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&views[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&views[3]),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        log::debug!(
            "first step: {} tetrahedra in a {}x{} texture, {} vertices in {}x{}",
            mesh.num_tets(),
            tets.size,
            tets.size,
            mesh.num_vertices(),
            vertices.size,
            vertices.size
        );
        self.mesh = Some(MeshResources {
            bind_group,
            output_buffer,
            readback_buffer,
            num_tets: mesh.num_tets() as u32,
            tex_size: tets.size,
            has_gradients: gradients.is_some(),
        });
        Ok(())
    }

    /// Runs the compute pass and reads the records back, blocking until done.
    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &ViewTransform,
    ) -> RenderResult<Vec<ClassificationRecord>> {
        let mesh = self.mesh.as_ref().ok_or(RenderError::EmptyFrame)?;
        if mesh.num_tets == 0 {
            return Ok(Vec::new());
        }

        let uniforms = FirstStepUniforms {
            model_view: view.model_view.to_cols_array_2d(),
            projection: view.projection.to_cols_array_2d(),
            num_tets: mesh.num_tets,
            tex_size: mesh.tex_size,
            has_gradients: u32::from(mesh.has_gradients),
            _padding: 0,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("first step encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("first step"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &mesh.bind_group, &[]);
            let slots = mesh.tex_size * mesh.tex_size;
            pass.dispatch_workgroups(slots.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(
            &mesh.output_buffer,
            0,
            &mesh.readback_buffer,
            0,
            mesh.output_buffer.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_buffer(device, &mesh.readback_buffer)?;
        let quads: Vec<[f32; 4]> = bytes
            .chunks_exact(16)
            .map(bytemuck::pod_read_unaligned::<[f32; 4]>)
            .collect();
        Ok(decode_records(&quads, mesh.num_tets as usize))
    }
}
