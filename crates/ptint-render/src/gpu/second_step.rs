//! Second step on the GPU: one indexed draw of all fans into a float target.

use glam::Vec4;
use ptint_core::{DrawArrays, PsiTable, TransferFunction};

use crate::backend::CompositeParams;
use crate::buffer::{
    aligned_bytes_per_row, create_data_texture, create_index_buffer, create_readback_buffer,
    create_uniform_buffer, create_vertex_buffer, read_buffer,
};
use crate::{FrameImage, RenderResult};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const TARGET_BYTES_PER_PIXEL: u32 = 8;

/// Uniforms for the second step.
/// Layout must match WGSL Uniforms in `second_step.wgsl` (144 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SecondStepUniforms {
    pub mvp: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub brightness: f32,
    pub max_thickness: f32,
    pub integrating: u32,
    pub shading: u32,
    pub ks: f32,
    pub kd: f32,
    pub ka: f32,
    pub shininess: f32,
    pub rho_a: [f32; 4],
    pub rho_b: [f32; 4],
}

impl SecondStepUniforms {
    fn new(params: &CompositeParams, max_thickness: f32, integrating: bool, shading: bool) -> Self {
        let illumination = params.shading.unwrap_or_default();
        let [r0, r1, r2] = illumination.rho;
        Self {
            mvp: params.view.model_view_projection().to_cols_array_2d(),
            light_dir: params.light_direction().extend(0.0).to_array(),
            brightness: params.brightness,
            max_thickness,
            integrating: u32::from(integrating),
            shading: u32::from(shading),
            ks: illumination.ks,
            kd: illumination.kd,
            ka: illumination.ka,
            shininess: illumination.shininess,
            rho_a: [r0[0], r0[1], r1[0], r1[1]],
            rho_b: [r2[0], r2[1], 0.0, 0.0],
        }
    }
}

fn attribute(location: u32, format: wgpu::VertexFormat) -> [wgpu::VertexAttribute; 1] {
    [wgpu::VertexAttribute {
        format,
        offset: 0,
        shader_location: location,
    }]
}

/// Render pipeline and lookup textures of the second step.
pub struct SecondStepPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    tf_view: wgpu::TextureView,
    psi_view: wgpu::TextureView,
    has_psi: bool,
}

impl SecondStepPass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("second step shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/second_step.wgsl").into()),
        });

        let lookup_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("second step bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // transfer function
                lookup_entry(1),
                // pre-integration table
                lookup_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("second step pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // one buffer per attribute: position, color, gradient front, gradient back
        let position = attribute(0, wgpu::VertexFormat::Float32x4);
        let color = attribute(1, wgpu::VertexFormat::Float32x3);
        let gradient_front = attribute(2, wgpu::VertexFormat::Float32x3);
        let gradient_back = attribute(3, wgpu::VertexFormat::Float32x3);
        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: 16,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &position,
            },
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &color,
            },
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &gradient_front,
            },
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &gradient_back,
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("second step pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    // premultiplied over
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = create_uniform_buffer(
            device,
            &<SecondStepUniforms as bytemuck::Zeroable>::zeroed(),
            Some("second step uniforms"),
        );

        let mut pass = Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            tf_view: Self::lookup_view(
                device,
                queue,
                "transfer function",
                wgpu::TextureFormat::Rgba32Float,
                (1, 1),
                16,
                &[],
            ),
            psi_view: Self::lookup_view(
                device,
                queue,
                "pre-integration table",
                wgpu::TextureFormat::R32Float,
                (2, 2),
                4,
                &[0.0; 4],
            ),
            has_psi: false,
        };
        pass.upload_transfer_function(device, queue, &TransferFunction::default());
        pass
    }

    fn lookup_view(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        bytes_per_texel: u32,
        data: &[f32],
    ) -> wgpu::TextureView {
        let texture = create_data_texture(
            device,
            queue,
            label,
            format,
            size,
            bytes_per_texel,
            bytemuck::cast_slice(data),
        );
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Uploads the 256 RGBA entries as a 256x1 texture.
    pub fn upload_transfer_function(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        tf: &TransferFunction,
    ) {
        let data: Vec<f32> = tf.entries().iter().flat_map(|e| e.to_array()).collect();
        self.tf_view = Self::lookup_view(
            device,
            queue,
            "transfer function",
            wgpu::TextureFormat::Rgba32Float,
            (tf.entries().len() as u32, 1),
            16,
            &data,
        );
    }

    pub fn upload_psi_table(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        table: &PsiTable,
    ) {
        let size = table.size() as u32;
        self.psi_view = Self::lookup_view(
            device,
            queue,
            "pre-integration table",
            wgpu::TextureFormat::R32Float,
            (size, size),
            4,
            table.data(),
        );
        self.has_psi = true;
    }

    /// Draws all fans and reads the frame back, blocking until done.
    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        arrays: &DrawArrays,
        params: &CompositeParams,
    ) -> RenderResult<FrameImage> {
        let (width, height) = (params.width.max(1), params.height.max(1));
        let shading = params.shading.is_some() && arrays.has_gradients();
        let uniforms = SecondStepUniforms::new(
            params,
            arrays.max_thickness,
            params.integrating && self.has_psi,
            shading,
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("second step bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.tf_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.psi_view),
                },
            ],
        });

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("second step target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let indices = arrays.triangle_list();
        let geometry = (!indices.is_empty()).then(|| {
            let zero_gradients;
            let (gradients_front, gradients_back) = if arrays.has_gradients() {
                (arrays.gradients_front.as_slice(), arrays.gradients_back.as_slice())
            } else {
                zero_gradients = vec![[0.0f32; 3]; arrays.vertices.len()];
                (zero_gradients.as_slice(), zero_gradients.as_slice())
            };
            let vertex_buffers = [
                create_vertex_buffer(device, &arrays.vertices, Some("fan positions")),
                create_vertex_buffer(device, &arrays.colors, Some("fan colors")),
                create_vertex_buffer(device, gradients_front, Some("fan gradients front")),
                create_vertex_buffer(device, gradients_back, Some("fan gradients back")),
            ];
            let index_buffer = create_index_buffer(device, &indices, Some("fan indices"));
            (vertex_buffers, index_buffer)
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("second step encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("second step"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            if let Some((vertex_buffers, index_buffer)) = &geometry {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                for (slot, buffer) in vertex_buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..indices.len() as u32, 0, 0..1);
            }
        }

        let bytes_per_row = aligned_bytes_per_row(width, TARGET_BYTES_PER_PIXEL);
        let readback = create_readback_buffer(
            device,
            u64::from(bytes_per_row) * u64::from(height),
            Some("second step readback"),
        );
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let data = read_buffer(device, &readback)?;
        let row_bytes = (width * TARGET_BYTES_PER_PIXEL) as usize;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in data.chunks_exact(bytes_per_row as usize).take(height as usize) {
            pixels.extend(row[..row_bytes].chunks_exact(8).map(|texel| {
                let halves = bytemuck::pod_read_unaligned::<[u16; 4]>(texel);
                Vec4::from_array(halves.map(|h| half::f16::from_bits(h).to_f32()))
            }));
        }
        log::debug!("gpu second step: {} triangles", indices.len() / 3);
        FrameImage::from_pixels(width, height, pixels)
    }
}
