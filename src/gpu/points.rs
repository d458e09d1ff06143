//! Point renderer.
//!
//! Draws one screen-facing quad per cell straight out of the compute
//! buffers. No vertex buffers and no depth attachment: blending is
//! additive by default, so draw order does not matter.

use super::compute::GpuParticles;
use crate::graph::PassKind;
use crate::shader::generate_render_shader;
use crate::uniforms::RenderUniforms;
use crate::visuals::PointStyle;
use wgpu::util::DeviceExt;

pub struct PointRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    /// Indexed by compute parity.
    bind_groups: [wgpu::BindGroup; 2],
    instances: u32,
}

impl PointRenderer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        style: &PointStyle,
        particles: &GpuParticles,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(generate_render_shader().into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Uniform Buffer"),
            contents: bytemuck::bytes_of(&RenderUniforms::new(
                glam::Mat4::IDENTITY,
                glam::Mat4::IDENTITY,
                0.0,
                (1, 1),
                style,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let storage = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Bind Group Layout"),
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
                storage(1),
                storage(2),
                storage(3),
            ],
        });

        let bind_groups = [0, 1].map(|slot| {
            let field = |kind: PassKind| particles.field_buffers(kind)[slot].as_entire_binding();
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Point Bind Group {}", slot)),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: field(PassKind::Position),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: field(PassKind::Color),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: field(PassKind::Lifecycle),
                    },
                ],
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(style.blend_mode.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
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

        Self {
            pipeline,
            uniform_buffer,
            bind_groups,
            instances: particles.instance_count(),
        }
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &RenderUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Draw the generation in slot `parity`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, parity: usize) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[parity], &[]);
        pass.draw(0..6, 0..self.instances);
    }
}
