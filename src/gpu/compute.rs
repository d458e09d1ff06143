//! Compute passes on the GPU.
//!
//! Each field lives in two storage buffers. `parity` names the slot holding
//! the previous generation; passes write the other slot and the slots flip
//! after the last pass. Bind groups for both parities are built up front, so
//! a tick is four dispatches and no allocation.

use crate::error::GpuError;
use crate::frame::RgbdFrame;
use crate::graph::{Generation, PassGraph, PassKind};
use crate::params::TickParams;
use crate::shader::{generate_compute_shader, output_binding, pass_inputs, FIRST_INPUT_BINDING, WORKGROUP_SIZE};
use crate::state::{pack, LifecycleCell, PositionCell};
use crate::uniforms::SimUniforms;
use glam::Vec3;
use wgpu::util::DeviceExt;

/// Sampled as plain `[0, 1]` values so hue decoding matches the CPU.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const TEXEL_BYTES: u64 = 16;

struct PassPipeline {
    kind: PassKind,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    bind_groups: [wgpu::BindGroup; 2],
}

/// GPU twin of [`ParticleSimulation`](crate::ParticleSimulation).
pub struct GpuParticles {
    grid_size: u32,
    graph: PassGraph,
    /// `[field][slot]`
    buffers: [[wgpu::Buffer; 2]; 4],
    uniform_buffer: wgpu::Buffer,
    frame_texture: wgpu::Texture,
    frame_view: wgpu::TextureView,
    passes: Vec<PassPipeline>,
    parity: usize,
}

/// Bytes of one field buffer for an `n x n` grid.
pub fn field_buffer_size(grid_size: u32) -> u64 {
    grid_size as u64 * grid_size as u64 * TEXEL_BYTES
}

/// Check grid and frame sizes against device limits.
pub fn check_limits(limits: &wgpu::Limits, grid_size: u32, frame: &RgbdFrame) -> Result<(), GpuError> {
    let bytes = field_buffer_size(grid_size);
    let limit = limits.max_storage_buffer_binding_size as u64;
    if bytes > limit {
        return Err(GpuError::GridTooLarge {
            grid_size,
            bytes,
            limit,
        });
    }

    let max_dim = limits.max_texture_dimension_2d;
    if frame.width() > max_dim || frame.height() > max_dim {
        return Err(GpuError::FrameTooLarge {
            width: frame.width(),
            height: frame.height(),
            limit: max_dim,
        });
    }
    Ok(())
}

impl GpuParticles {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        grid_size: u32,
        graph: &PassGraph,
        order: &[PassKind],
        frame: &RgbdFrame,
    ) -> Self {
        let n = grid_size as usize * grid_size as usize;

        let initial = |kind: PassKind| -> Vec<[f32; 4]> {
            match kind {
                PassKind::Lifecycle => pack(&vec![LifecycleCell::spawning(); n]),
                PassKind::Position => pack(&vec![PositionCell::unseeded(); n]),
                PassKind::Velocity | PassKind::Color => pack(&vec![Vec3::ZERO; n]),
            }
        };

        let buffers = PassKind::ALL.map(|kind| {
            let data = initial(kind);
            [0, 1].map(|slot| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} buffer {}", kind.name(), slot)),
                    contents: bytemuck::cast_slice(&data),
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                })
            })
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Uniform Buffer"),
            contents: bytemuck::bytes_of(&SimUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (frame_texture, frame_view) = create_frame_texture(device, queue, frame);

        let mut particles = Self {
            grid_size,
            graph: graph.clone(),
            buffers,
            uniform_buffer,
            frame_texture,
            frame_view,
            passes: Vec::with_capacity(order.len()),
            parity: 0,
        };

        for &kind in order {
            let pass = particles.create_pass(device, kind);
            particles.passes.push(pass);
        }

        log::info!(
            "GPU particles: {0}x{0} grid, {1} KiB per field buffer",
            grid_size,
            field_buffer_size(grid_size) / 1024
        );

        particles
    }

    fn create_pass(&self, device: &wgpu::Device, kind: PassKind) -> PassPipeline {
        let source = generate_compute_shader(&self.graph, kind);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} compute shader", kind.name())),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut entries = vec![
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
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ];
        let inputs = pass_inputs(&self.graph, kind);
        for k in 0..inputs.len() {
            entries.push(storage_entry(FIRST_INPUT_BINDING + k as u32, true));
        }
        entries.push(storage_entry(output_binding(&self.graph, kind), false));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} bind group layout", kind.name())),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", kind.name())),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{} pipeline", kind.name())),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let bind_groups = [0, 1].map(|parity| self.create_bind_group(device, kind, &layout, parity));

        PassPipeline {
            kind,
            pipeline,
            layout,
            bind_groups,
        }
    }

    fn create_bind_group(
        &self,
        device: &wgpu::Device,
        kind: PassKind,
        layout: &wgpu::BindGroupLayout,
        parity: usize,
    ) -> wgpu::BindGroup {
        let prev = parity;
        let next = 1 - parity;

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&self.frame_view),
            },
        ];
        for (k, dep) in pass_inputs(&self.graph, kind).iter().enumerate() {
            let slot = match dep.generation {
                Generation::Previous => prev,
                Generation::Current => next,
            };
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_INPUT_BINDING + k as u32,
                resource: self.buffers[dep.field.index()][slot].as_entire_binding(),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: output_binding(&self.graph, kind),
            resource: self.buffers[kind.index()][next].as_entire_binding(),
        });

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group {}", kind.name(), parity)),
            layout,
            entries: &entries,
        })
    }

    /// Replace the frame texture contents. A resolution change reallocates
    /// the texture and rebuilds the bind groups.
    pub fn upload_frame(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &RgbdFrame) {
        let size = self.frame_texture.size();
        if size.width == frame.width() && size.height == frame.height() {
            write_frame(queue, &self.frame_texture, frame);
            return;
        }

        log::debug!("Frame resized to {}x{}", frame.width(), frame.height());
        let (texture, view) = create_frame_texture(device, queue, frame);
        self.frame_texture = texture;
        self.frame_view = view;

        let mut passes = std::mem::take(&mut self.passes);
        for pass in &mut passes {
            pass.bind_groups = [0, 1].map(|parity| self.create_bind_group(device, pass.kind, &pass.layout, parity));
        }
        self.passes = passes;
    }

    /// Run every pass once and flip generations.
    pub fn step(&mut self, encoder: &mut wgpu::CommandEncoder, queue: &wgpu::Queue, params: &TickParams) {
        let uniforms = SimUniforms::from_params(params, self.grid_size);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let groups = self.grid_size.div_ceil(WORKGROUP_SIZE);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Compute Pass"),
                timestamp_writes: None,
            });
            for p in &self.passes {
                pass.set_pipeline(&p.pipeline);
                pass.set_bind_group(0, &p.bind_groups[self.parity], &[]);
                pass.dispatch_workgroups(groups, groups, 1);
            }
        }

        self.parity = 1 - self.parity;
    }

    /// Buffer holding the latest generation of `field`.
    pub fn current_buffer(&self, field: PassKind) -> &wgpu::Buffer {
        &self.buffers[field.index()][self.parity]
    }

    /// Buffers of `field` in slot order; pair with [`parity`](Self::parity).
    pub fn field_buffers(&self, field: PassKind) -> &[wgpu::Buffer; 2] {
        &self.buffers[field.index()]
    }

    /// Slot of the latest generation.
    pub fn parity(&self) -> usize {
        self.parity
    }

    pub fn instance_count(&self) -> u32 {
        self.grid_size * self.grid_size
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_frame_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    frame: &RgbdFrame,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("RGBD Frame Texture"),
        size: wgpu::Extent3d {
            width: frame.width(),
            height: frame.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FRAME_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_frame(queue, &texture, frame);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn write_frame(queue: &wgpu::Queue, texture: &wgpu::Texture, frame: &RgbdFrame) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        frame.as_rgba(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * frame.width()),
            rows_per_image: Some(frame.height()),
        },
        wgpu::Extent3d {
            width: frame.width(),
            height: frame.height(),
            depth_or_array_layers: 1,
        },
    );
}
