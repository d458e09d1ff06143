//! GPU backend: device setup, compute passes and point rendering.

mod camera;
mod compute;
mod points;

use std::sync::Arc;

use winit::window::Window;

pub use camera::Camera;
pub use compute::{check_limits, field_buffer_size, GpuParticles, FRAME_FORMAT};
pub use points::PointRenderer;

use crate::error::GpuError;
use crate::frame::RgbdFrame;
use crate::graph::PassKind;
use crate::params::TickParams;
use crate::simulation::Simulation;
use crate::uniforms::RenderUniforms;
use crate::visuals::PointStyle;

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    particles: GpuParticles,
    points: PointRenderer,
    style: PointStyle,
    pub camera: Camera,
}

impl GpuState {
    /// `order` is the validated pass order of `sim`.
    pub async fn new(
        window: Arc<Window>,
        sim: &Simulation,
        order: &[PassKind],
        frame: &RgbdFrame,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let features = adapter.get_texture_format_features(FRAME_FORMAT);
        if !features.allowed_usages.contains(wgpu::TextureUsages::TEXTURE_BINDING) {
            return Err(GpuError::UnsupportedFormat(FRAME_FORMAT));
        }

        let limits = adapter.limits();
        check_limits(&limits, sim.grid_size(), frame)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Colors come from an Unorm texture, so present them unconverted.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::debug!("Surface {}x{} {:?}", config.width, config.height, config.format);

        let particles = GpuParticles::new(&device, &queue, sim.grid_size(), sim.graph(), order, frame);
        let style = sim.point_style();
        let points = PointRenderer::new(&device, config.format, &style, &particles);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            particles,
            points,
            style,
            camera: Camera::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn upload_frame(&mut self, frame: &RgbdFrame) {
        self.particles.upload_frame(&self.device, &self.queue, frame);
    }

    /// Run one simulation tick on its own submission.
    ///
    /// Independent of the surface, so a lost or outdated swapchain frame
    /// never drops a tick.
    pub fn step(&mut self, params: &TickParams) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Compute Encoder"),
        });
        self.particles.step(&mut encoder, &self.queue, params);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draw the latest generation.
    pub fn render(&mut self, particle_size: f32) -> Result<(), wgpu::SurfaceError> {
        let aspect = self.config.width as f32 / self.config.height as f32;
        let uniforms = RenderUniforms::new(
            self.camera.view_matrix(),
            self.camera.projection_matrix(aspect),
            particle_size,
            (self.config.width, self.config.height),
            &self.style,
        );
        self.points.update_uniforms(&self.queue, &uniforms);

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let bg = self.style.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.x as f64,
                            g: bg.y as f64,
                            b: bg.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.points.draw(&mut render_pass, self.particles.parity());
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
