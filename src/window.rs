//! Interactive viewer.
//!
//! Drag with the left mouse button to orbit, scroll to zoom. Space pauses,
//! `+`/`-` change the particle size, `R` resets the camera and Escape quits.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::SimulationError;
use crate::frame::FrameSource;
use crate::gpu::{Camera, GpuState};
use crate::graph::PassKind;
use crate::params::{TickParams, Tunables};
use crate::simulation::Simulation;
use crate::time::FrameClock;

/// Factor applied to the particle size per key press.
const SIZE_STEP: f32 = 1.25;

pub(crate) struct App<S: FrameSource> {
    sim: Simulation,
    order: Vec<PassKind>,
    tunables: Tunables,
    source: S,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    clock: FrameClock,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    /// First fatal error; ends the event loop.
    error: Option<SimulationError>,
}

impl<S: FrameSource> App<S> {
    pub(crate) fn new(sim: Simulation, order: Vec<PassKind>, source: S) -> Self {
        let tunables = sim.tunables();
        Self {
            sim,
            order,
            tunables,
            source,
            window: None,
            gpu_state: None,
            clock: FrameClock::new(),
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        }
    }

    pub(crate) fn into_result(self) -> Result<(), SimulationError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("{}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title("RGBD Particles")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        self.window = Some(window.clone());

        let gpu_state = pollster::block_on(GpuState::new(window, &self.sim, &self.order, self.source.frame()))?;
        self.gpu_state = Some(gpu_state);
        self.clock = FrameClock::new();
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                self.clock.toggle_pause();
                log::info!("{}", if self.clock.is_paused() { "Paused" } else { "Resumed" });
            }
            KeyCode::Equal | KeyCode::NumpadAdd => self.scale_particles(SIZE_STEP),
            KeyCode::Minus | KeyCode::NumpadSubtract => self.scale_particles(1.0 / SIZE_STEP),
            KeyCode::KeyR => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera = Camera::new();
                }
            }
            _ => {}
        }
    }

    fn scale_particles(&mut self, factor: f32) {
        let size = self.tunables.particle_size() * factor;
        match self.tunables.set_particle_size(size) {
            Ok(()) => log::debug!("Particle size {:.4}", size),
            Err(e) => log::warn!("Ignoring tunable update: {}", e),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        // Step before acquiring the surface; a lost frame must not drop a tick.
        if let Some((dt, time)) = self.clock.tick() {
            if self.source.advance(time) {
                gpu_state.upload_frame(self.source.frame());
            }
            let params = TickParams::new(
                dt,
                time,
                self.tunables,
                self.sim.depth_scale(),
                self.sim.lifecycle(),
                self.sim.noise(),
                self.source.intrinsics(),
                self.source.frame().half_resolution(),
            );
            gpu_state.step(&params);
        }

        match gpu_state.render(self.tunables.particle_size()) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu_state.resize(winit::dpi::PhysicalSize {
                width: gpu_state.config.width,
                height: gpu_state.config.height,
            }),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl<S: FrameSource> ApplicationHandler for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        if let Some(gpu_state) = &mut self.gpu_state {
                            gpu_state.camera.orbit((position.x - last_x) as f32, (position.y - last_y) as f32);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera.zoom(scroll);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
