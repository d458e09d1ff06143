//! Simulation builder and the CPU scheduler.
//!
//! [`Simulation`] collects configuration. [`build`](Simulation::build)
//! validates it and returns a [`ParticleSimulation`] that ticks on the CPU;
//! [`run`](Simulation::run) opens a window and ticks on the GPU instead.
//!
//! # Example
//!
//! ```ignore
//! let source = StillFrameSource::open("frame.png", "capture.mp4")?;
//! let mut sim = Simulation::new()
//!     .with_grid_size(128)
//!     .with_lifecycle(Lifecycle::flicker())
//!     .build()?;
//!
//! sim.tick(1.0 / 60.0, 0.0, &source);
//! let textures = sim.render_textures();
//! ```

use crate::depth::DEFAULT_DEPTH_SCALE;
use crate::error::{ConfigError, SimulationError};
use crate::frame::{FrameSource, RgbdFrame};
use crate::graph::{PassGraph, PassKind};
use crate::integrator::{advance_position, advance_velocity, NoiseField};
use crate::lifecycle::{self, Lifecycle};
use crate::params::{TickParams, Tunables};
use crate::state::{pack, AuxFlag, DoubleBuffer, Grid, LifecycleCell, PositionCell};
use crate::visuals::PointStyle;
use crate::window::App;
use glam::{UVec2, Vec3};
use rayon::prelude::*;
use winit::event_loop::{ControlFlow, EventLoop};

/// A particle simulation builder.
///
/// Use method chaining to configure, then call `.build()` for a CPU engine
/// or `.run(source)` to open the viewer.
#[derive(Clone, Debug)]
pub struct Simulation {
    grid_size: u32,
    lifecycle: Lifecycle,
    noise: NoiseField,
    depth_scale: f32,
    tunables: Tunables,
    graph: PassGraph,
    style: PointStyle,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Create a new simulation with default settings.
    pub fn new() -> Self {
        Self {
            grid_size: 256,
            lifecycle: Lifecycle::default(),
            noise: NoiseField::default(),
            depth_scale: DEFAULT_DEPTH_SCALE,
            tunables: Tunables::default(),
            graph: PassGraph::standard(),
            style: PointStyle::default(),
        }
    }

    /// Set the grid edge length. The particle count is `n * n`.
    pub fn with_grid_size(mut self, n: u32) -> Self {
        self.grid_size = n;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_noise(mut self, noise: NoiseField) -> Self {
        self.noise = noise;
        self
    }

    /// Set the hue-to-meters multiplier of the depth encoding.
    pub fn with_depth_scale(mut self, scale: f32) -> Self {
        self.depth_scale = scale;
        self
    }

    pub fn with_tunables(mut self, tunables: Tunables) -> Self {
        self.tunables = tunables;
        self
    }

    /// Replace the pass wiring. Mostly useful for tests.
    ///
    /// The graph must still declare every standard input; see
    /// [`PassGraph::validate`].
    pub fn with_pass_graph(mut self, graph: PassGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Set how the viewer draws points.
    pub fn with_point_style(mut self, style: PointStyle) -> Self {
        self.style = style;
        self
    }

    pub fn point_style(&self) -> PointStyle {
        self.style
    }

    /// Check every setting; returns the pass order on success.
    pub fn validate(&self) -> Result<Vec<PassKind>, ConfigError> {
        if !(Grid::MIN_SIZE..=Grid::MAX_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::GridSize {
                requested: self.grid_size,
                min: Grid::MIN_SIZE,
                max: Grid::MAX_SIZE,
            });
        }
        if self.depth_scale.is_nan() || self.depth_scale <= 0.0 {
            return Err(ConfigError::DepthScale(self.depth_scale));
        }
        self.lifecycle.validate()?;
        self.tunables.validate()?;
        self.graph.validate()
    }

    /// Validate and build the CPU engine.
    pub fn build(self) -> Result<ParticleSimulation, ConfigError> {
        let order = self.validate().inspect_err(|e| {
            log::error!("Invalid simulation configuration: {}", e);
        })?;

        let bounds = self.lifecycle.lifetime_bounds();
        log::info!(
            "Simulation {0}x{0} ({1} particles), lifetime {2:.2}..{3:.2}s, depth scale {4}",
            self.grid_size,
            self.grid_size * self.grid_size,
            bounds.start,
            bounds.end,
            self.depth_scale
        );

        Ok(ParticleSimulation::new(self, order))
    }

    /// Run the simulation in a window. This blocks until the window is closed.
    pub fn run<S: FrameSource + 'static>(self, source: S) -> Result<(), SimulationError> {
        let order = self.validate().inspect_err(|e| {
            log::error!("Invalid simulation configuration: {}", e);
        })?;
        log::debug!("Pass order: {:?}", order);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(self, order, source);
        event_loop.run_app(&mut app)?;
        app.into_result()
    }

    pub(crate) fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn noise(&self) -> NoiseField {
        self.noise
    }

    pub(crate) fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    pub(crate) fn tunables(&self) -> Tunables {
        self.tunables
    }

    pub(crate) fn graph(&self) -> &PassGraph {
        &self.graph
    }
}

/// Counts from the last tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Cells flagged for respawn this tick.
    pub respawning: usize,
    /// Cells whose position carries the invalid-depth flag.
    pub discarded: usize,
}

/// Borrowed view of the current generation of every field.
#[derive(Clone, Copy, Debug)]
pub struct RenderTextures<'a> {
    pub grid_size: u32,
    pub position: &'a [PositionCell],
    pub velocity: &'a [Vec3],
    pub color: &'a [Vec3],
    pub lifecycle: &'a [LifecycleCell],
}

impl RenderTextures<'_> {
    /// Four-channel texels, ready for upload.
    pub fn packed(&self) -> PackedTextures {
        PackedTextures {
            grid_size: self.grid_size,
            position: pack(self.position),
            velocity: pack(self.velocity),
            color: pack(self.color),
            lifecycle: pack(self.lifecycle),
        }
    }
}

/// Owned four-channel copy of every field.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedTextures {
    pub grid_size: u32,
    pub position: Vec<[f32; 4]>,
    pub velocity: Vec<[f32; 4]>,
    pub color: Vec<[f32; 4]>,
    pub lifecycle: Vec<[f32; 4]>,
}

/// CPU particle engine: four double-buffered fields on a fixed grid.
pub struct ParticleSimulation {
    grid: Grid,
    order: Vec<PassKind>,
    lifecycle_config: Lifecycle,
    noise: NoiseField,
    depth_scale: f32,
    tunables: Tunables,

    lifecycle: DoubleBuffer<LifecycleCell>,
    position: DoubleBuffer<PositionCell>,
    velocity: DoubleBuffer<Vec3>,
    color: DoubleBuffer<Vec3>,

    ticks: u64,
    stats: TickStats,
}

impl ParticleSimulation {
    fn new(config: Simulation, order: Vec<PassKind>) -> Self {
        let grid = Grid::new(config.grid_size);
        let n = grid.cell_count();
        Self {
            grid,
            order,
            lifecycle_config: config.lifecycle,
            noise: config.noise,
            depth_scale: config.depth_scale,
            tunables: config.tunables,
            lifecycle: DoubleBuffer::new(n, LifecycleCell::spawning()),
            position: DoubleBuffer::new(n, PositionCell::unseeded()),
            velocity: DoubleBuffer::new(n, Vec3::ZERO),
            color: DoubleBuffer::new(n, Vec3::ZERO),
            ticks: 0,
            stats: TickStats::default(),
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn pass_order(&self) -> &[PassKind] {
        &self.order
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn tunables(&self) -> Tunables {
        self.tunables
    }

    /// Per-tick snapshot of the configuration for `source`.
    pub fn tick_params(&self, delta_time: f32, time: f32, source: &impl FrameSource) -> TickParams {
        TickParams::new(
            delta_time,
            time,
            self.tunables,
            self.depth_scale,
            &self.lifecycle_config,
            self.noise,
            source.intrinsics(),
            source.frame().half_resolution(),
        )
    }

    /// Advance every cell by one tick.
    pub fn tick(&mut self, delta_time: f32, time: f32, source: &impl FrameSource) {
        let params = self.tick_params(delta_time, time, source);
        let frame = source.frame();

        for i in 0..self.order.len() {
            let pass = self.order[i];
            self.run_pass(pass, &params, frame);
        }

        self.lifecycle.swap();
        self.position.swap();
        self.velocity.swap();
        self.color.swap();
        self.ticks += 1;

        self.stats = self.count_stats();
        log::trace!(
            "tick {} dt={:.4}: {} respawning, {} discarded",
            self.ticks,
            delta_time,
            self.stats.respawning,
            self.stats.discarded
        );
    }

    fn run_pass(&mut self, pass: PassKind, params: &TickParams, frame: &RgbdFrame) {
        let grid = self.grid;
        let half = frame.half_resolution();
        let texel = |i: usize| -> UVec2 { crate::frame::texel_for_uv(grid.uv(grid.coord(i)), half) };

        match pass {
            PassKind::Lifecycle => {
                let prev_position = self.position.current();
                let (prev, next) = self.lifecycle.split();
                next.par_iter_mut().enumerate().for_each(|(i, out)| {
                    *out = lifecycle::advance(&prev[i], prev_position[i].flag, grid.coord(i), params);
                });
            }
            PassKind::Position => {
                let cur_lifecycle = self.lifecycle.next();
                let prev_velocity = self.velocity.current();
                let (prev, next) = self.position.split();
                next.par_iter_mut().enumerate().for_each(|(i, out)| {
                    *out = advance_position(&prev[i], prev_velocity[i], &cur_lifecycle[i], frame, texel(i), params);
                });
            }
            PassKind::Velocity => {
                let cur_lifecycle = self.lifecycle.next();
                let prev_position = self.position.current();
                let (prev, next) = self.velocity.split();
                next.par_iter_mut().enumerate().for_each(|(i, out)| {
                    *out = advance_velocity(prev[i], &prev_position[i], &cur_lifecycle[i], params);
                });
            }
            PassKind::Color => {
                let cur_lifecycle = self.lifecycle.next();
                let (prev, next) = self.color.split();
                next.par_iter_mut().enumerate().for_each(|(i, out)| {
                    *out = crate::color::advance_color(prev[i], &cur_lifecycle[i], frame, texel(i));
                });
            }
        }
    }

    fn count_stats(&self) -> TickStats {
        let respawning = self.lifecycle.current().par_iter().filter(|c| c.respawn).count();
        let discarded = self
            .position
            .current()
            .par_iter()
            .filter(|c| c.flag == AuxFlag::InvalidDepth)
            .count();
        TickStats { respawning, discarded }
    }

    /// Current generation of every field.
    pub fn render_textures(&self) -> RenderTextures<'_> {
        RenderTextures {
            grid_size: self.grid.size(),
            position: self.position.current(),
            velocity: self.velocity.current(),
            color: self.color.current(),
            lifecycle: self.lifecycle.current(),
        }
    }

    // Tunables take effect on the next tick. Rejected values keep the old
    // setting and are logged.

    pub fn set_particle_size(&mut self, size: f32) -> Result<(), ConfigError> {
        self.tunables.set_particle_size(size).inspect_err(warn_rejected)
    }

    pub fn set_depth_range(&mut self, min: f32, max: f32) -> Result<(), ConfigError> {
        self.tunables.set_depth_range(min, max).inspect_err(warn_rejected)
    }

    pub fn set_filter_radius(&mut self, radius: f32) -> Result<(), ConfigError> {
        self.tunables.set_filter_radius(radius).inspect_err(warn_rejected)
    }

    pub fn set_filter_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        self.tunables.set_filter_threshold(threshold).inspect_err(warn_rejected)
    }
}

fn warn_rejected(e: &ConfigError) {
    log::warn!("Ignoring tunable update: {}", e);
}
