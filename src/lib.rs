//! # RGBD Particles
//!
//! Animated point clouds from side-by-side RGBD video.
//!
//! Each frame of the input holds a color image on the left and a hue-encoded
//! depth map on the right. A fixed square grid of particles samples the
//! frame: every particle is born at the 3D point behind its pixel, drifts
//! through a noise field for a random lifetime and is then reborn at the
//! current frame. The result is a point cloud that keeps dissolving into and
//! re-forming from the video.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rgbd_particles::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let source = StillFrameSource::open("frame.png", "capture.mp4")?;
//!
//!     Simulation::new()
//!         .with_grid_size(256)
//!         .with_lifecycle(Lifecycle::flicker())
//!         .run(source)
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Fields
//!
//! State is four per-cell fields (lifecycle, position, velocity, color),
//! each double-buffered: a tick reads the previous generation and writes the
//! next, then all four swap.
//!
//! ### Passes
//!
//! One pass per field. Passes may also read the generation another pass
//! wrote earlier in the same tick, so the wiring forms a DAG
//! ([`PassGraph`]) and passes run in its topological order:
//!
//! ```text
//! lifecycle -> position -> velocity -> color
//! ```
//!
//! ### Depth
//!
//! Depth is `3 * hue` of the right half, unprojected through the camera
//! intrinsics. Samples outside the depth range, near the frame edge or
//! across a depth discontinuity are discarded: the particle is hidden and
//! respawns next tick.
//!
//! ### Backends
//!
//! [`Simulation::build`] returns a [`ParticleSimulation`] that ticks on the
//! CPU (with rayon) and exposes its fields for inspection. [`Simulation::run`]
//! runs the same passes as WGSL compute shaders and draws the points.

pub mod calibration;
pub mod color;
pub mod depth;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod graph;
pub mod integrator;
pub mod lifecycle;
pub mod math;
pub mod params;
pub mod shader;
pub mod shader_utils;
mod simulation;
pub mod state;
pub mod time;
pub mod uniforms;
pub mod visuals;
mod window;

pub use calibration::{Intrinsics, MatrixLayout, RecordMetadata};
pub use error::{CalibrationError, ConfigError, FrameError, GpuError, SimulationError};
pub use frame::{FrameSource, RgbdFrame, StillFrameSource};
pub use glam::{UVec2, Vec2, Vec3, Vec4};
pub use graph::{PassGraph, PassKind};
pub use integrator::NoiseField;
pub use lifecycle::Lifecycle;
pub use params::{TickParams, Tunables};
pub use simulation::{PackedTextures, ParticleSimulation, RenderTextures, Simulation, TickStats};
pub use state::{AuxFlag, LifecycleCell, PositionCell};
pub use visuals::{BlendMode, PointStyle};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use rgbd_particles::prelude::*;
/// ```
pub mod prelude {
    pub use crate::calibration::Intrinsics;
    pub use crate::error::{ConfigError, SimulationError};
    pub use crate::frame::{FrameSource, RgbdFrame, StillFrameSource};
    pub use crate::integrator::NoiseField;
    pub use crate::lifecycle::Lifecycle;
    pub use crate::params::Tunables;
    pub use crate::simulation::{ParticleSimulation, Simulation};
    pub use crate::state::{AuxFlag, LifecycleCell, PositionCell};
    pub use crate::time::FrameClock;
    pub use crate::visuals::{BlendMode, PointStyle};
    pub use crate::{UVec2, Vec2, Vec3, Vec4};
}
