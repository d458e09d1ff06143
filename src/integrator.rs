//! Position and velocity transitions.
//!
//! Respawning cells are re-seeded from the depth frame with zero velocity.
//! Living cells drift through a noise field:
//!
//! ```text
//! a = strength * (noise(p*f + o1), noise(p*f + o2), noise(p*f + o3))
//! v' = (v + a*dt) * (1 - drag*dt)
//! p' = p + v*dt
//! ```
//!
//! Both transitions read the previous generation of position and velocity.
//! The position pass uses the previous velocity, and the velocity pass
//! samples noise at the previous position, never at this tick's output.

use crate::depth::{unproject_texel, Unprojection};
use crate::frame::RgbdFrame;
use crate::math::noise3;
use crate::params::TickParams;
use crate::state::{AuxFlag, LifecycleCell, PositionCell};
use glam::{UVec2, Vec3};

/// Noise-driven acceleration field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseField {
    pub strength: f32,
    /// Spatial frequency applied to positions before sampling.
    pub frequency: f32,
    /// Per-axis sample offsets, decorrelating the three components.
    pub offsets: [Vec3; 3],
    /// Velocity damping per second. Zero disables drag.
    pub drag: f32,
}

impl Default for NoiseField {
    fn default() -> Self {
        Self {
            strength: 0.1,
            frequency: 1.0,
            offsets: [
                Vec3::ZERO,
                Vec3::new(123.4, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 234.5),
            ],
            drag: 0.0,
        }
    }
}

impl NoiseField {
    pub fn new(strength: f32) -> Self {
        Self {
            strength,
            ..Default::default()
        }
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_offsets(mut self, offsets: [Vec3; 3]) -> Self {
        self.offsets = offsets;
        self
    }

    /// Acceleration at `p`.
    pub fn acceleration(&self, p: Vec3) -> Vec3 {
        let q = p * self.frequency;
        self.strength
            * Vec3::new(
                noise3(q + self.offsets[0]),
                noise3(q + self.offsets[1]),
                noise3(q + self.offsets[2]),
            )
    }
}

/// Position transition for one cell.
///
/// A respawn claims the slot even when the depth is rejected; the previous
/// position is kept and the cell is flagged until a later respawn succeeds.
pub fn advance_position(
    prev: &PositionCell,
    prev_velocity: Vec3,
    lifecycle: &LifecycleCell,
    frame: &RgbdFrame,
    texel: UVec2,
    params: &TickParams,
) -> PositionCell {
    if lifecycle.respawn {
        return match unproject_texel(frame, texel, &params.intrinsics, &params.depth_filter()) {
            Unprojection::Point(position) => PositionCell {
                position,
                flag: AuxFlag::None,
            },
            Unprojection::Rejected(_) => PositionCell {
                position: prev.position,
                flag: AuxFlag::InvalidDepth,
            },
        };
    }

    PositionCell {
        position: prev.position + prev_velocity * params.delta_time,
        flag: prev.flag,
    }
}

/// Velocity transition for one cell.
pub fn advance_velocity(
    prev: Vec3,
    prev_position: &PositionCell,
    lifecycle: &LifecycleCell,
    params: &TickParams,
) -> Vec3 {
    if lifecycle.respawn {
        return Vec3::ZERO;
    }

    let dt = params.delta_time;
    let v = prev + params.noise.acceleration(prev_position.position) * dt;
    if params.noise.drag > 0.0 {
        v * (1.0 - params.noise.drag * dt).max(0.0)
    } else {
        v
    }
}
