//! Visual configuration for point rendering.
//!
//! Particles are drawn as screen-facing quads with a radial falloff. The
//! functions here are the CPU reference for the render shader generated in
//! [`crate::shader`], so the two can be tested against each other.
//!
//! # Example
//!
//! ```ignore
//! Simulation::new()
//!     .with_point_style(PointStyle::default().scale_by_lifetime(true))
//!     .run(source)?;
//! ```
//!
//! # Point Model
//!
//! | Quantity | Formula |
//! |----------|---------|
//! | size (px) | `particle_size * 300 / -view_z`, optionally `* (max_age - age) / max_age` |
//! | fade-in | `smoothstep(0, 0.2, age)` |
//! | brightness | `remap(len, 0, 0.5, 1, 0)`, discarded beyond `len = 0.5` |
//! | color | `color * brightness * fade_in` |

use crate::math::{remap, smoothstep};
use crate::state::{AuxFlag, LifecycleCell};
use glam::{Vec2, Vec3, Vec4};

/// Perspective constant of the point size.
pub const POINT_SCALE: f32 = 300.0;

/// Seconds over which a newborn particle fades in.
pub const FADE_IN_SECONDS: f32 = 0.2;

/// Blend mode for particle rendering.
///
/// Controls how overlapping particles combine visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Additive blending (default).
    ///
    /// Particle colors are added together, so dense regions of the cloud
    /// glow. No depth sorting needed.
    #[default]
    Additive,

    /// Standard alpha blending.
    Alpha,
}

impl BlendMode {
    pub fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}

/// Point rendering configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub blend_mode: BlendMode,
    /// Shrink points over their lifetime.
    pub scale_by_lifetime: bool,
    /// Window background color.
    pub background: Vec3,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::Additive,
            scale_by_lifetime: false,
            background: Vec3::ZERO,
        }
    }
}

impl PointStyle {
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn scale_by_lifetime(mut self, enabled: bool) -> Self {
        self.scale_by_lifetime = enabled;
        self
    }

    pub fn background(mut self, color: Vec3) -> Self {
        self.background = color;
        self
    }

    /// Point diameter in pixels at view-space depth `view_z` (negative in
    /// front of the camera).
    pub fn point_size(&self, particle_size: f32, view_z: f32, lifecycle: &LifecycleCell) -> f32 {
        let size = particle_size * POINT_SCALE / -view_z;
        if self.scale_by_lifetime {
            size * lifecycle.remaining()
        } else {
            size
        }
    }
}

/// Opacity ramp of a newborn particle.
#[inline]
pub fn fade_in(age: f32) -> f32 {
    smoothstep(0.0, FADE_IN_SECONDS, age)
}

/// Radial falloff for a point coordinate in `[0, 1]^2`.
///
/// `None` outside the inscribed circle (the fragment is discarded).
#[inline]
pub fn radial_brightness(point_coord: Vec2) -> Option<f32> {
    let len = (point_coord - Vec2::splat(0.5)).length();
    if len > 0.5 {
        None
    } else {
        Some(remap(len, 0.0, 0.5, 1.0, 0.0))
    }
}

/// Fragment color, or `None` for a discarded fragment.
pub fn fragment_color(color: Vec3, age: f32, point_coord: Vec2) -> Option<Vec4> {
    radial_brightness(point_coord).map(|b| (color * b * fade_in(age)).extend(1.0))
}

/// Respawning cells and cells without valid depth are not drawn.
#[inline]
pub fn is_hidden(lifecycle: &LifecycleCell, flag: AuxFlag) -> bool {
    lifecycle.respawn || flag == AuxFlag::InvalidDepth
}

/// Clip-space position, pushed past the far plane when hidden.
///
/// Any `z > w` fails the clip test, whatever the sign of `w`.
pub fn clip_position(clip: Vec4, hidden: bool) -> Vec4 {
    if hidden {
        Vec4::new(clip.x, clip.y, clip.w.abs() * 2.0 + 1.0, clip.w)
    } else {
        clip
    }
}
