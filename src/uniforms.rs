//! Uniform blocks shared with the generated shaders.
//!
//! Both structs are laid out as whole `vec4`s so the Rust and WGSL sides
//! agree without manual padding. The WGSL declarations live next to the
//! Rust ones and are pasted into every generated shader.

use crate::params::TickParams;
use crate::visuals::PointStyle;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-tick values read by the four compute passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    /// `(1/fx, 1/fy, -cx/fx, -cy/fy)`
    pub ik: [f32; 4],
    /// `(depth_scale, min_depth, max_depth, filter_threshold)`
    pub depth: [f32; 4],
    /// `(delta_time, time, lifetime_min, lifetime_max)`
    pub timing: [f32; 4],
    /// `(strength, frequency, drag, 0)`
    pub noise: [f32; 4],
    pub noise_offsets: [[f32; 4]; 3],
    /// `(grid_size, half_width, half_height, filter_offset)`
    pub grid: [u32; 4],
}

pub const SIM_UNIFORMS_WGSL: &str = r#"
struct SimUniforms {
    ik: vec4<f32>,
    depth: vec4<f32>,
    timing: vec4<f32>,
    noise: vec4<f32>,
    noise_offsets: array<vec4<f32>, 3>,
    grid: vec4<u32>,
};
"#;

impl SimUniforms {
    pub fn from_params(params: &TickParams, grid_size: u32) -> Self {
        let filter = params.depth_filter();
        let noise = params.noise;
        let offset = |i: usize| noise.offsets[i].extend(0.0).to_array();

        Self {
            ik: params.intrinsics.inverse().to_array(),
            depth: [filter.depth_scale, filter.min_depth, filter.max_depth, filter.threshold],
            timing: [params.delta_time, params.time, params.lifetime[0], params.lifetime[1]],
            noise: [noise.strength, noise.frequency, noise.drag, 0.0],
            noise_offsets: [offset(0), offset(1), offset(2)],
            grid: [
                grid_size,
                params.half_resolution.x,
                params.half_resolution.y,
                filter.offset(),
            ],
        }
    }
}

/// Per-frame values read by the point renderer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// `(particle_size, viewport_width, viewport_height, scale_by_lifetime)`
    pub point: [f32; 4],
}

pub const RENDER_UNIFORMS_WGSL: &str = r#"
struct RenderUniforms {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    point: vec4<f32>,
};
"#;

impl RenderUniforms {
    pub fn new(view: Mat4, proj: Mat4, particle_size: f32, viewport: (u32, u32), style: &PointStyle) -> Self {
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            point: [
                particle_size,
                viewport.0.max(1) as f32,
                viewport.1.max(1) as f32,
                if style.scale_by_lifetime { 1.0 } else { 0.0 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Intrinsics;
    use glam::{UVec2, Vec3};

    #[test]
    fn test_sizes_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 128);
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 144);
    }

    #[test]
    fn test_sim_uniforms_packing() {
        let params = TickParams {
            delta_time: 0.5,
            time: 3.0,
            intrinsics: Intrinsics::new(100.0, 50.0, 320.0, 240.0),
            half_resolution: UVec2::new(640, 480),
            lifetime: [0.1, 2.0],
            ..TickParams::default()
        };
        let u = SimUniforms::from_params(&params, 128);

        assert_eq!(u.ik, [0.01, 0.02, -3.2, -4.8]);
        assert_eq!(u.depth, [3.0, 0.3, 2.8, 3.0]);
        assert_eq!(u.timing, [0.5, 3.0, 0.1, 2.0]);
        assert_eq!(u.grid, [128, 640, 480, 0]);
        assert_eq!(u.noise_offsets[1][0], params.noise.offsets[1].x);
    }

    #[test]
    fn test_render_uniforms() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 1.5, 0.01, 100.0);
        let u = RenderUniforms::new(view, proj, 0.02, (1200, 800), &PointStyle::default());
        assert_eq!(u.point, [0.02, 1200.0, 800.0, 0.0]);
        assert_eq!(u.view, view.to_cols_array_2d());
    }
}
