//! Camera for 3D orbit view.

use glam::{Mat4, Vec3};

/// Orbit camera looking at the point cloud.
///
/// Starts one meter in front of the capture origin, looking down -Z, which
/// matches the recording camera: the first frame looks like the video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl Camera {
    pub const NEAR: f32 = 0.01;
    pub const FAR: f32 = 100.0;

    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
            target: Vec3::ZERO,
            fov_y: 45f32.to_radians(),
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, Self::NEAR, Self::FAR)
    }

    /// Rotate by a mouse drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Move toward or away from the target by scroll lines.
    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance - lines * 0.1).clamp(0.1, 20.0);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_front_of_origin() {
        let cam = Camera::new();
        assert!((cam.position() - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);

        // the origin is one meter ahead
        let p = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut cam = Camera::new();
        cam.orbit(0.0, 10_000.0);
        assert_eq!(cam.pitch, 1.5);
        cam.orbit(100.0, 0.0);
        assert!((cam.yaw + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_clamps_distance() {
        let mut cam = Camera::new();
        cam.zoom(100.0);
        assert_eq!(cam.distance, 0.1);
        cam.zoom(-1000.0);
        assert_eq!(cam.distance, 20.0);
    }
}
