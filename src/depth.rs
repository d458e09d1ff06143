//! Hue-encoded depth decoding and unprojection.
//!
//! The depth half of a frame stores `hue = depth / depth_scale`. A texel is
//! turned into a camera-space point with the pinhole model, unless it is
//! rejected:
//!
//! - depth outside `[min_depth, max_depth]`
//! - texel within the filter radius of the frame edge
//! - any of the four neighbours at `±radius` differs by more than the
//!   filter threshold (depth discontinuity, usually an object silhouette)
//!
//! Rejections are not errors. The cell still claims its slot and carries a
//! discard flag until a later respawn lands on valid depth.

use crate::calibration::Intrinsics;
use crate::frame::RgbdFrame;
use crate::math::rgb_to_hue;
use glam::{UVec2, Vec3};

/// Default multiplier from hue to depth in meters.
pub const DEFAULT_DEPTH_SCALE: f32 = 3.0;

/// Depth for an encoded RGB sample.
#[inline]
pub fn decode_depth(rgb: Vec3, depth_scale: f32) -> f32 {
    depth_scale * rgb_to_hue(rgb)
}

/// Parameters of the depth decoder and its rejection filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthFilter {
    pub depth_scale: f32,
    pub min_depth: f32,
    pub max_depth: f32,
    /// Neighbour distance in depth-half pixels. Rounded up.
    pub radius: f32,
    pub threshold: f32,
}

impl DepthFilter {
    /// Whole-pixel neighbour offset.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.radius.max(0.0).ceil() as u32
    }
}

/// Why a texel did not produce a point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    FrameEdge,
    Discontinuity,
}

/// Result of unprojecting one texel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Unprojection {
    Point(Vec3),
    Rejected(Rejection),
}

impl Unprojection {
    pub fn point(&self) -> Option<Vec3> {
        match self {
            Unprojection::Point(p) => Some(*p),
            Unprojection::Rejected(_) => None,
        }
    }
}

/// Decoded depth at a depth-half texel.
#[inline]
pub fn depth_at(frame: &RgbdFrame, texel: UVec2, depth_scale: f32) -> f32 {
    decode_depth(frame.depth_rgb_at(texel.x, texel.y), depth_scale)
}

/// Unproject the texel at `texel` of the depth half.
pub fn unproject_texel(
    frame: &RgbdFrame,
    texel: UVec2,
    intrinsics: &Intrinsics,
    filter: &DepthFilter,
) -> Unprojection {
    let d = depth_at(frame, texel, filter.depth_scale);
    if d < filter.min_depth || d > filter.max_depth {
        return Unprojection::Rejected(Rejection::OutOfRange);
    }

    let r = filter.offset();
    if r > 0 {
        let half = frame.half_resolution();
        if texel.x < r || texel.y < r || texel.x + r >= half.x || texel.y + r >= half.y {
            return Unprojection::Rejected(Rejection::FrameEdge);
        }

        let neighbours = [
            UVec2::new(texel.x - r, texel.y),
            UVec2::new(texel.x + r, texel.y),
            UVec2::new(texel.x, texel.y - r),
            UVec2::new(texel.x, texel.y + r),
        ];
        let steep = neighbours
            .iter()
            .any(|&n| (depth_at(frame, n, filter.depth_scale) - d).abs() > filter.threshold);
        if steep {
            return Unprojection::Rejected(Rejection::Discontinuity);
        }
    }

    Unprojection::Point(intrinsics.unproject(texel.x as f32, texel.y as f32, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::hue_to_rgb;

    fn filter(radius: f32, threshold: f32) -> DepthFilter {
        DepthFilter {
            depth_scale: DEFAULT_DEPTH_SCALE,
            min_depth: 0.1,
            max_depth: 2.8,
            radius,
            threshold,
        }
    }

    #[test]
    fn test_hue_depth_round_trip() {
        for i in 1..28 {
            let depth = i as f32 * 0.1;
            let decoded = decode_depth(hue_to_rgb(depth / DEFAULT_DEPTH_SCALE), DEFAULT_DEPTH_SCALE);
            assert!((decoded - depth).abs() < 1e-4, "{depth} -> {decoded}");
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let frame = RgbdFrame::from_fn(8, 8, DEFAULT_DEPTH_SCALE, |_, _| (Vec3::ONE, 0.05));
        let k = Intrinsics::new(100.0, 100.0, 4.0, 4.0);
        let result = unproject_texel(&frame, UVec2::new(4, 4), &k, &filter(0.0, 3.0));
        assert_eq!(result, Unprojection::Rejected(Rejection::OutOfRange));
    }

    #[test]
    fn test_zero_radius_skips_filter() {
        let frame = RgbdFrame::from_fn(4, 4, DEFAULT_DEPTH_SCALE, |px, _| {
            (Vec3::ONE, if px < 2 { 1.0 } else { 2.0 })
        });
        let k = Intrinsics::new(100.0, 100.0, 0.0, 0.0);
        let result = unproject_texel(&frame, UVec2::new(0, 0), &k, &filter(0.0, 0.0));
        assert_eq!(result, Unprojection::Point(Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_discontinuity_filter() {
        let frame = RgbdFrame::from_fn(32, 8, DEFAULT_DEPTH_SCALE, |px, _| {
            (Vec3::ONE, if px < 16 { 1.0 } else { 2.0 })
        });
        let k = Intrinsics::new(100.0, 100.0, 16.0, 4.0);
        let f = filter(2.0, 0.5);

        for px in 14..=17 {
            assert_eq!(
                unproject_texel(&frame, UVec2::new(px, 4), &k, &f),
                Unprojection::Rejected(Rejection::Discontinuity),
                "px {px}"
            );
        }
        for px in [2, 8, 13, 18, 25, 29] {
            assert!(unproject_texel(&frame, UVec2::new(px, 4), &k, &f).point().is_some(), "px {px}");
        }
    }

    #[test]
    fn test_frame_edge_band() {
        let frame = RgbdFrame::from_fn(32, 8, DEFAULT_DEPTH_SCALE, |_, _| (Vec3::ONE, 1.0));
        let k = Intrinsics::new(100.0, 100.0, 16.0, 4.0);
        let f = filter(1.5, 0.5);

        for texel in [UVec2::new(1, 4), UVec2::new(30, 4), UVec2::new(8, 1), UVec2::new(8, 6)] {
            assert_eq!(
                unproject_texel(&frame, texel, &k, &f),
                Unprojection::Rejected(Rejection::FrameEdge),
                "{texel}"
            );
        }
        assert!(unproject_texel(&frame, UVec2::new(2, 2), &k, &f).point().is_some());
    }
}
