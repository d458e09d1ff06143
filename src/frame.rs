//! Side-by-side RGBD frames and the sources that provide them.
//!
//! A frame is one RGBA image holding two halves of equal size:
//!
//! ```text
//! +-----------+-----------+
//! |   color   |   depth   |
//! |  (W/2, H) |  (W/2, H) |
//! +-----------+-----------+
//! ```
//!
//! The depth half stores depth as hue (see [`crate::depth`]). Both halves
//! share pixel coordinates, so texel `(x, y)` of the color half and texel
//! `(x, y)` of the depth half describe the same point.

use crate::calibration::{self, Intrinsics, RecordMetadata};
use crate::error::{CalibrationError, FrameError, SimulationError};
use crate::math::hue_to_rgb;
use glam::{UVec2, Vec2, Vec3};
use std::path::Path;

/// One side-by-side RGBD image, stored as tightly packed RGBA8.
#[derive(Clone, Debug)]
pub struct RgbdFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbdFrame {
    /// Wrap raw RGBA pixels of the full side-by-side image.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || width % 2 != 0 {
            return Err(FrameError::OddWidth(width));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || height == 0 {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn from_image(img: image::DynamicImage) -> Result<Self, FrameError> {
        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(rgba.into_raw(), width, height)
    }

    /// Load a side-by-side frame from a PNG or JPEG file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let img = image::load_from_memory(&bytes)?;
        let frame = Self::from_image(img)?;
        log::info!(
            "Loaded RGBD frame {} ({}x{})",
            path.display(),
            frame.width,
            frame.height
        );
        Ok(frame)
    }

    /// Synthesize a frame from a per-pixel `(color, depth)` function.
    ///
    /// `half_width` and `height` are the size of one half. Depth is written
    /// as a fully saturated hue of `depth / depth_scale`, so depths should
    /// stay below `depth_scale`.
    ///
    /// # Panics
    ///
    /// Panics if `half_width` or `height` is zero.
    pub fn from_fn<F>(half_width: u32, height: u32, depth_scale: f32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> (Vec3, f32),
    {
        assert!(
            half_width > 0 && height > 0,
            "RGBD frame must not be empty, got {}x{}",
            half_width,
            height
        );
        let width = half_width * 2;
        let mut data = vec![0u8; width as usize * height as usize * 4];

        for py in 0..height {
            for px in 0..half_width {
                let (color, depth) = f(px, py);
                let encoded = hue_to_rgb(depth / depth_scale);
                let row = py as usize * width as usize;
                let c = (row + px as usize) * 4;
                let d = (row + (px + half_width) as usize) * 4;
                data[c..c + 4].copy_from_slice(&to_rgba8(color));
                data[d..d + 4].copy_from_slice(&to_rgba8(encoded));
            }
        }

        Self { width, height, data }
    }

    /// Full side-by-side width.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of one half (color or depth).
    pub fn half_resolution(&self) -> UVec2 {
        UVec2::new(self.width / 2, self.height)
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    /// Color-half RGB at `(px, py)`, clamped to the half.
    pub fn color_at(&self, px: u32, py: u32) -> Vec3 {
        let half = self.half_resolution();
        self.rgb(px.min(half.x - 1), py.min(half.y - 1))
    }

    /// Raw depth-half RGB at `(px, py)`, clamped to the half.
    pub fn depth_rgb_at(&self, px: u32, py: u32) -> Vec3 {
        let half = self.half_resolution();
        self.rgb(px.min(half.x - 1) + half.x, py.min(half.y - 1))
    }

    /// Texel of either half covered by a grid UV in `[0, 1]`.
    pub fn texel_for_uv(&self, uv: Vec2) -> UVec2 {
        texel_for_uv(uv, self.half_resolution())
    }

    fn rgb(&self, x: u32, y: u32) -> Vec3 {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Vec3::new(
            self.data[i] as f32 / 255.0,
            self.data[i + 1] as f32 / 255.0,
            self.data[i + 2] as f32 / 255.0,
        )
    }
}

/// Texel covered by `uv` in an image of size `half`.
///
/// Mirrors the compute shader: `min(floor(uv * size), size - 1)`.
pub fn texel_for_uv(uv: Vec2, half: UVec2) -> UVec2 {
    let size = half.as_vec2();
    let t = (uv.clamp(Vec2::ZERO, Vec2::ONE) * size).floor().as_uvec2();
    t.min(half - UVec2::ONE)
}

fn to_rgba8(c: Vec3) -> [u8; 4] {
    let c = (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Provider of frames and calibration for the simulation.
///
/// Video demuxing lives outside this crate; anything that can hand over the
/// current side-by-side image and its intrinsics can drive the simulation.
pub trait FrameSource {
    /// Frame to sample this tick.
    fn frame(&self) -> &RgbdFrame;

    /// Intrinsics in depth-half pixels.
    fn intrinsics(&self) -> Intrinsics;

    /// Full side-by-side resolution of the underlying video.
    fn video_resolution(&self) -> UVec2 {
        let f = self.frame();
        UVec2::new(f.width(), f.height())
    }

    /// Move to the frame shown at `time`. Returns `true` when
    /// [`frame`](Self::frame) changed and must be uploaded again.
    fn advance(&mut self, _time: f32) -> bool {
        false
    }
}

/// A single still frame with fixed calibration.
#[derive(Clone, Debug)]
pub struct StillFrameSource {
    frame: RgbdFrame,
    intrinsics: Intrinsics,
    /// Replaced since the last `advance`.
    dirty: bool,
}

impl StillFrameSource {
    pub fn new(frame: RgbdFrame, intrinsics: Intrinsics) -> Self {
        Self {
            frame,
            intrinsics,
            dirty: false,
        }
    }

    /// Load a frame image plus calibration.
    ///
    /// `metadata` is either a `.json` file or a recording with the
    /// calibration block appended to its tail.
    pub fn open(image: impl AsRef<Path>, metadata: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let frame = RgbdFrame::open(image)?;
        let metadata = calibration::load_metadata(metadata)?;
        Ok(Self::from_metadata(frame, &metadata)?)
    }

    /// Pair a frame with recording metadata, rescaling the intrinsics to
    /// the frame's half resolution.
    pub fn from_metadata(frame: RgbdFrame, metadata: &RecordMetadata) -> Result<Self, CalibrationError> {
        let intrinsics = metadata.intrinsics_for(frame.half_resolution())?;
        log::info!(
            "Calibration fx={:.1} fy={:.1} cx={:.1} cy={:.1}",
            intrinsics.fx,
            intrinsics.fy,
            intrinsics.cx,
            intrinsics.cy
        );
        Ok(Self::new(frame, intrinsics))
    }

    pub fn set_frame(&mut self, frame: RgbdFrame) {
        self.frame = frame;
        self.dirty = true;
    }
}

impl FrameSource for StillFrameSource {
    fn frame(&self) -> &RgbdFrame {
        &self.frame
    }

    fn intrinsics(&self) -> Intrinsics {
        self.intrinsics
    }

    fn advance(&mut self, _time: f32) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_odd_width() {
        let err = RgbdFrame::from_rgba(vec![0; 3 * 2 * 4], 3, 2).unwrap_err();
        assert!(matches!(err, FrameError::OddWidth(3)));
    }

    #[test]
    fn test_from_rgba_rejects_size_mismatch() {
        let err = RgbdFrame::from_rgba(vec![0; 10], 4, 2).unwrap_err();
        assert!(matches!(err, FrameError::SizeMismatch { expected: 32, actual: 10 }));
    }

    #[test]
    fn test_halves_share_coordinates() {
        let frame = RgbdFrame::from_fn(4, 3, 3.0, |px, py| {
            (Vec3::new(px as f32 / 3.0, py as f32 / 2.0, 0.0), 1.0)
        });
        assert_eq!(frame.half_resolution(), UVec2::new(4, 3));
        assert_eq!(frame.width(), 8);

        let c = frame.color_at(3, 2);
        assert!((c - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
        // depth 1.0 at scale 3.0 is hue 1/3: pure green
        assert_eq!(frame.depth_rgb_at(0, 0), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_lookups_clamp() {
        let frame = RgbdFrame::from_fn(2, 2, 3.0, |px, _| (Vec3::splat(px as f32), 2.0));
        assert_eq!(frame.color_at(99, 99), Vec3::ONE);
        assert_eq!(frame.depth_rgb_at(99, 99), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_texel_for_uv_corners() {
        let half = UVec2::new(640, 480);
        assert_eq!(texel_for_uv(Vec2::ZERO, half), UVec2::ZERO);
        assert_eq!(texel_for_uv(Vec2::ONE, half), UVec2::new(639, 479));
        assert_eq!(texel_for_uv(Vec2::splat(0.5), half), UVec2::new(320, 240));
    }

    #[test]
    fn test_video_resolution_defaults_to_frame() {
        let frame = RgbdFrame::from_fn(5, 7, 3.0, |_, _| (Vec3::ZERO, 1.0));
        let source = StillFrameSource::new(frame, Intrinsics::new(1.0, 1.0, 0.0, 0.0));
        assert_eq!(source.video_resolution(), UVec2::new(10, 7));
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_from_fn_rejects_empty_frame() {
        RgbdFrame::from_fn(0, 4, 3.0, |_, _| (Vec3::ZERO, 1.0));
    }

    #[test]
    fn test_from_metadata_rescales_to_half_resolution() {
        // Calibrated at 640x480, frame saved at half that.
        let meta = calibration::parse_metadata_json(
            r#"{"intrinsicMatrix":[500,0,0,0,500,0,320,240,1],"w":640,"h":480}"#,
        )
        .unwrap();
        let frame = RgbdFrame::from_fn(320, 240, 3.0, |_, _| (Vec3::ONE, 1.0));
        let source = StillFrameSource::from_metadata(frame, &meta).unwrap();

        assert_eq!(source.intrinsics(), Intrinsics::new(250.0, 250.0, 160.0, 120.0));
        // The principal point still lands on the optical axis.
        let center = source.intrinsics().unproject(160.0, 120.0, 1.0);
        assert_eq!(center, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_set_frame_is_reported_once() {
        let frame = RgbdFrame::from_fn(2, 2, 3.0, |_, _| (Vec3::ZERO, 1.0));
        let mut source = StillFrameSource::new(frame.clone(), Intrinsics::new(1.0, 1.0, 0.0, 0.0));
        assert!(!source.advance(0.0));

        source.set_frame(frame);
        assert!(source.advance(0.1));
        assert!(!source.advance(0.2));
    }
}
