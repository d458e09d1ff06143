//! Camera calibration: pinhole intrinsics and recording metadata.
//!
//! Recordings carry their intrinsic matrix as a small JSON block appended to
//! the end of the file:
//!
//! ```text
//! ...video bytes...{"intrinsicMatrix":[fx,0,0,0,fy,0,cx,cy,1], ...}
//! ```
//!
//! [`extract_trailing_metadata`] pulls that block out of the raw bytes and
//! [`Intrinsics::from_matrix`] turns the nine elements into focal lengths and
//! principal point.
//!
//! # Example
//!
//! ```ignore
//! let bytes = std::fs::read("capture.mp4")?;
//! let meta = extract_trailing_metadata(&bytes)?;
//! let k = meta.intrinsics()?;
//! let p = k.unproject(320.0, 240.0, 2.0);
//! ```

use crate::error::CalibrationError;
use glam::{UVec2, Vec3, Vec4};
use serde::Deserialize;
use std::path::Path;

/// Element order of a flattened 3x3 intrinsic matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixLayout {
    /// `[fx, 0, cx, 0, fy, cy, 0, 0, 1]`
    RowMajor,
    /// `[fx, 0, 0, 0, fy, 0, cx, cy, 1]`, as written by Record3D.
    #[default]
    ColumnMajor,
}

impl MatrixLayout {
    /// Guess the layout from where the principal point sits.
    ///
    /// Returns `None` when the matrix is ambiguous, e.g. a principal point at
    /// the origin.
    pub fn detect(m: &[f32; 9]) -> Option<Self> {
        let row = m[2] != 0.0 || m[5] != 0.0;
        let col = m[6] != 0.0 || m[7] != 0.0;
        match (row, col) {
            (true, false) => Some(MatrixLayout::RowMajor),
            (false, true) => Some(MatrixLayout::ColumnMajor),
            _ => None,
        }
    }
}

/// Pinhole camera intrinsics in depth-half pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Read focal lengths and principal point from a flattened matrix.
    ///
    /// The layout is trusted. A matrix that looks like the other layout is
    /// logged as a warning and read as declared anyway.
    pub fn from_matrix(m: [f32; 9], layout: MatrixLayout) -> Self {
        if let Some(detected) = MatrixLayout::detect(&m) {
            if detected != layout {
                log::warn!(
                    "Intrinsic matrix looks {:?} but was declared {:?}; unprojection will be wrong",
                    detected,
                    layout
                );
            }
        }

        match layout {
            MatrixLayout::RowMajor => Self::new(m[0], m[4], m[2], m[5]),
            MatrixLayout::ColumnMajor => Self::new(m[0], m[4], m[6], m[7]),
        }
    }

    /// Flattened matrix in the given layout.
    pub fn to_matrix(&self, layout: MatrixLayout) -> [f32; 9] {
        let Self { fx, fy, cx, cy } = *self;
        match layout {
            MatrixLayout::RowMajor => [fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0],
            MatrixLayout::ColumnMajor => [fx, 0.0, 0.0, 0.0, fy, 0.0, cx, cy, 1.0],
        }
    }

    /// Inverse intrinsics packed as `(1/fx, 1/fy, -cx/fx, -cy/fy)`.
    ///
    /// With this packing, `x = (px * iK.x + iK.z) * d`, which is the form the
    /// compute shader uses.
    pub fn inverse(&self) -> Vec4 {
        Vec4::new(
            1.0 / self.fx,
            1.0 / self.fy,
            -self.cx / self.fx,
            -self.cy / self.fy,
        )
    }

    /// Camera-space point for pixel `(px, py)` at depth `d`.
    ///
    /// The camera looks down -Z.
    #[inline]
    pub fn unproject(&self, px: f32, py: f32, d: f32) -> Vec3 {
        Vec3::new(
            (px - self.cx) / self.fx * d,
            (py - self.cy) / self.fy * d,
            -d,
        )
    }

    /// Intrinsics for the same camera at a different image resolution.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.fx * sx, self.fy * sy, self.cx * sx, self.cy * sy)
    }
}

/// Calibration block appended to a recording.
#[derive(Clone, Debug, Deserialize)]
pub struct RecordMetadata {
    #[serde(rename = "intrinsicMatrix")]
    pub intrinsic_matrix: Vec<f32>,
    /// Width of the image the matrix was calibrated for.
    #[serde(default)]
    pub w: Option<u32>,
    /// Height of the image the matrix was calibrated for.
    #[serde(default)]
    pub h: Option<u32>,
}

impl RecordMetadata {
    /// Intrinsics from the column-major matrix Record3D writes.
    pub fn intrinsics(&self) -> Result<Intrinsics, CalibrationError> {
        self.intrinsics_with_layout(MatrixLayout::ColumnMajor)
    }

    pub fn intrinsics_with_layout(&self, layout: MatrixLayout) -> Result<Intrinsics, CalibrationError> {
        let m: [f32; 9] = self
            .intrinsic_matrix
            .as_slice()
            .try_into()
            .map_err(|_| CalibrationError::MatrixLength(self.intrinsic_matrix.len()))?;
        Ok(Intrinsics::from_matrix(m, layout))
    }

    /// Intrinsics in pixels of a depth half of size `half`.
    ///
    /// When the metadata records the calibration resolution and it differs
    /// from `half`, the matrix is rescaled to match.
    pub fn intrinsics_for(&self, half: UVec2) -> Result<Intrinsics, CalibrationError> {
        let intrinsics = self.intrinsics()?;
        match (self.w, self.h) {
            (Some(w), Some(h)) if w > 0 && h > 0 && UVec2::new(w, h) != half => {
                log::info!(
                    "Rescaling intrinsics from {}x{} to {}x{}",
                    w,
                    h,
                    half.x,
                    half.y
                );
                Ok(intrinsics.scaled(half.x as f32 / w as f32, half.y as f32 / h as f32))
            }
            _ => Ok(intrinsics),
        }
    }
}

const METADATA_MARKER: &[u8] = b"{\"intrinsic";

/// Parse a standalone metadata JSON document.
pub fn parse_metadata_json(text: &str) -> Result<RecordMetadata, CalibrationError> {
    Ok(serde_json::from_str(text)?)
}

/// Find and parse the metadata block at the tail of a recording.
///
/// The block starts at the last `{"intrinsic` marker and runs to the last
/// closing brace; anything after it is ignored.
pub fn extract_trailing_metadata(bytes: &[u8]) -> Result<RecordMetadata, CalibrationError> {
    let start = bytes
        .windows(METADATA_MARKER.len())
        .rposition(|w| w == METADATA_MARKER)
        .ok_or(CalibrationError::MetadataNotFound)?;
    let tail = &bytes[start..];
    let end = tail
        .iter()
        .rposition(|&b| b == b'}')
        .ok_or(CalibrationError::MetadataNotFound)?;

    Ok(serde_json::from_slice(&tail[..=end])?)
}

/// Load metadata from a `.json` file or from the tail of a recording.
pub fn load_metadata(path: impl AsRef<Path>) -> Result<RecordMetadata, CalibrationError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        extract_trailing_metadata(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k() -> Intrinsics {
        Intrinsics::new(100.0, 100.0, 320.0, 240.0)
    }

    #[test]
    fn test_unproject_principal_point() {
        let p = k().unproject(320.0, 240.0, 2.0);
        assert_eq!(p, Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_unproject_off_center() {
        let p = k().unproject(420.0, 140.0, 2.0);
        assert!((p - Vec3::new(2.0, -2.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_inverse_matches_unproject() {
        let k = Intrinsics::new(520.0, 515.0, 310.0, 250.0);
        let ik = k.inverse();
        let (px, py, d) = (17.0, 402.0, 1.3);
        let packed = Vec3::new((px * ik.x + ik.z) * d, (py * ik.y + ik.w) * d, -d);
        assert!((packed - k.unproject(px, py, d)).length() < 1e-4);
    }

    #[test]
    fn test_layouts_agree() {
        let k = k();
        let row = Intrinsics::from_matrix(k.to_matrix(MatrixLayout::RowMajor), MatrixLayout::RowMajor);
        let col = Intrinsics::from_matrix(k.to_matrix(MatrixLayout::ColumnMajor), MatrixLayout::ColumnMajor);
        assert_eq!(row, k);
        assert_eq!(col, k);
    }

    #[test]
    fn test_detect_layout() {
        let k = k();
        assert_eq!(MatrixLayout::detect(&k.to_matrix(MatrixLayout::RowMajor)), Some(MatrixLayout::RowMajor));
        assert_eq!(MatrixLayout::detect(&k.to_matrix(MatrixLayout::ColumnMajor)), Some(MatrixLayout::ColumnMajor));
        let centered = Intrinsics::new(1.0, 1.0, 0.0, 0.0);
        assert_eq!(MatrixLayout::detect(&centered.to_matrix(MatrixLayout::RowMajor)), None);
    }

    #[test]
    fn test_scaled() {
        let half = k().scaled(0.5, 0.5);
        assert_eq!(half, Intrinsics::new(50.0, 50.0, 160.0, 120.0));
    }

    #[test]
    fn test_intrinsics_follow_frame_resolution() {
        let meta = parse_metadata_json(r#"{"intrinsicMatrix":[100,0,0,0,100,0,320,240,1],"w":640,"h":480}"#).unwrap();
        assert_eq!(meta.intrinsics_for(UVec2::new(640, 480)).unwrap(), k());
        assert_eq!(
            meta.intrinsics_for(UVec2::new(320, 240)).unwrap(),
            Intrinsics::new(50.0, 50.0, 160.0, 120.0)
        );
    }

    #[test]
    fn test_intrinsics_without_resolution_are_unscaled() {
        let meta = parse_metadata_json(r#"{"intrinsicMatrix":[100,0,0,0,100,0,320,240,1]}"#).unwrap();
        assert_eq!(meta.intrinsics_for(UVec2::new(160, 120)).unwrap(), k());
    }

    #[test]
    fn test_extract_trailing_metadata() {
        let mut bytes = vec![0u8, 1, 2, 123, 34, 255, 7];
        bytes.extend_from_slice(br#"{"intrinsicMatrix":[100,0,0,0,100,0,320,240,1],"w":640,"h":480}"#);
        bytes.push(0);

        let meta = extract_trailing_metadata(&bytes).unwrap();
        assert_eq!(meta.w, Some(640));
        assert_eq!(meta.intrinsics().unwrap(), k());
    }

    #[test]
    fn test_extract_uses_last_marker() {
        let mut bytes = br#"{"intrinsicMatrix":[1,0,0,0,1,0,0,0,1]}"#.to_vec();
        bytes.extend_from_slice(b"garbage");
        bytes.extend_from_slice(br#"{"intrinsicMatrix":[100,0,0,0,100,0,320,240,1]}"#);

        let meta = extract_trailing_metadata(&bytes).unwrap();
        assert_eq!(meta.intrinsics().unwrap(), k());
    }

    #[test]
    fn test_missing_marker() {
        let err = extract_trailing_metadata(b"no metadata here").unwrap_err();
        assert!(matches!(err, CalibrationError::MetadataNotFound));
    }

    #[test]
    fn test_wrong_matrix_length() {
        let meta = parse_metadata_json(r#"{"intrinsicMatrix":[1,2,3]}"#).unwrap();
        assert!(matches!(meta.intrinsics(), Err(CalibrationError::MatrixLength(3))));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            parse_metadata_json("{\"intrinsicMatrix\":"),
            Err(CalibrationError::Json(_))
        ));
    }
}
