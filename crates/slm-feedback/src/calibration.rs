//! Fourier calibration and k-space unit conversions.
//!
//! Three coordinate systems meet here, all expressed as `(x, y)` vectors:
//! - `knm`: pixels of the computational grid (origin at the top-left corner),
//! - `kxy`: normalised k-space (origin on the optical axis),
//! - `ij`: camera pixels.

use crate::error::FeedbackIoError;
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use slm_feedback_core::{Affine2, GridShape};
use std::{fs, path::Path};

/// Affine Fourier calibration `ij = M · (kxy − a) + b`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FourierCalibration {
    /// Row-major 2x2 matrix from k-space to camera pixels.
    pub m: [[f64; 2]; 2],
    /// Camera pixel hit by the anchor wavevector.
    pub b: [f64; 2],
    /// Anchor wavevector, in `kxy` units.
    pub a: [f64; 2],
}

impl FourierCalibration {
    pub fn new(m: [[f64; 2]; 2], b: [f64; 2], a: [f64; 2]) -> Self {
        Self { m, b, a }
    }

    pub fn matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.m[0][0], self.m[0][1], self.m[1][0], self.m[1][1])
    }

    /// `kxy → ij` as a single affine map (`b − M·a` folded into the offset).
    pub fn kxy_to_ij(&self) -> Affine2 {
        let m = self.matrix();
        let offset = Vector2::new(self.b[0], self.b[1]) - m * Vector2::new(self.a[0], self.a[1]);
        Affine2::new(m, offset)
    }

    /// `ij → kxy`; `None` when `M` is singular.
    pub fn ij_to_kxy(&self) -> Option<Affine2> {
        self.kxy_to_ij().inverse()
    }

    /// Load a calibration from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FeedbackIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this calibration as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FeedbackIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// `knm → kxy` for a computational grid of `shape` on an SLM with the given optics.
///
/// One grid pixel spans `1 / (pitch / λ · N)` normalised k-space units along each
/// axis and the grid centre `(W/2, H/2)` sits on the optical axis.
pub fn knm_to_kxy(shape: GridShape, pitch_um: [f64; 2], wavelength_um: f64) -> Affine2 {
    let conv_x = pitch_um[0] / wavelength_um * shape.width as f64;
    let conv_y = pitch_um[1] / wavelength_um * shape.height as f64;
    let m = Matrix2::new(1.0 / conv_x, 0.0, 0.0, 1.0 / conv_y);
    let center = Vector2::new(shape.width as f64 / 2.0, shape.height as f64 / 2.0);
    Affine2::new(m, m * -center)
}

/// Camera frame corners `(x, y)` in the order lower-left, lower-right,
/// upper-right, upper-left, with the first corner repeated to close the polygon.
pub fn camera_corners_ij(camera: GridShape) -> [Point2<f64>; 5] {
    let w = camera.width.saturating_sub(1) as f64;
    let h = camera.height.saturating_sub(1) as f64;
    [
        Point2::new(0.0, 0.0),
        Point2::new(0.0, h),
        Point2::new(w, h),
        Point2::new(w, 0.0),
        Point2::new(0.0, 0.0),
    ]
}
