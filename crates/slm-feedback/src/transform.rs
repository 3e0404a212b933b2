//! Camera (`ij`) → computational grid (`knm`) resampling.

use crate::calibration::{knm_to_kxy, FourierCalibration};
use crate::FeedbackError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use slm_feedback_core::{
    gaussian_blur, warp_affine_into, Affine2, FloatImage, FloatImageView, GridShape, Interpolation,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-call knobs of [`CameraToGridTransform::apply_into`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Gaussian blur sigma in camera pixels. `None` defers to the hologram's
    /// `blur_ij` flag; `Some(0.0)` disables blurring.
    #[serde(default)]
    pub blur_sigma: Option<f64>,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl TransformOptions {
    pub fn with_interpolation(interpolation: Interpolation) -> Self {
        Self {
            blur_sigma: None,
            interpolation,
        }
    }

    pub fn with_blur(mut self, sigma: f64) -> Self {
        self.blur_sigma = Some(sigma);
        self
    }
}

/// Composite `knm → ij` map, expressed on `(row, col)` indices so that each
/// output grid index reads the camera image at the mapped location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraToGridTransform {
    grid: GridShape,
    knm_to_ij: Affine2,
    src_from_out: Affine2,
}

impl CameraToGridTransform {
    /// Compose `knm → kxy` (grid shape and SLM optics) with `kxy → ij`
    /// (calibration).
    pub fn new(
        calibration: &FourierCalibration,
        grid: GridShape,
        pitch_um: [f64; 2],
        wavelength_um: f64,
    ) -> Self {
        let knm_to_ij = calibration
            .kxy_to_ij()
            .compose(&knm_to_kxy(grid, pitch_um, wavelength_um));
        Self {
            grid,
            knm_to_ij,
            src_from_out: knm_to_ij.swap_axes(),
        }
    }

    #[inline]
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// The `(x, y)` form of the map: grid pixel → camera pixel.
    #[inline]
    pub fn knm_to_ij(&self) -> &Affine2 {
        &self.knm_to_ij
    }

    /// The `(row, col)` form actually used for resampling.
    #[inline]
    pub fn src_from_out(&self) -> &Affine2 {
        &self.src_from_out
    }

    /// Camera pixel `(x, y)` → grid pixel `(x, y)`; `None` for a singular calibration.
    pub fn ij_to_knm(&self, ij: Point2<f64>) -> Option<Point2<f64>> {
        Some(self.knm_to_ij.inverse()?.apply(ij))
    }

    /// Resample `image` onto the grid; see [`Self::apply_into`].
    pub fn apply(
        &self,
        image: &FloatImageView<'_>,
        blur_sigma: f64,
        interpolation: Interpolation,
    ) -> Result<FloatImage, FeedbackError> {
        let mut out = FloatImage::zeros(self.grid);
        self.apply_into(image, &mut out, blur_sigma, interpolation)?;
        Ok(out)
    }

    /// Resample `image` onto the grid, writing into `out`.
    ///
    /// The input is blurred (if `blur_sigma > 0`), taken in magnitude,
    /// resampled with out-of-bounds samples reading zero, taken in magnitude
    /// again and normalised to unit L2 norm. `out` is reallocated only if its
    /// shape differs from the grid.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, image, out),
            fields(
                src_w = image.width,
                src_h = image.height,
                grid_w = self.grid.width,
                grid_h = self.grid.height
            )
        )
    )]
    pub fn apply_into(
        &self,
        image: &FloatImageView<'_>,
        out: &mut FloatImage,
        blur_sigma: f64,
        interpolation: Interpolation,
    ) -> Result<(), FeedbackError> {
        if out.shape() != self.grid {
            *out = FloatImage::zeros(self.grid);
        }

        let mut src = if blur_sigma > 0.0 {
            gaussian_blur(image, blur_sigma)
        } else {
            image.to_owned_image()
        };
        src.abs_inplace();

        warp_affine_into(&src.view(), &self.src_from_out, interpolation, out);
        out.abs_inplace();

        let norm = out.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(FeedbackError::OutOfRange);
        }
        out.scale_inplace((1.0 / norm) as f32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Optics where one grid pixel is exactly one kxy unit on a 256 grid.
    const UNIT_PITCH: [f64; 2] = [1.0, 1.0];
    const UNIT_WAV: f64 = 256.0;

    fn identity_cal(b: [f64; 2]) -> FourierCalibration {
        FourierCalibration::new([[1.0, 0.0], [0.0, 1.0]], b, [0.0, 0.0])
    }

    #[test]
    fn grid_centre_maps_to_calibration_offset() {
        let t = CameraToGridTransform::new(
            &identity_cal([64.0, 64.0]),
            GridShape::new(256, 256),
            UNIT_PITCH,
            UNIT_WAV,
        );
        let p = t.knm_to_ij().apply(Point2::new(128.0, 128.0));
        assert_abs_diff_eq!(p.x, 64.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 64.0, epsilon = 1e-9);

        let back = t.ij_to_knm(Point2::new(64.0, 64.0)).expect("invertible");
        assert_abs_diff_eq!(back.x, 128.0, epsilon = 1e-9);
    }

    #[test]
    fn axis_swap_follows_an_anisotropic_calibration() {
        // Camera x grows with grid x only; camera y with grid y only, scaled.
        let cal = FourierCalibration::new([[2.0, 0.0], [0.0, 0.5]], [10.0, 20.0], [0.0, 0.0]);
        let grid = GridShape::new(64, 32);
        let t = CameraToGridTransform::new(&cal, grid, [1.0, 1.0], 32.0);

        // Camera frame with a bright row at y = 20 (the optical axis).
        let mut cam = FloatImage::zeros(GridShape::new(40, 40));
        for x in 0..40 {
            cam.set(20, x, 1.0);
        }
        let out = t.apply(&cam.view(), 0.0, Interpolation::Nearest).expect("power");
        // The bright row must land on grid rows near the centre row, not columns.
        let (r, _, _) = out.argmax().expect("non-empty");
        assert!((r as i64 - 32).abs() <= 2, "peak row {r}");
    }

    #[test]
    fn output_has_unit_power() {
        let t = CameraToGridTransform::new(
            &identity_cal([32.0, 32.0]),
            GridShape::new(64, 64),
            [1.0, 1.0],
            64.0,
        );
        let cam = FloatImage::from_fn(GridShape::new(64, 64), |r, c| {
            ((r as f32 * 0.3).sin() * (c as f32 * 0.2).cos()).abs() + 0.1
        });
        for interp in [
            Interpolation::Nearest,
            Interpolation::Linear,
            Interpolation::Cubic,
        ] {
            let out = t.apply(&cam.view(), 0.0, interp).expect("power");
            assert_abs_diff_eq!(out.power(), 1.0, epsilon = 1e-5);
            assert!(out.data.iter().all(|v| *v >= 0.0));
        }
        let blurred = t.apply(&cam.view(), 1.5, Interpolation::Cubic).expect("power");
        assert_abs_diff_eq!(blurred.power(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn signed_input_is_taken_in_magnitude() {
        let t = CameraToGridTransform::new(
            &identity_cal([8.0, 8.0]),
            GridShape::new(16, 16),
            [1.0, 1.0],
            16.0,
        );
        let pos = FloatImage::filled(GridShape::new(16, 16), 2.0);
        let neg = FloatImage::filled(GridShape::new(16, 16), -2.0);
        let a = t.apply(&pos.view(), 0.0, Interpolation::Linear).unwrap();
        let b = t.apply(&neg.view(), 0.0, Interpolation::Linear).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn disjoint_calibration_is_out_of_range() {
        let t = CameraToGridTransform::new(
            &identity_cal([10_000.0, 10_000.0]),
            GridShape::new(32, 32),
            [1.0, 1.0],
            32.0,
        );
        let cam = FloatImage::filled(GridShape::new(32, 32), 1.0);
        assert!(matches!(
            t.apply(&cam.view(), 0.0, Interpolation::Cubic),
            Err(FeedbackError::OutOfRange)
        ));
    }

    #[test]
    fn output_buffer_is_reshaped_and_reused() {
        let t = CameraToGridTransform::new(
            &identity_cal([4.0, 4.0]),
            GridShape::new(8, 8),
            [1.0, 1.0],
            8.0,
        );
        let cam = FloatImage::filled(GridShape::new(8, 8), 1.0);
        let mut out = FloatImage::zeros(GridShape::new(2, 3));
        t.apply_into(&cam.view(), &mut out, 0.0, Interpolation::Nearest)
            .unwrap();
        assert_eq!(out.shape(), GridShape::new(8, 8));
        let ptr = out.data.as_ptr();
        t.apply_into(&cam.view(), &mut out, 0.0, Interpolation::Nearest)
            .unwrap();
        assert_eq!(out.data.as_ptr(), ptr);
    }
}
