//! Device-side collaborators and the binding resolver.
//!
//! The feedback hologram talks to hardware only through the traits below.
//! Drivers own every I/O detail (settling delays, timeouts, buffering); this
//! crate only sequences calls.

use crate::{FeedbackError, FourierCalibration};
use slm_feedback_core::{FloatImage, FloatImageView, GridShape};

/// Error type produced by device drivers. Passed through untouched.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Spatial light modulator.
pub trait Slm {
    /// Pixel grid of the modulator, `(height, width)`.
    fn shape(&self) -> GridShape;
    /// Pixel pitch `[x, y]` in micrometres.
    fn pitch_um(&self) -> [f64; 2];
    /// Operating wavelength in micrometres.
    fn wavelength_um(&self) -> f64;
    /// Measured or modelled illumination amplitude across the modulator.
    fn source_amplitude(&self) -> FloatImage;
    /// Display a phase pattern (radians). With `settle`, block until the
    /// liquid crystal has settled.
    fn write(&mut self, phase: &FloatImageView<'_>, settle: bool) -> Result<(), DeviceError>;
}

/// Camera observing the far field of the modulator.
pub trait Camera {
    /// Sensor grid, `(height, width)`.
    fn shape(&self) -> GridShape;
    /// Drop any frames buffered before the call.
    fn flush(&mut self) -> Result<(), DeviceError>;
    /// Block until one intensity frame of shape [`Camera::shape`] is available.
    fn get_image(&mut self) -> Result<FloatImage, DeviceError>;
}

/// An SLM and a camera placed in its Fourier plane, with the affine
/// calibration between them.
pub trait CameraSlm {
    fn slm(&self) -> &dyn Slm;
    fn slm_mut(&mut self) -> &mut dyn Slm;
    fn camera(&self) -> &dyn Camera;
    fn camera_mut(&mut self) -> &mut dyn Camera;
    /// `None` until the Fourier calibration has been run.
    fn fourier_calibration(&self) -> Option<&FourierCalibration>;
}

/// Capability handover used by [`DeviceBinding::resolve`].
///
/// A driver implements whichever conversion matches what it is and returns
/// itself in `Err` for the other:
///
/// ```
/// use slm_feedback::{CameraSlm, Hardware, Slm};
/// # use slm_feedback_core::{FloatImage, FloatImageView, GridShape};
/// # use slm_feedback::DeviceError;
/// struct Lcos;
/// # impl Slm for Lcos {
/// #     fn shape(&self) -> GridShape { GridShape::new(8, 8) }
/// #     fn pitch_um(&self) -> [f64; 2] { [8.0, 8.0] }
/// #     fn wavelength_um(&self) -> f64 { 1.064 }
/// #     fn source_amplitude(&self) -> FloatImage { FloatImage::filled(self.shape(), 1.0) }
/// #     fn write(&mut self, _: &FloatImageView<'_>, _: bool) -> Result<(), DeviceError> { Ok(()) }
/// # }
///
/// impl Hardware for Lcos {
///     fn into_camera_slm(self: Box<Self>) -> Result<Box<dyn CameraSlm>, Box<dyn Hardware>> {
///         Err(self)
///     }
///     fn into_slm(self: Box<Self>) -> Result<Box<dyn Slm>, Box<dyn Hardware>> {
///         Ok(self)
///     }
/// }
/// ```
pub trait Hardware {
    fn into_camera_slm(self: Box<Self>) -> Result<Box<dyn CameraSlm>, Box<dyn Hardware>>;
    fn into_slm(self: Box<Self>) -> Result<Box<dyn Slm>, Box<dyn Hardware>>;
}

/// Illumination data handed to the optimizer at construction.
#[derive(Clone, Debug)]
pub struct SlmSource {
    pub amplitude: FloatImage,
    pub slm_shape: GridShape,
    pub pitch_um: [f64; 2],
    pub wavelength_um: f64,
}

impl SlmSource {
    fn from_slm(slm: &dyn Slm) -> Self {
        Self {
            amplitude: slm.source_amplitude(),
            slm_shape: slm.shape(),
            pitch_um: slm.pitch_um(),
            wavelength_um: slm.wavelength_um(),
        }
    }
}

/// What the feedback hologram is attached to.
pub enum DeviceBinding {
    /// SLM + camera + calibration: feedback capable.
    Composite(Box<dyn CameraSlm>),
    /// SLM alone: only the illumination is used, feedback is disabled.
    Bare(Box<dyn Slm>),
}

impl DeviceBinding {
    /// Inspect `hardware` once, preferring the composite interpretation.
    pub fn resolve(hardware: Box<dyn Hardware>) -> Result<Self, FeedbackError> {
        match hardware.into_camera_slm() {
            Ok(composite) => Ok(Self::Composite(composite)),
            Err(hardware) => match hardware.into_slm() {
                Ok(slm) => {
                    log::debug!("bare SLM bound; camera feedback disabled");
                    Ok(Self::Bare(slm))
                }
                Err(_) => Err(FeedbackError::Configuration),
            },
        }
    }

    pub fn composite(controller: impl CameraSlm + 'static) -> Self {
        Self::Composite(Box::new(controller))
    }

    pub fn bare(slm: impl Slm + 'static) -> Self {
        Self::Bare(Box::new(slm))
    }

    #[inline]
    pub fn is_feedback_capable(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    pub fn slm(&self) -> &dyn Slm {
        match self {
            Self::Composite(c) => c.slm(),
            Self::Bare(s) => s.as_ref(),
        }
    }

    pub fn source(&self) -> SlmSource {
        SlmSource::from_slm(self.slm())
    }

    pub fn controller(&self) -> Option<&dyn CameraSlm> {
        match self {
            Self::Composite(c) => Some(c.as_ref()),
            Self::Bare(_) => None,
        }
    }

    pub fn controller_mut(&mut self) -> Option<&mut dyn CameraSlm> {
        match self {
            Self::Composite(c) => Some(c.as_mut()),
            Self::Bare(_) => None,
        }
    }

    /// Calibration, if bound to a composite controller that has one.
    pub fn calibration(&self) -> Option<&FourierCalibration> {
        self.controller().and_then(|c| c.fourier_calibration())
    }
}

impl std::fmt::Debug for DeviceBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composite(c) => f
                .debug_struct("Composite")
                .field("slm_shape", &c.slm().shape())
                .field("camera_shape", &c.camera().shape())
                .field("calibrated", &c.fourier_calibration().is_some())
                .finish(),
            Self::Bare(s) => f.debug_struct("Bare").field("slm_shape", &s.shape()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubController, StubSlm, Unrelated};

    #[test]
    fn composite_hardware_resolves_first() {
        let hw: Box<dyn Hardware> = Box::new(StubController::uncalibrated());
        let binding = DeviceBinding::resolve(hw).expect("resolves");
        assert!(binding.is_feedback_capable());
        assert!(binding.calibration().is_none());
    }

    #[test]
    fn bare_slm_disables_feedback() {
        let hw: Box<dyn Hardware> = Box::new(StubSlm::new(GridShape::new(16, 16)));
        let binding = DeviceBinding::resolve(hw).expect("resolves");
        assert!(!binding.is_feedback_capable());
        assert!(binding.controller().is_none());
        assert_eq!(binding.source().slm_shape, GridShape::new(16, 16));
    }

    #[test]
    fn unrelated_hardware_is_a_configuration_error() {
        let hw: Box<dyn Hardware> = Box::new(Unrelated);
        assert!(matches!(
            DeviceBinding::resolve(hw),
            Err(FeedbackError::Configuration)
        ));
    }
}
