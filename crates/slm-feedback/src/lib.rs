//! Closed-loop camera feedback for SLM holography.
//!
//! The crate sits between an iterative phase-retrieval optimizer and the
//! hardware. It provides:
//! - the coordinate transform from camera pixels (`ij`) to the computational
//!   k-space grid (`knm`), driven by an affine Fourier calibration,
//! - a lazily filled measurement cache (one capture per phase pattern),
//! - target and weight updates fed by either the simulation or the camera,
//! - uniformity/efficiency statistics with an append-only history.
//!
//! ## Quickstart
//!
//! ```
//! use slm_feedback::{FeedbackFlags, FeedbackHologram, HologramBuffers};
//! use slm_feedback_core::GridShape;
//!
//! # fn main() -> Result<(), slm_feedback::FeedbackError> {
//! // Without devices only computational feedback is available.
//! let mut fh: FeedbackHologram<HologramBuffers> =
//!     FeedbackHologram::new(GridShape::new(64, 64), None, None, FeedbackFlags::default())?;
//! fh.update_weights()?;
//! let stats = fh.update_stats(["computational"])?;
//! assert!(stats.contains_key("computational"));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`DeviceBinding`] and the [`Slm`] / [`Camera`] / [`CameraSlm`] /
//!   [`Hardware`] traits: what the hologram is attached to.
//! - [`FourierCalibration`], [`CameraToGridTransform`]: `ij ↔ knm` geometry.
//! - [`MeasurementCache`]: camera and computational-basis amplitudes.
//! - [`FeedbackHologram`]: the controller the optimizer calls each iteration.
//! - [`Hologram`], [`HologramBuffers`]: the optimizer seam.
//! - `convert` (feature `image`): `image` buffer conversions.

mod calibration;
mod error;
mod feedback;
mod hardware;
mod hologram;
mod io;
mod measure;
mod params;
mod stats;
mod transform;

#[cfg(feature = "image")]
pub mod convert;

#[cfg(test)]
mod test_utils;

pub use calibration::{camera_corners_ij, knm_to_kxy, FourierCalibration};
pub use error::{FeedbackError, FeedbackIoError};
pub use feedback::{CameraGeometry, FeedbackHologram};
pub use hardware::{Camera, CameraSlm, DeviceBinding, DeviceError, Hardware, Slm, SlmSource};
pub use hologram::{Hologram, HologramBuffers, WeightSource, DEFAULT_FEEDBACK_EXPONENT};
pub use io::{FeedbackConfig, StatsReport};
pub use measure::{Basis, CacheState, MeasurementCache, MeasurementSource};
pub use params::{interpolation_from_order, FeedbackFlags, FeedbackMode, OffsetBasis};
pub use stats::{
    compare_amplitudes, StatsHistory, StatsOptions, StatsRecord, COMPUTATIONAL, EXPERIMENTAL,
    EXPERIMENTAL_IJ, EXPERIMENTAL_KNM,
};
pub use transform::{CameraToGridTransform, TransformOptions};

pub use slm_feedback_core::{FloatImage, FloatImageView, GridShape, Interpolation};
