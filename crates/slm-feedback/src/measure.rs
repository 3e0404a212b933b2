//! Two-level cache of the most recent camera measurement.
//!
//! The cache holds amplitudes (square roots of measured intensity) in the
//! camera basis and, on demand, in the computational basis. It never evicts on
//! its own: the optimizer loop calls [`MeasurementCache::invalidate`] when the
//! phase pattern changes.

use crate::FeedbackError;
use serde::{Deserialize, Serialize};
use slm_feedback_core::{FloatImage, FloatImageView};
use std::fmt;
use std::str::FromStr;

/// Coordinate basis of a cached measurement or target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Camera pixels (`"ij"`).
    #[serde(rename = "ij")]
    Camera,
    /// Computational grid pixels (`"knm"`).
    #[serde(rename = "knm")]
    Computational,
}

impl FromStr for Basis {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ij" => Ok(Self::Camera),
            "knm" => Ok(Self::Computational),
            other => Err(FeedbackError::UnsupportedBasis(other.to_owned())),
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "ij",
            Self::Computational => "knm",
        })
    }
}

/// Side effects the cache needs to fill itself.
pub trait MeasurementSource {
    /// Display the current pattern, flush stale frames and capture one
    /// intensity frame.
    fn capture(&mut self) -> Result<FloatImage, FeedbackError>;

    /// Move a camera-basis intensity image to the computational basis.
    fn to_computational(&mut self, intensity: &FloatImageView<'_>)
        -> Result<FloatImage, FeedbackError>;
}

/// Observable cache state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    CameraOnly,
    Both,
}

#[derive(Clone, Debug, Default)]
pub enum MeasurementCache {
    #[default]
    Empty,
    CameraOnly {
        camera: FloatImage,
    },
    Both {
        camera: FloatImage,
        computational: FloatImage,
    },
}

impl MeasurementCache {
    pub fn state(&self) -> CacheState {
        match self {
            Self::Empty => CacheState::Empty,
            Self::CameraOnly { .. } => CacheState::CameraOnly,
            Self::Both { .. } => CacheState::Both,
        }
    }

    /// Camera-basis amplitude, if measured.
    pub fn camera(&self) -> Option<&FloatImage> {
        match self {
            Self::Empty => None,
            Self::CameraOnly { camera } | Self::Both { camera, .. } => Some(camera),
        }
    }

    /// Computational-basis amplitude, if derived.
    pub fn computational(&self) -> Option<&FloatImage> {
        match self {
            Self::Both { computational, .. } => Some(computational),
            _ => None,
        }
    }

    pub fn contains(&self, basis: Basis) -> bool {
        match basis {
            Basis::Camera => self.camera().is_some(),
            Basis::Computational => self.computational().is_some(),
        }
    }

    /// Drop both entries; the next [`Self::ensure`] captures a fresh frame.
    pub fn invalidate(&mut self) {
        *self = Self::Empty;
    }

    /// Make sure the cache holds a measurement in `basis`.
    ///
    /// Captures only from [`CacheState::Empty`]. The computational entry is
    /// always derived from the cached camera amplitude (squared back to
    /// intensity, transformed, square-rooted), so both bases describe the same
    /// frame. If the transform fails, the captured frame stays cached.
    pub fn ensure(
        &mut self,
        basis: Basis,
        source: &mut dyn MeasurementSource,
    ) -> Result<(), FeedbackError> {
        if let Self::Empty = self {
            let mut camera = source.capture()?;
            camera.sqrt_inplace();
            log::debug!(
                "captured {}x{} frame for the {basis} basis",
                camera.width,
                camera.height
            );
            *self = Self::CameraOnly { camera };
        }

        if basis == Basis::Computational {
            if let Self::CameraOnly { camera } = self {
                let intensity = camera.squared();
                let mut computational = source.to_computational(&intensity.view())?;
                computational.sqrt_inplace();
                let camera = std::mem::take(camera);
                *self = Self::Both {
                    camera,
                    computational,
                };
            }
        }
        Ok(())
    }
}
