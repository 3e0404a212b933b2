//! Feedback flags and small parsed enums.

use crate::FeedbackError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slm_feedback_core::Interpolation;
use std::fmt;
use std::str::FromStr;

/// Where weight feedback comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FeedbackMode {
    /// Simulated far field of the optimizer.
    #[default]
    Computational,
    /// Camera measurement moved to the computational grid.
    Experimental,
}

impl FeedbackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Computational => "computational",
            Self::Experimental => "experimental",
        }
    }
}

impl FromStr for FeedbackMode {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "computational" => Ok(Self::Computational),
            "experimental" => Ok(Self::Experimental),
            other => Err(FeedbackError::UnsupportedFeedback(other.to_owned())),
        }
    }
}

impl fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FeedbackMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FeedbackMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Flags controlling the feedback loop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackFlags {
    pub feedback: FeedbackMode,
    /// Gaussian blur sigma (camera pixels) applied before every camera → grid
    /// transform. `None` disables blurring.
    pub blur_ij: Option<f64>,
    /// Skip normalisation in statistics and attach raw feedback powers.
    pub raw_stats: bool,
    /// Kernel used when moving measurements to the grid.
    pub interpolation: Interpolation,
}

impl FeedbackFlags {
    pub fn experimental() -> Self {
        Self {
            feedback: FeedbackMode::Experimental,
            ..Self::default()
        }
    }

    /// Blur sigma as the transform consumes it (`0.0` means none).
    #[inline]
    pub fn blur_sigma(&self) -> f64 {
        self.blur_ij.unwrap_or(0.0)
    }
}

/// Resolve a spline-style interpolation order (0, 1 or 3).
pub fn interpolation_from_order(order: u8) -> Result<Interpolation, FeedbackError> {
    Interpolation::from_order(order).ok_or(FeedbackError::UnsupportedInterpolation(order))
}

/// Basis in which a spot-offset refinement image is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetBasis {
    Ij,
    Kxy,
    Knm,
}

impl FromStr for OffsetBasis {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ij" => Ok(Self::Ij),
            "kxy" => Ok(Self::Kxy),
            "knm" => Ok(Self::Knm),
            other => Err(FeedbackError::UnsupportedBasis(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_feedback_mode_is_rejected() {
        assert!(matches!(
            "adaptive".parse::<FeedbackMode>(),
            Err(FeedbackError::UnsupportedFeedback(name)) if name == "adaptive"
        ));
        let err = serde_json::from_str::<FeedbackFlags>(r#"{"feedback":"adaptive"}"#)
            .expect_err("unknown mode");
        assert!(err.to_string().contains("adaptive"));
    }

    #[test]
    fn flags_fill_defaults() {
        let flags: FeedbackFlags = serde_json::from_str(r#"{"feedback":"experimental"}"#).unwrap();
        assert_eq!(flags.feedback, FeedbackMode::Experimental);
        assert_eq!(flags.blur_ij, None);
        assert!(!flags.raw_stats);
        assert_eq!(flags.interpolation, Interpolation::Cubic);
        assert_eq!(flags.blur_sigma(), 0.0);
    }

    #[test]
    fn flags_serialize_mode_by_name() {
        let json = serde_json::to_value(FeedbackFlags::experimental()).unwrap();
        assert_eq!(json["feedback"], "experimental");
        assert_eq!(json["interpolation"], "cubic");
    }

    #[test]
    fn interpolation_orders() {
        assert_eq!(interpolation_from_order(0).unwrap(), Interpolation::Nearest);
        assert_eq!(interpolation_from_order(3).unwrap(), Interpolation::Cubic);
        assert!(matches!(
            interpolation_from_order(2),
            Err(FeedbackError::UnsupportedInterpolation(2))
        ));
    }

    #[test]
    fn offset_basis_names() {
        assert_eq!("kxy".parse::<OffsetBasis>().unwrap(), OffsetBasis::Kxy);
        assert!("xyz".parse::<OffsetBasis>().is_err());
    }
}
