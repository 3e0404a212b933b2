//! JSON configuration and statistics report helpers.

use crate::error::FeedbackIoError;
use crate::hardware::DeviceBinding;
use crate::hologram::Hologram;
use crate::{FeedbackError, FeedbackFlags, FeedbackHologram, FourierCalibration, StatsHistory};
use serde::{Deserialize, Serialize};
use slm_feedback_core::{FloatImage, GridShape};
use std::{fs, path::Path};

/// Feedback setup as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub grid: GridShape,
    #[serde(default)]
    pub flags: FeedbackFlags,
    /// Calibration recorded with the setup, for drivers that load it into
    /// their controller.
    #[serde(default)]
    pub calibration: Option<FourierCalibration>,
}

impl FeedbackConfig {
    pub fn new(grid: GridShape) -> Self {
        Self {
            grid,
            flags: FeedbackFlags::default(),
            calibration: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FeedbackIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FeedbackIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build a feedback hologram on `binding` with this grid and flags.
    pub fn build<H: Hologram>(
        &self,
        binding: Option<DeviceBinding>,
        target_ij: Option<FloatImage>,
    ) -> Result<FeedbackHologram<H>, FeedbackError> {
        FeedbackHologram::new(self.grid, binding, target_ij, self.flags.clone())
    }
}

/// Statistics history of a run, with the settings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub grid: GridShape,
    pub flags: FeedbackFlags,
    pub history: StatsHistory,
}

impl StatsReport {
    pub fn from_hologram<H: Hologram>(hologram: &FeedbackHologram<H>) -> Self {
        Self {
            grid: hologram.hologram().grid(),
            flags: hologram.flags().clone(),
            history: hologram.stats().clone(),
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FeedbackIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FeedbackIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
