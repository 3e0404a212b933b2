//! Uniformity and efficiency statistics of a far-field amplitude against its target.

use serde::{Deserialize, Serialize};
use slm_feedback_core::FloatImageView;
use std::collections::BTreeMap;

/// Group name: simulated far field vs. the grid target.
pub const COMPUTATIONAL: &str = "computational";
/// Group name: measurement moved to the grid vs. the grid target.
pub const EXPERIMENTAL_KNM: &str = "experimental_knm";
/// Group name: raw camera measurement vs. the camera target.
pub const EXPERIMENTAL_IJ: &str = "experimental_ij";
/// Alias of [`EXPERIMENTAL_IJ`]; recorded under the canonical name.
pub const EXPERIMENTAL: &str = "experimental";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsOptions {
    /// Normalise feedback by the power inside the target support instead of
    /// the total power, so uniformity ignores light lost outside the target.
    pub efficiency_compensation: bool,
    /// Skip normalisation and report raw feedback powers.
    pub raw: bool,
}

/// One statistics sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Fraction of the feedback power that falls on the target support.
    pub efficiency: f64,
    pub uniformity: f64,
    pub pkpk_err: f64,
    pub std_err: f64,
    /// Feedback power at each target pixel, when `raw` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_pwr: Option<Vec<f64>>,
}

/// Compare `feedback` amplitude with `target` amplitude over the target support.
///
/// Both images are squared into powers. Pixels where the target is zero only
/// count towards the efficiency denominator. Without any support pixel every
/// metric is `NaN`.
pub fn compare_amplitudes(
    feedback: &FloatImageView<'_>,
    target: &FloatImageView<'_>,
    options: StatsOptions,
) -> StatsRecord {
    let mut total = 0.0f64;
    let mut fb_pwr = Vec::new();
    let mut tgt_pwr = Vec::new();
    for (&f, &t) in feedback.data.iter().zip(target.data) {
        let p = f as f64 * f as f64;
        total += p;
        if t != 0.0 {
            fb_pwr.push(p);
            tgt_pwr.push(t as f64 * t as f64);
        }
    }

    let masked: f64 = fb_pwr.iter().sum();
    let efficiency = masked / total;

    let raw_pwr = options.raw.then(|| fb_pwr.clone());
    if !options.raw {
        let fb_norm = if options.efficiency_compensation {
            masked
        } else {
            total
        };
        let tgt_norm: f64 = tgt_pwr.iter().sum();
        fb_pwr.iter_mut().for_each(|p| *p /= fb_norm);
        tgt_pwr.iter_mut().for_each(|p| *p /= tgt_norm);
    }

    let ratio: Vec<f64> = fb_pwr.iter().zip(&tgt_pwr).map(|(f, t)| f / t).collect();
    if ratio.is_empty() {
        return StatsRecord {
            efficiency,
            uniformity: f64::NAN,
            pkpk_err: f64::NAN,
            std_err: f64::NAN,
            raw_pwr,
        };
    }

    let n = ratio.len() as f64;
    let max = ratio.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = ratio.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = ratio.iter().sum::<f64>() / n;
    let var = ratio.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

    StatsRecord {
        efficiency,
        uniformity: 1.0 - (max - min) / (max + min),
        pkpk_err: (max - min) / mean,
        std_err: var.sqrt() / mean,
        raw_pwr,
    }
}

/// Append-only statistics log keyed by group name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsHistory {
    groups: BTreeMap<String, Vec<StatsRecord>>,
}

impl StatsHistory {
    pub fn append(&mut self, group: impl Into<String>, record: StatsRecord) {
        self.groups.entry(group.into()).or_default().push(record);
    }

    pub fn get(&self, group: &str) -> Option<&[StatsRecord]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn latest(&self, group: &str) -> Option<&StatsRecord> {
        self.groups.get(group)?.last()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
