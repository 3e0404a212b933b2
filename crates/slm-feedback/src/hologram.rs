//! Seam to the iterative phase-retrieval optimizer.
//!
//! The optimizer owns the phase, the computational-basis target and the
//! weights. [`crate::FeedbackHologram`] reads and mutates them only through
//! [`Hologram`].

use crate::hardware::SlmSource;
use crate::stats::{compare_amplitudes, StatsOptions, StatsRecord};
use slm_feedback_core::{FloatImage, FloatImageView, GridShape};

/// Far-field amplitude used for a weight update.
#[derive(Clone, Copy, Debug)]
pub enum WeightSource<'a> {
    /// The optimizer's own simulated far field.
    Simulated,
    /// Measured amplitude on the computational grid.
    Measured(&'a FloatImage),
}

pub trait Hologram {
    /// Allocate buffers for `grid`, seeded from the SLM illumination if known.
    fn from_source(grid: GridShape, source: Option<SlmSource>) -> Self
    where
        Self: Sized;

    fn grid(&self) -> GridShape;
    /// Phase pattern to display, radians.
    fn phase(&self) -> &FloatImage;
    /// Target amplitude on the computational grid.
    fn target(&self) -> &FloatImage;
    fn target_mut(&mut self) -> &mut FloatImage;
    fn weights(&self) -> &FloatImage;
    /// Simulated far-field amplitude of the current phase.
    fn farfield_amplitude(&self) -> &FloatImage;

    /// Restart the weights from the current target.
    fn reset_weights(&mut self);
    fn update_weights(&mut self, source: WeightSource<'_>);

    fn calculate_stats(
        &self,
        feedback: &FloatImageView<'_>,
        target: &FloatImageView<'_>,
        options: StatsOptions,
    ) -> StatsRecord {
        compare_amplitudes(feedback, target, options)
    }
}

/// Default exponent of the multiplicative weight update.
pub const DEFAULT_FEEDBACK_EXPONENT: f32 = 0.9;

/// Plain buffer-backed [`Hologram`] with a weighted Gerchberg-Saxton style
/// weight update.
///
/// It does not propagate light itself; whoever runs the phase retrieval writes
/// the phase and the simulated far field through [`HologramBuffers::set_phase`]
/// and [`HologramBuffers::set_farfield`].
#[derive(Clone, Debug)]
pub struct HologramBuffers {
    grid: GridShape,
    phase: FloatImage,
    target: FloatImage,
    weights: FloatImage,
    farfield: FloatImage,
    source: Option<SlmSource>,
    pub feedback_exponent: f32,
}

impl HologramBuffers {
    pub fn source(&self) -> Option<&SlmSource> {
        self.source.as_ref()
    }

    pub fn set_phase(&mut self, phase: FloatImage) {
        self.phase = phase;
    }

    pub fn set_farfield(&mut self, farfield: FloatImage) {
        self.farfield = farfield;
    }

    /// Replace the target and restart the weights from it.
    pub fn set_target(&mut self, target: FloatImage) {
        self.target = target;
        self.reset_weights();
    }
}

impl Hologram for HologramBuffers {
    fn from_source(grid: GridShape, source: Option<SlmSource>) -> Self {
        Self {
            grid,
            phase: FloatImage::zeros(grid),
            target: FloatImage::zeros(grid),
            weights: FloatImage::zeros(grid),
            farfield: FloatImage::zeros(grid),
            source,
            feedback_exponent: DEFAULT_FEEDBACK_EXPONENT,
        }
    }

    fn grid(&self) -> GridShape {
        self.grid
    }

    fn phase(&self) -> &FloatImage {
        &self.phase
    }

    fn target(&self) -> &FloatImage {
        &self.target
    }

    fn target_mut(&mut self) -> &mut FloatImage {
        &mut self.target
    }

    fn weights(&self) -> &FloatImage {
        &self.weights
    }

    fn farfield_amplitude(&self) -> &FloatImage {
        &self.farfield
    }

    fn reset_weights(&mut self) {
        self.weights = self.target.clone();
    }

    fn update_weights(&mut self, source: WeightSource<'_>) {
        let feedback = match source {
            WeightSource::Simulated => &self.farfield,
            WeightSource::Measured(img) => img,
        };
        let t_norm = self.target.norm() as f32;
        let f_norm = feedback.norm() as f32;
        if t_norm == 0.0 || f_norm == 0.0 {
            log::warn!("skipping weight update: target or feedback carries no power");
            return;
        }

        let exponent = self.feedback_exponent;
        for ((w, &t), &f) in self
            .weights
            .data
            .iter_mut()
            .zip(&self.target.data)
            .zip(&feedback.data)
        {
            *w = if t == 0.0 {
                0.0
            } else if f == 0.0 {
                // No light where some is wanted: keep pushing.
                *w
            } else {
                *w * ((t / t_norm) / (f / f_norm)).powf(exponent)
            };
        }

        let w_norm = self.weights.norm() as f32;
        if w_norm > 0.0 {
            self.weights.scale_inplace(1.0 / w_norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_spot_target() -> FloatImage {
        let mut t = FloatImage::zeros(GridShape::new(1, 4));
        t.data[0] = 1.0;
        t.data[2] = 1.0;
        t
    }

    #[test]
    fn reset_copies_the_target() {
        let mut h = HologramBuffers::from_source(GridShape::new(1, 4), None);
        assert!(h.phase().data.iter().all(|v| *v == 0.0));
        h.set_target(two_spot_target());
        assert_eq!(h.weights(), h.target());
    }

    #[test]
    fn dim_spot_gains_weight() {
        let mut h = HologramBuffers::from_source(GridShape::new(1, 4), None);
        h.set_target(two_spot_target());
        let mut measured = FloatImage::zeros(GridShape::new(1, 4));
        measured.data[0] = 2.0;
        measured.data[1] = 0.5;
        measured.data[2] = 1.0;
        h.update_weights(WeightSource::Measured(&measured));

        let w = &h.weights().data;
        assert!(w[2] > w[0]);
        assert_eq!(w[1], 0.0);
        assert_eq!(w[3], 0.0);
        assert_abs_diff_eq!(h.weights().norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn simulated_update_uses_the_farfield() {
        let mut h = HologramBuffers::from_source(GridShape::new(1, 4), None);
        h.set_target(two_spot_target());
        h.set_farfield(two_spot_target());
        h.update_weights(WeightSource::Simulated);
        // A perfect far field leaves the (normalised) weights balanced.
        assert_abs_diff_eq!(h.weights().data[0], h.weights().data[2], epsilon = 1e-6);
    }

    #[test]
    fn default_stats_compare_amplitudes() {
        let h = HologramBuffers::from_source(GridShape::new(1, 4), None);
        let t = two_spot_target();
        let stats = h.calculate_stats(&t.view(), &t.view(), StatsOptions::default());
        assert_abs_diff_eq!(stats.uniformity, 1.0);
    }
}
