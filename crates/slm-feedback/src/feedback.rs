//! Camera-in-the-loop hologram: targets and weights driven by measurements.

use crate::calibration::camera_corners_ij;
use crate::hardware::{CameraSlm, DeviceBinding, Hardware};
use crate::hologram::{Hologram, WeightSource};
use crate::measure::{Basis, MeasurementCache, MeasurementSource};
use crate::params::{FeedbackFlags, FeedbackMode, OffsetBasis};
use crate::stats::{
    StatsHistory, StatsOptions, StatsRecord, COMPUTATIONAL, EXPERIMENTAL, EXPERIMENTAL_IJ,
    EXPERIMENTAL_KNM,
};
use crate::transform::{CameraToGridTransform, TransformOptions};
use crate::FeedbackError;
use nalgebra::Point2;
use slm_feedback_core::{FloatImage, FloatImageView, GridShape, Interpolation};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Camera frame as seen from the computational grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraGeometry {
    /// Camera frame, `(height, width)`.
    pub shape: GridShape,
    /// Camera corners in `knm` `(x, y)`: lower-left, lower-right, upper-right,
    /// upper-left, lower-left again.
    pub points: [Point2<f64>; 5],
}

/// Feedback layer wrapped around an optimizer `H`.
///
/// Every operation that can touch the camera takes `&mut self`. The cached
/// measurement is never evicted automatically: call
/// [`FeedbackHologram::invalidate_measurement`] after the phase changes.
#[derive(Debug)]
pub struct FeedbackHologram<H: Hologram> {
    hologram: H,
    binding: Option<DeviceBinding>,
    flags: FeedbackFlags,
    target_ij: Option<FloatImage>,
    camera: Option<CameraGeometry>,
    cache: MeasurementCache,
    stats: StatsHistory,
}

impl<H: Hologram> FeedbackHologram<H> {
    /// Build the optimizer for `grid` and attach it to `binding`.
    ///
    /// With a calibrated controller, `target_ij` is moved to the grid and
    /// becomes the optimizer target (weights reset). Without calibration the
    /// camera-basis target is only stored.
    pub fn new(
        grid: GridShape,
        binding: Option<DeviceBinding>,
        target_ij: Option<FloatImage>,
        flags: FeedbackFlags,
    ) -> Result<Self, FeedbackError> {
        let source = binding.as_ref().map(DeviceBinding::source);
        let mut this = Self {
            hologram: H::from_source(grid, source),
            binding,
            flags,
            target_ij: None,
            camera: None,
            cache: MeasurementCache::default(),
            stats: StatsHistory::default(),
        };
        this.refresh_camera_geometry();

        if let Some(target) = target_ij {
            if this.is_calibrated() {
                this.update_target(target, true)?;
            } else {
                this.check_camera_shape(&target)?;
                this.target_ij = Some(target);
            }
        }

        log::info!(
            "feedback hologram {}x{}: feedback={}, capable={}, calibrated={}",
            grid.width,
            grid.height,
            this.flags.feedback,
            this.is_feedback_capable(),
            this.is_calibrated()
        );
        Ok(this)
    }

    /// Resolve `hardware` into a binding, then [`Self::new`].
    pub fn from_hardware(
        grid: GridShape,
        hardware: Box<dyn Hardware>,
        target_ij: Option<FloatImage>,
        flags: FeedbackFlags,
    ) -> Result<Self, FeedbackError> {
        let binding = DeviceBinding::resolve(hardware)?;
        Self::new(grid, Some(binding), target_ij, flags)
    }

    #[inline]
    pub fn hologram(&self) -> &H {
        &self.hologram
    }

    /// Mutable optimizer access. Changing the phase does not invalidate the
    /// cached measurement.
    #[inline]
    pub fn hologram_mut(&mut self) -> &mut H {
        &mut self.hologram
    }

    #[inline]
    pub fn binding(&self) -> Option<&DeviceBinding> {
        self.binding.as_ref()
    }

    #[inline]
    pub fn flags(&self) -> &FeedbackFlags {
        &self.flags
    }

    #[inline]
    pub fn flags_mut(&mut self) -> &mut FeedbackFlags {
        &mut self.flags
    }

    pub fn is_feedback_capable(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(DeviceBinding::is_feedback_capable)
    }

    pub fn is_calibrated(&self) -> bool {
        self.binding
            .as_ref()
            .and_then(DeviceBinding::calibration)
            .is_some()
    }

    pub fn camera_geometry(&self) -> Option<&CameraGeometry> {
        self.camera.as_ref()
    }

    /// Recompute [`CameraGeometry`] from the current calibration.
    pub fn refresh_camera_geometry(&mut self) -> Option<&CameraGeometry> {
        self.camera = self.compute_camera_geometry();
        self.camera.as_ref()
    }

    fn compute_camera_geometry(&self) -> Option<CameraGeometry> {
        let transform = self.grid_transform().ok()?;
        let shape = self.camera_shape()?;
        let Some(ij_to_knm) = transform.knm_to_ij().inverse() else {
            log::warn!("Fourier calibration is singular; camera geometry unavailable");
            return None;
        };
        Some(CameraGeometry {
            shape,
            points: camera_corners_ij(shape).map(|p| ij_to_knm.apply(p)),
        })
    }

    fn camera_shape(&self) -> Option<GridShape> {
        let controller = self.binding.as_ref()?.controller()?;
        Some(controller.camera().shape())
    }

    fn check_camera_shape(&self, image: &FloatImage) -> Result<(), FeedbackError> {
        match self.camera_shape() {
            Some(expected) if expected != image.shape() => Err(FeedbackError::ShapeMismatch {
                expected,
                got: image.shape(),
            }),
            _ => Ok(()),
        }
    }

    fn grid_transform(&self) -> Result<CameraToGridTransform, FeedbackError> {
        let binding = self.binding.as_ref().ok_or(FeedbackError::NotCalibrated)?;
        let calibration = binding.calibration().ok_or(FeedbackError::NotCalibrated)?;
        let slm = binding.slm();
        Ok(CameraToGridTransform::new(
            calibration,
            self.hologram.grid(),
            slm.pitch_um(),
            slm.wavelength_um(),
        ))
    }

    /// Camera-basis target, if one was given.
    pub fn target_ij(&self) -> Option<&FloatImage> {
        self.target_ij.as_ref()
    }

    pub fn cache(&self) -> &MeasurementCache {
        &self.cache
    }

    /// Forget the cached measurement; the next [`Self::measure`] captures.
    pub fn invalidate_measurement(&mut self) {
        self.cache.invalidate();
    }

    pub fn stats(&self) -> &StatsHistory {
        &self.stats
    }

    /// Move a camera image to the computational grid. See
    /// [`CameraToGridTransform::apply_into`] for the pipeline.
    pub fn transform_to_computational(
        &self,
        image: &FloatImageView<'_>,
        options: TransformOptions,
    ) -> Result<FloatImage, FeedbackError> {
        let sigma = options.blur_sigma.unwrap_or(self.flags.blur_sigma());
        self.grid_transform()?.apply(image, sigma, options.interpolation)
    }

    /// [`Self::transform_to_computational`] into a caller-owned buffer.
    pub fn transform_to_computational_into(
        &self,
        image: &FloatImageView<'_>,
        out: &mut FloatImage,
        options: TransformOptions,
    ) -> Result<(), FeedbackError> {
        let sigma = options.blur_sigma.unwrap_or(self.flags.blur_sigma());
        self.grid_transform()?.apply_into(image, out, sigma, options.interpolation)
    }

    /// Measured amplitude in `basis`, capturing only when nothing is cached.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn measure(&mut self, basis: Basis) -> Result<&FloatImage, FeedbackError> {
        {
            let Self {
                hologram,
                binding,
                flags,
                cache,
                ..
            } = self;
            let controller = binding
                .as_mut()
                .and_then(DeviceBinding::controller_mut)
                .ok_or(FeedbackError::FeedbackUnavailable)?;
            let mut live = LiveCapture {
                controller,
                phase: hologram.phase(),
                grid: hologram.grid(),
                flags,
            };
            cache.ensure(basis, &mut live)?;
        }

        let cached = match basis {
            Basis::Camera => self.cache.camera(),
            Basis::Computational => self.cache.computational(),
        };
        cached.ok_or(FeedbackError::FeedbackUnavailable)
    }

    /// Replace the camera-basis target and move it onto the optimizer target.
    ///
    /// Nearest-neighbour sampling keeps isolated spots intact; the `blur_ij`
    /// flag still applies. On any error, including
    /// [`FeedbackError::OutOfRange`], both targets are left as they were.
    pub fn update_target(
        &mut self,
        target_ij: FloatImage,
        reset_weights: bool,
    ) -> Result<(), FeedbackError> {
        self.check_camera_shape(&target_ij)?;
        let transform = self.grid_transform()?;
        let sigma = self.flags.blur_sigma();
        let resampled = transform.apply(&target_ij.view(), sigma, Interpolation::Nearest)?;
        *self.hologram.target_mut() = resampled;
        self.target_ij = Some(target_ij);
        if reset_weights {
            self.hologram.reset_weights();
        }
        Ok(())
    }

    /// One weight-feedback step, from the simulation or from the camera
    /// depending on [`FeedbackFlags::feedback`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn update_weights(&mut self) -> Result<(), FeedbackError> {
        match self.flags.feedback {
            FeedbackMode::Computational => {
                self.hologram.update_weights(WeightSource::Simulated);
            }
            FeedbackMode::Experimental => {
                self.measure(Basis::Computational)?;
                let measured = self
                    .cache
                    .computational()
                    .ok_or(FeedbackError::FeedbackUnavailable)?;
                self.hologram
                    .update_weights(WeightSource::Measured(measured));
            }
        }
        Ok(())
    }

    /// Sub-pixel spot offset refinement from a measured image.
    pub fn refine_offset(
        &self,
        _image: &FloatImageView<'_>,
        _basis: OffsetBasis,
    ) -> Result<Vec<Point2<f64>>, FeedbackError> {
        Err(FeedbackError::NotSupported("spot offset refinement"))
    }

    /// Compute statistics for each named group, append them to the history
    /// and return them keyed by the recorded group name.
    ///
    /// Unknown group names are skipped. `experimental` is recorded as
    /// `experimental_ij`.
    pub fn update_stats<I>(
        &mut self,
        groups: I,
    ) -> Result<BTreeMap<String, StatsRecord>, FeedbackError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let raw = self.flags.raw_stats;
        let compensated = StatsOptions {
            efficiency_compensation: true,
            raw,
        };
        let mut computed = BTreeMap::new();

        for group in groups {
            let (name, record) = match group.as_ref() {
                COMPUTATIONAL => {
                    let opts = StatsOptions {
                        efficiency_compensation: false,
                        raw,
                    };
                    let h = &self.hologram;
                    let record =
                        h.calculate_stats(&h.farfield_amplitude().view(), &h.target().view(), opts);
                    (COMPUTATIONAL, record)
                }
                EXPERIMENTAL_KNM => {
                    self.measure(Basis::Computational)?;
                    let measured = self
                        .cache
                        .computational()
                        .ok_or(FeedbackError::FeedbackUnavailable)?;
                    let record = self.hologram.calculate_stats(
                        &measured.view(),
                        &self.hologram.target().view(),
                        compensated,
                    );
                    (EXPERIMENTAL_KNM, record)
                }
                EXPERIMENTAL_IJ | EXPERIMENTAL => {
                    if self.target_ij.is_none() {
                        return Err(FeedbackError::MissingCameraTarget);
                    }
                    self.measure(Basis::Camera)?;
                    let (Some(measured), Some(target)) = (self.cache.camera(), &self.target_ij)
                    else {
                        return Err(FeedbackError::MissingCameraTarget);
                    };
                    if measured.shape() != target.shape() {
                        return Err(FeedbackError::ShapeMismatch {
                            expected: target.shape(),
                            got: measured.shape(),
                        });
                    }
                    let record = self
                        .hologram
                        .calculate_stats(&measured.view(), &target.view(), compensated);
                    (EXPERIMENTAL_IJ, record)
                }
                other => {
                    log::debug!("ignoring unknown stats group `{other}`");
                    continue;
                }
            };
            computed.insert(name.to_owned(), record);
        }

        for (name, record) in &computed {
            self.stats.append(name.as_str(), record.clone());
        }
        Ok(computed)
    }
}

/// Live measurement path: display the current phase, then capture.
struct LiveCapture<'a> {
    controller: &'a mut dyn CameraSlm,
    phase: &'a FloatImage,
    grid: GridShape,
    flags: &'a FeedbackFlags,
}

impl MeasurementSource for LiveCapture<'_> {
    fn capture(&mut self) -> Result<FloatImage, FeedbackError> {
        self.controller.slm_mut().write(&self.phase.view(), true)?;
        let camera = self.controller.camera_mut();
        camera.flush()?;
        Ok(camera.get_image()?)
    }

    fn to_computational(
        &mut self,
        intensity: &FloatImageView<'_>,
    ) -> Result<FloatImage, FeedbackError> {
        let calibration = self
            .controller
            .fourier_calibration()
            .ok_or(FeedbackError::NotCalibrated)?;
        let slm = self.controller.slm();
        CameraToGridTransform::new(calibration, self.grid, slm.pitch_um(), slm.wavelength_um())
            .apply(intensity, self.flags.blur_sigma(), self.flags.interpolation)
    }
}
