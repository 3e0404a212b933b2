//! In-memory devices for unit tests.

use crate::hardware::{Camera, CameraSlm, DeviceError, Hardware, Slm};
use crate::FourierCalibration;
use slm_feedback_core::{FloatImage, FloatImageView, GridShape};
use std::cell::Cell;
use std::rc::Rc;

pub(crate) struct StubSlm {
    pub shape: GridShape,
    pub pitch_um: [f64; 2],
    pub wavelength_um: f64,
    pub writes: Rc<Cell<usize>>,
}

impl StubSlm {
    /// Optics where one grid pixel of an equally sized grid is one kxy unit.
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            pitch_um: [1.0, 1.0],
            wavelength_um: shape.width as f64,
            writes: Rc::default(),
        }
    }
}

impl Slm for StubSlm {
    fn shape(&self) -> GridShape {
        self.shape
    }

    fn pitch_um(&self) -> [f64; 2] {
        self.pitch_um
    }

    fn wavelength_um(&self) -> f64 {
        self.wavelength_um
    }

    fn source_amplitude(&self) -> FloatImage {
        FloatImage::filled(self.shape, 1.0)
    }

    fn write(&mut self, _phase: &FloatImageView<'_>, _settle: bool) -> Result<(), DeviceError> {
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl Hardware for StubSlm {
    fn into_camera_slm(self: Box<Self>) -> Result<Box<dyn CameraSlm>, Box<dyn Hardware>> {
        Err(self)
    }

    fn into_slm(self: Box<Self>) -> Result<Box<dyn Slm>, Box<dyn Hardware>> {
        Ok(self)
    }
}

pub(crate) struct StubCamera {
    pub frame: FloatImage,
    pub captures: Rc<Cell<usize>>,
}

impl Camera for StubCamera {
    fn shape(&self) -> GridShape {
        self.frame.shape()
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn get_image(&mut self) -> Result<FloatImage, DeviceError> {
        self.captures.set(self.captures.get() + 1);
        Ok(self.frame.clone())
    }
}

pub(crate) struct StubController {
    pub slm: StubSlm,
    pub camera: StubCamera,
    pub calibration: Option<FourierCalibration>,
}

impl StubController {
    pub fn uncalibrated() -> Self {
        Self {
            slm: StubSlm::new(GridShape::new(16, 16)),
            camera: StubCamera {
                frame: FloatImage::zeros(GridShape::new(8, 8)),
                captures: Rc::default(),
            },
            calibration: None,
        }
    }

    /// Identity calibration centred on the camera frame.
    pub fn calibrated(slm: GridShape, frame: FloatImage) -> Self {
        let b = [frame.width as f64 / 2.0, frame.height as f64 / 2.0];
        Self {
            slm: StubSlm::new(slm),
            camera: StubCamera {
                frame,
                captures: Rc::default(),
            },
            calibration: Some(FourierCalibration::new([[1.0, 0.0], [0.0, 1.0]], b, [0.0, 0.0])),
        }
    }

    pub fn captures(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.camera.captures)
    }
}

impl CameraSlm for StubController {
    fn slm(&self) -> &dyn Slm {
        &self.slm
    }

    fn slm_mut(&mut self) -> &mut dyn Slm {
        &mut self.slm
    }

    fn camera(&self) -> &dyn Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut dyn Camera {
        &mut self.camera
    }

    fn fourier_calibration(&self) -> Option<&FourierCalibration> {
        self.calibration.as_ref()
    }
}

impl Hardware for StubController {
    fn into_camera_slm(self: Box<Self>) -> Result<Box<dyn CameraSlm>, Box<dyn Hardware>> {
        Ok(self)
    }

    fn into_slm(self: Box<Self>) -> Result<Box<dyn Slm>, Box<dyn Hardware>> {
        Err(self)
    }
}

/// Neither an SLM nor a controller.
pub(crate) struct Unrelated;

impl Hardware for Unrelated {
    fn into_camera_slm(self: Box<Self>) -> Result<Box<dyn CameraSlm>, Box<dyn Hardware>> {
        Err(self)
    }

    fn into_slm(self: Box<Self>) -> Result<Box<dyn Slm>, Box<dyn Hardware>> {
        Err(self)
    }
}
