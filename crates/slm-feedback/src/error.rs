use crate::hardware::DeviceError;
use slm_feedback_core::GridShape;

/// Errors returned by the feedback hologram.
#[derive(thiserror::Error, Debug)]
pub enum FeedbackError {
    #[error("expected a camera-equipped controller or a bare device")]
    Configuration,
    #[error("no Fourier calibration available; camera-basis transforms are disabled")]
    NotCalibrated,
    #[error(
        "no power in the transformed image; the source may lie outside the computational grid \
         (check the Fourier calibration)"
    )]
    OutOfRange,
    #[error("experimental feedback requires a camera-equipped controller")]
    FeedbackUnavailable,
    #[error("unsupported feedback mode `{0}` (expected `computational` or `experimental`)")]
    UnsupportedFeedback(String),
    #[error("unsupported interpolation order {0} (expected 0, 1 or 3)")]
    UnsupportedInterpolation(u8),
    #[error("unsupported basis `{0}`")]
    UnsupportedBasis(String),
    #[error("{0} is not supported yet")]
    NotSupported(&'static str),
    #[error("image shape {got:?} does not match expected {expected:?}")]
    ShapeMismatch { expected: GridShape, got: GridShape },
    #[error("no camera-basis target has been set")]
    MissingCameraTarget,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Errors raised while reading or writing JSON configs and reports.
#[derive(thiserror::Error, Debug)]
pub enum FeedbackIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
