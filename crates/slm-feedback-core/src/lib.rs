//! Core image types and resampling utilities for camera-feedback holography.
//!
//! This crate is purely numeric. It knows nothing about SLMs, cameras or
//! optimizers; it provides the row-major `f32` image containers, sampling
//! kernels, 2-D affine maps and the Gaussian blur used to move images between
//! a camera sensor grid and a computational k-space grid.

mod affine;
mod blur;
mod image;
mod logger;

pub use affine::{warp_affine_into, Affine2};
pub use blur::{
    gaussian_blur, gaussian_blur_truncated, gaussian_kernel_1d, DEFAULT_TRUNCATE, MAX_KERNEL_RADIUS,
};
pub use image::{
    sample, sample_bilinear, sample_cubic, sample_nearest, FloatImage, FloatImageView, GridShape,
    ImageError, Interpolation,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
