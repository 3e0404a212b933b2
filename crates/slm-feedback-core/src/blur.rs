//! Separable Gaussian blur.
//!
//! The kernel radius is `round(truncate * sigma)`, capped at the larger image
//! side when blurring, and borders are handled by half-sample reflection
//! (`d c b a | a b c d | d c b a`); the image sum is preserved.

use crate::{FloatImage, FloatImageView};

/// Default kernel truncation, in units of sigma.
pub const DEFAULT_TRUNCATE: f64 = 2.0;

/// Largest radius [`gaussian_kernel_1d`] will build.
pub const MAX_KERNEL_RADIUS: usize = 1 << 16;

/// Normalised 1-D Gaussian kernel of length `2 * radius + 1`.
///
/// The radius is capped at [`MAX_KERNEL_RADIUS`].
pub fn gaussian_kernel_1d(sigma: f64, truncate: f64) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    kernel_with_radius(sigma, kernel_radius(sigma, truncate, MAX_KERNEL_RADIUS))
}

fn kernel_radius(sigma: f64, truncate: f64, max_radius: usize) -> usize {
    let r = (truncate * sigma).round();
    if r.is_nan() || r <= 0.0 {
        0
    } else if r >= max_radius as f64 {
        max_radius
    } else {
        r as usize
    }
}

fn kernel_with_radius(sigma: f64, radius: usize) -> Vec<f32> {
    let denom = 2.0 * sigma * sigma;
    let r = radius as f64;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - r;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel.into_iter().map(|k| k as f32).collect()
}

#[inline]
fn reflect(mut i: i64, n: usize) -> usize {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    let period = 2 * n;
    i = i.rem_euclid(period);
    if i >= n {
        i = period - 1 - i;
    }
    i as usize
}

/// Blur with an isotropic Gaussian of standard deviation `sigma` pixels.
///
/// `sigma <= 0` returns an unmodified copy. Any radius past the larger image
/// side only folds back through the reflection, so it is capped there.
pub fn gaussian_blur(src: &FloatImageView<'_>, sigma: f64) -> FloatImage {
    gaussian_blur_truncated(src, sigma, DEFAULT_TRUNCATE)
}

pub fn gaussian_blur_truncated(
    src: &FloatImageView<'_>,
    sigma: f64,
    truncate: f64,
) -> FloatImage {
    if sigma.is_nan() || sigma <= 0.0 || src.data.is_empty() {
        return src.to_owned_image();
    }
    let (w, h) = (src.width, src.height);
    let radius = kernel_radius(sigma, truncate, w.max(h));
    let kernel = kernel_with_radius(sigma, radius);
    let radius = radius as i64;

    // Horizontal pass.
    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, kv) in kernel.iter().enumerate() {
                let xi = reflect(x as i64 + k as i64 - radius, w);
                acc += kv * row[xi];
            }
            tmp[y * w + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for (k, kv) in kernel.iter().enumerate() {
            let yi = reflect(y as i64 + k as i64 - radius, h);
            let src_row = &tmp[yi * w..(yi + 1) * w];
            let dst_row = &mut out[y * w..(y + 1) * w];
            for (d, s) in dst_row.iter_mut().zip(src_row) {
                *d += kv * s;
            }
        }
    }

    FloatImage {
        width: w,
        height: h,
        data: out,
    }
}
