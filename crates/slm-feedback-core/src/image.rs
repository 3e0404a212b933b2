use serde::{Deserialize, Serialize};

/// Errors raised when wrapping raw buffers as images.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image buffer holds {got} samples, expected {expected} ({width}x{height})")]
    BufferLength {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },
}

/// Shape of a 2-D grid in `(height, width)` order, matching row-major storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub height: usize,
    pub width: usize,
}

impl GridShape {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FloatImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [f32], // row-major, len = w*h
}

impl FloatImageView<'_> {
    #[inline]
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.height, self.width)
    }
}

/// Owned row-major `f32` image.
///
/// Holds either intensities or amplitudes. [`FloatImage::sqrt_inplace`] and
/// [`FloatImage::squared`] move between the two domains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FloatImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn zeros(shape: GridShape) -> Self {
        Self {
            width: shape.width,
            height: shape.height,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn filled(shape: GridShape, value: f32) -> Self {
        Self {
            width: shape.width,
            height: shape.height,
            data: vec![value; shape.len()],
        }
    }

    /// Wrap a row-major buffer, validating its length.
    pub fn from_vec(shape: GridShape, data: Vec<f32>) -> Result<Self, ImageError> {
        if data.len() != shape.len() {
            return Err(ImageError::BufferLength {
                width: shape.width,
                height: shape.height,
                expected: shape.len(),
                got: data.len(),
            });
        }
        Ok(Self {
            width: shape.width,
            height: shape.height,
            data,
        })
    }

    /// Build an image by evaluating `f(row, col)` at every pixel.
    pub fn from_fn(shape: GridShape, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(shape.len());
        for r in 0..shape.height {
            for c in 0..shape.width {
                data.push(f(r, c));
            }
        }
        Self {
            width: shape.width,
            height: shape.height,
            data,
        }
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.height, self.width)
    }

    #[inline]
    pub fn view(&self) -> FloatImageView<'_> {
        FloatImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row < self.height && col < self.width {
            self.data[row * self.width + col] = value;
        }
    }

    pub fn abs_inplace(&mut self) {
        self.data.iter_mut().for_each(|v| *v = v.abs());
    }

    /// Intensity → amplitude. Negative samples (interpolation undershoot) clamp to zero.
    pub fn sqrt_inplace(&mut self) {
        self.data.iter_mut().for_each(|v| *v = v.max(0.0).sqrt());
    }

    /// Amplitude → intensity copy.
    pub fn squared(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| v * v).collect(),
        }
    }

    pub fn scale_inplace(&mut self, factor: f32) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// L2 norm, accumulated in `f64`.
    pub fn norm(&self) -> f64 {
        self.view().norm()
    }

    /// Sum of squared samples, accumulated in `f64`.
    pub fn power(&self) -> f64 {
        self.view().power()
    }

    /// Location `(row, col)` and value of the largest sample.
    pub fn argmax(&self) -> Option<(usize, usize, f32)> {
        let (idx, &v) = self
            .data
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        Some((idx / self.width, idx % self.width, v))
    }
}

impl FloatImageView<'_> {
    pub fn power(&self) -> f64 {
        self.data.iter().map(|&v| (v as f64) * (v as f64)).sum()
    }

    pub fn norm(&self) -> f64 {
        self.power().sqrt()
    }

    pub fn to_owned_image(&self) -> FloatImage {
        FloatImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

/// Interpolation kernel used when resampling an image at fractional coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Order 0.
    Nearest,
    /// Order 1.
    Linear,
    /// Order 3, Keys cubic convolution (a = -0.5).
    #[default]
    Cubic,
}

impl Interpolation {
    /// Map a spline-style interpolation order onto a kernel.
    pub fn from_order(order: u8) -> Option<Self> {
        match order {
            0 => Some(Self::Nearest),
            1 => Some(Self::Linear),
            3 => Some(Self::Cubic),
            _ => None,
        }
    }

    pub fn order(&self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
            Self::Cubic => 3,
        }
    }
}

#[inline]
fn get_value(src: &FloatImageView<'_>, x: i64, y: i64) -> f32 {
    if x < 0 || y < 0 || x >= src.width as i64 || y >= src.height as i64 {
        return 0.0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Nearest-neighbour sample; half-way coordinates round away from zero.
#[inline]
pub fn sample_nearest(src: &FloatImageView<'_>, x: f64, y: f64) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    get_value(src, x.round() as i64, y.round() as i64)
}

#[inline]
pub fn sample_bilinear(src: &FloatImageView<'_>, x: f64, y: f64) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let p00 = get_value(src, x0, y0);
    let p10 = get_value(src, x0 + 1, y0);
    let p01 = get_value(src, x0, y0 + 1);
    let p11 = get_value(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
fn keys_weights(t: f32) -> [f32; 4] {
    const A: f32 = -0.5;
    let w = |d: f32| -> f32 {
        let d = d.abs();
        if d <= 1.0 {
            ((A + 2.0) * d - (A + 3.0)) * d * d + 1.0
        } else if d < 2.0 {
            ((A * d - 5.0 * A) * d + 8.0 * A) * d - 4.0 * A
        } else {
            0.0
        }
    };
    [w(1.0 + t), w(t), w(1.0 - t), w(2.0 - t)]
}

/// Cubic convolution sample over the 4x4 neighbourhood; outside pixels read as zero.
#[inline]
pub fn sample_cubic(src: &FloatImageView<'_>, x: f64, y: f64) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let wx = keys_weights((x - x0 as f64) as f32);
    let wy = keys_weights((y - y0 as f64) as f32);

    let mut acc = 0.0f32;
    for (j, wyj) in wy.iter().enumerate() {
        let yy = y0 - 1 + j as i64;
        let mut row = 0.0f32;
        for (i, wxi) in wx.iter().enumerate() {
            row += wxi * get_value(src, x0 - 1 + i as i64, yy);
        }
        acc += wyj * row;
    }
    acc
}

/// Sample `src` at `(x, y)` = `(col, row)` with the given kernel.
#[inline]
pub fn sample(src: &FloatImageView<'_>, x: f64, y: f64, interpolation: Interpolation) -> f32 {
    match interpolation {
        Interpolation::Nearest => sample_nearest(src, x, y),
        Interpolation::Linear => sample_bilinear(src, x, y),
        Interpolation::Cubic => sample_cubic(src, x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp() -> FloatImage {
        FloatImage::from_fn(GridShape::new(6, 8), |r, c| (2 * r + c) as f32)
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = FloatImage::from_vec(GridShape::new(2, 3), vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ImageError::BufferLength {
                width: 3,
                height: 2,
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn samplers_agree_on_integer_coordinates() {
        let img = ramp();
        let view = img.view();
        for (x, y) in [(1.0, 1.0), (3.0, 2.0), (6.0, 4.0)] {
            let expected = img.get(y as usize, x as usize).unwrap();
            assert_abs_diff_eq!(sample_nearest(&view, x, y), expected);
            assert_abs_diff_eq!(sample_bilinear(&view, x, y), expected, epsilon = 1e-6);
            assert_abs_diff_eq!(sample_cubic(&view, x, y), expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn linear_and_cubic_reproduce_a_ramp_in_the_interior() {
        let img = ramp();
        let view = img.view();
        let (x, y) = (3.25, 2.5);
        let expected = (2.0 * y + x) as f32;
        assert_abs_diff_eq!(sample_bilinear(&view, x, y), expected, epsilon = 1e-5);
        assert_abs_diff_eq!(sample_cubic(&view, x, y), expected, epsilon = 1e-4);
    }

    #[test]
    fn out_of_bounds_reads_zero() {
        let img = FloatImage::filled(GridShape::new(4, 4), 1.0);
        let view = img.view();
        assert_eq!(sample_nearest(&view, -1.0, 0.0), 0.0);
        assert_eq!(sample_nearest(&view, 0.0, 4.0), 0.0);
        assert_eq!(sample_bilinear(&view, 10.0, 10.0), 0.0);
        assert_eq!(sample_cubic(&view, -5.0, 2.0), 0.0);
        assert_eq!(sample_nearest(&view, f64::NAN, 0.0), 0.0);
    }

    #[test]
    fn amplitude_intensity_helpers() {
        let mut img = FloatImage::from_vec(GridShape::new(1, 3), vec![4.0, -1.0, 9.0]).unwrap();
        let sq = img.squared();
        assert_eq!(sq.data, vec![16.0, 1.0, 81.0]);
        img.sqrt_inplace();
        assert_eq!(img.data, vec![2.0, 0.0, 3.0]);
        assert_abs_diff_eq!(img.power(), 13.0);
        assert_eq!(img.argmax(), Some((0, 2, 3.0)));
    }

    #[test]
    fn interpolation_orders() {
        assert_eq!(Interpolation::from_order(0), Some(Interpolation::Nearest));
        assert_eq!(Interpolation::from_order(3), Some(Interpolation::Cubic));
        assert_eq!(Interpolation::from_order(2), None);
        assert_eq!(Interpolation::Linear.order(), 1);
    }
}
