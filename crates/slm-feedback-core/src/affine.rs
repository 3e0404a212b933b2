use crate::{sample, FloatImage, FloatImageView, Interpolation};
use nalgebra::{Matrix2, Point2, Vector2};

/// Affine map `p' = m * p + b` on 2-vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2 {
    pub m: Matrix2<f64>,
    pub b: Vector2<f64>,
}

impl Affine2 {
    pub fn new(m: Matrix2<f64>, b: Vector2<f64>) -> Self {
        Self { m, b }
    }

    pub fn identity() -> Self {
        Self::new(Matrix2::identity(), Vector2::zeros())
    }

    pub fn from_arrays(m: [[f64; 2]; 2], b: [f64; 2]) -> Self {
        Self::new(
            Matrix2::new(m[0][0], m[0][1], m[1][0], m[1][1]),
            Vector2::new(b[0], b[1]),
        )
    }

    pub fn to_arrays(&self) -> ([[f64; 2]; 2], [f64; 2]) {
        (
            [
                [self.m[(0, 0)], self.m[(0, 1)]],
                [self.m[(1, 0)], self.m[(1, 1)]],
            ],
            [self.b[0], self.b[1]],
        )
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from(self.m * p.coords + self.b)
    }

    /// `self ∘ inner`: apply `inner` first, then `self`.
    pub fn compose(&self, inner: &Affine2) -> Affine2 {
        Affine2::new(self.m * inner.m, self.m * inner.b + self.b)
    }

    pub fn inverse(&self) -> Option<Self> {
        let m_inv = self.m.try_inverse()?;
        Some(Self::new(m_inv, -(m_inv * self.b)))
    }

    /// Re-express the map with both input and output components swapped.
    ///
    /// Converts an `(x, y)` map into the equivalent `(row, col)` map: for
    /// `self.apply((x, y)) = (u, v)` the result maps `(y, x)` to `(v, u)`.
    pub fn swap_axes(&self) -> Affine2 {
        let m = &self.m;
        Affine2::new(
            Matrix2::new(m[(1, 1)], m[(1, 0)], m[(0, 1)], m[(0, 0)]),
            Vector2::new(self.b[1], self.b[0]),
        )
    }
}

/// Resample `src` into `out`: for each output index `(row, col)`, read `src`
/// at `src_from_out.apply((row, col))` (also `(row, col)`) with `interpolation`.
///
/// Samples falling outside `src` are zero. `out` keeps its shape.
pub fn warp_affine_into(
    src: &FloatImageView<'_>,
    src_from_out: &Affine2,
    interpolation: Interpolation,
    out: &mut FloatImage,
) {
    let (out_w, out_h) = (out.width, out.height);
    let m = src_from_out.m;
    let b = src_from_out.b;

    for row in 0..out_h {
        // Row contribution is constant along the scanline.
        let base_r = m[(0, 0)] * row as f64 + b[0];
        let base_c = m[(1, 0)] * row as f64 + b[1];
        let dst = &mut out.data[row * out_w..(row + 1) * out_w];
        for (col, px) in dst.iter_mut().enumerate() {
            let sr = base_r + m[(0, 1)] * col as f64;
            let sc = base_c + m[(1, 1)] * col as f64;
            *px = sample(src, sc, sr, interpolation);
        }
    }
}
