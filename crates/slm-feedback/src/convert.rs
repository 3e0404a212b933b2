//! Conversions between `image` buffers and [`FloatImage`].

use ::image::{GrayImage, ImageBuffer, Luma};
use slm_feedback_core::{FloatImage, GridShape};

fn shape_of<P: ::image::Pixel>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> GridShape {
    GridShape::new(img.height() as usize, img.width() as usize)
}

/// 8-bit camera frame → intensity in `[0, 1]`.
pub fn intensity_from_luma8(img: &GrayImage) -> FloatImage {
    let mut out = FloatImage::zeros(shape_of(img));
    for (dst, &src) in out.data.iter_mut().zip(img.as_raw()) {
        *dst = src as f32 / u8::MAX as f32;
    }
    out
}

/// 16-bit camera frame → intensity in `[0, 1]`.
pub fn intensity_from_luma16(img: &ImageBuffer<Luma<u16>, Vec<u16>>) -> FloatImage {
    let mut out = FloatImage::zeros(shape_of(img));
    for (dst, &src) in out.data.iter_mut().zip(img.as_raw()) {
        *dst = src as f32 / u16::MAX as f32;
    }
    out
}

/// 8-bit target drawing → amplitude (square root of the normalised intensity).
pub fn amplitude_from_luma8(img: &GrayImage) -> FloatImage {
    let mut out = intensity_from_luma8(img);
    out.sqrt_inplace();
    out
}

/// Peak-normalised 8-bit export; an all-zero image stays black.
pub fn to_luma8(img: &FloatImage) -> GrayImage {
    let peak = img.data.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let scale = if peak > 0.0 { 255.0 / peak } else { 0.0 };
    GrayImage::from_fn(img.width as u32, img.height as u32, |x, y| {
        let v = img.data[y as usize * img.width + x as usize].abs() * scale;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn luma8_scales_to_unit_range() {
        let img = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let f = intensity_from_luma8(&img);
        assert_eq!(f.shape(), GridShape::new(1, 2));
        assert_eq!(f.data, vec![0.0, 1.0]);
    }

    #[test]
    fn luma16_scales_to_unit_range() {
        let img = ImageBuffer::<Luma<u16>, _>::from_raw(1, 2, vec![u16::MAX, 0]).unwrap();
        let f = intensity_from_luma16(&img);
        assert_eq!(f.shape(), GridShape::new(2, 1));
        assert_eq!(f.data, vec![1.0, 0.0]);
    }

    #[test]
    fn amplitude_is_sqrt_of_intensity() {
        let img = GrayImage::from_raw(1, 1, vec![64]).unwrap();
        let a = amplitude_from_luma8(&img);
        assert_abs_diff_eq!(a.data[0], (64.0f32 / 255.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn export_is_peak_normalised() {
        let mut f = FloatImage::zeros(GridShape::new(2, 2));
        f.set(0, 1, 0.5);
        f.set(1, 0, -0.25);
        let img = to_luma8(&f);
        assert_eq!(img.get_pixel(1, 0).0, [255]);
        assert_eq!(img.get_pixel(0, 1).0, [128]);
        assert_eq!(img.get_pixel(0, 0).0, [0]);

        let black = to_luma8(&FloatImage::zeros(GridShape::new(1, 1)));
        assert_eq!(black.get_pixel(0, 0).0, [0]);
    }
}
