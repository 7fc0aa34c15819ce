use image::{Rgb, RgbImage};

/// A pixel color as three `f64` channels in 0..=255.
pub type Color = [f64; 3];

pub fn to_color(pixel: &Rgb<u8>) -> Color {
    [
        f64::from(pixel[0]),
        f64::from(pixel[1]),
        f64::from(pixel[2]),
    ]
}

/// Color of the pixel at row-major index `idx`.
#[inline]
pub fn color_at(image: &RgbImage, idx: usize) -> Color {
    let raw = image.as_raw();
    let base = idx * 3;
    [
        f64::from(raw[base]),
        f64::from(raw[base + 1]),
        f64::from(raw[base + 2]),
    ]
}

#[inline]
pub fn squared_distance(a: &Color, b: &Color) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}
