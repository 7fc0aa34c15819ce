use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;

use super::types::{Label, LabelMap, Rect};
use crate::error::{Result, SegmentError};

/// Validate a caller mask against a `width` x `height` image and decode it into labels.
///
/// Fails with `InvalidMask` if the mask is empty, has other dimensions, or holds a value
/// outside the four labels. The caller's buffer is never touched.
pub fn decode_mask(mask: &GrayImage, width: u32, height: u32) -> Result<LabelMap> {
    if mask.width() == 0 || mask.height() == 0 {
        return Err(SegmentError::InvalidMask("mask is empty".to_string()));
    }
    if mask.dimensions() != (width, height) {
        return Err(SegmentError::InvalidMask(format!(
            "mask is {}x{} but the image is {}x{}",
            mask.width(),
            mask.height(),
            width,
            height
        )));
    }

    let labels = mask
        .as_raw()
        .iter()
        .map(|&v| Label::try_from(v))
        .collect::<Result<Vec<Label>>>()?;

    Array2::from_shape_vec((height as usize, width as usize), labels)
        .map_err(|e| SegmentError::InvalidMask(e.to_string()))
}

/// Write `labels` into `out`, reallocating it if the dimensions differ.
pub fn encode_mask(labels: &LabelMap, out: &mut GrayImage) {
    let (rows, cols) = labels.dim();
    if out.dimensions() != (cols as u32, rows as u32) {
        *out = GrayImage::new(cols as u32, rows as u32);
    }
    for (dst, &label) in out.pixels_mut().zip(labels.iter()) {
        *dst = Luma([u8::from(label)]);
    }
}

/// Background everywhere, probable foreground inside `rect` (clipped to the image).
pub fn init_mask_with_rect(width: u32, height: u32, rect: Rect) -> LabelMap {
    let mut labels = Array2::from_elem((height as usize, width as usize), Label::Background);
    if let Some((x0, y0, x1, y1)) = rect.clip(width, height) {
        for y in y0 as usize..y1 as usize {
            for x in x0 as usize..x1 as usize {
                labels[[y, x]] = Label::ProbableForeground;
            }
        }
    }
    labels
}

/// Grayscale rendering of a label map for inspection.
///
/// Background is black, probable background dark gray, probable foreground light gray, foreground white.
pub fn mask_to_rgb(labels: &LabelMap) -> RgbImage {
    let (rows, cols) = labels.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = match labels[[y as usize, x as usize]] {
            Label::Background => 0,
            Label::ProbableBackground => 64,
            Label::ProbableForeground => 192,
            Label::Foreground => 255,
        };
        Rgb([value, value, value])
    })
}

/// Keep foreground-like pixels of `image` and black out the rest.
pub fn apply_mask(image: &RgbImage, labels: &LabelMap) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        match labels.get([y as usize, x as usize]) {
            Some(label) if label.is_foreground_like() => *image.get_pixel(x, y),
            _ => Rgb([0, 0, 0]),
        }
    })
}

/// Fail with `InvalidMask` unless `mask` has one label per pixel of `image`.
pub(crate) fn check_dimensions(image: &RgbImage, mask: &LabelMap) -> Result<()> {
    let (rows, cols) = mask.dim();
    if (cols as u32, rows as u32) != image.dimensions() {
        return Err(SegmentError::InvalidMask(format!(
            "mask is {}x{} but the image is {}x{}",
            cols,
            rows,
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_mask_marks_inside_as_probable_foreground() {
        let labels = init_mask_with_rect(4, 4, Rect::new(1, 1, 2, 2));
        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..3).contains(&x) && (1..3).contains(&y);
                let expected = if inside {
                    Label::ProbableForeground
                } else {
                    Label::Background
                };
                assert_eq!(labels[[y, x]], expected);
            }
        }
    }

    #[test]
    fn decode_rejects_bad_values_and_sizes() {
        let mut mask = GrayImage::from_pixel(3, 2, Luma([2]));
        assert!(decode_mask(&mask, 3, 2).is_ok());
        assert!(matches!(
            decode_mask(&mask, 2, 3),
            Err(SegmentError::InvalidMask(_))
        ));

        mask.put_pixel(1, 1, Luma([99]));
        let before = mask.clone();
        assert!(matches!(
            decode_mask(&mask, 3, 2),
            Err(SegmentError::InvalidMask(_))
        ));
        assert_eq!(mask, before);

        assert!(decode_mask(&GrayImage::new(0, 0), 0, 0).is_err());
    }

    #[test]
    fn encode_then_decode_keeps_labels() {
        let labels = init_mask_with_rect(5, 3, Rect::new(0, 0, 2, 3));
        let mut out = GrayImage::new(1, 1);
        encode_mask(&labels, &mut out);
        assert_eq!(out.dimensions(), (5, 3));
        assert_eq!(out.get_pixel(1, 2)[0], 3);
        assert_eq!(out.get_pixel(4, 0)[0], 0);
        assert_eq!(decode_mask(&out, 5, 3).unwrap(), labels);
    }

    #[test]
    fn visualization_and_cutout() {
        let mut labels = init_mask_with_rect(2, 1, Rect::new(1, 0, 1, 1));
        labels[[0, 0]] = Label::ProbableBackground;
        let vis = mask_to_rgb(&labels);
        assert_eq!(vis.get_pixel(0, 0), &Rgb([64, 64, 64]));
        assert_eq!(vis.get_pixel(1, 0), &Rgb([192, 192, 192]));

        let img = RgbImage::from_pixel(2, 1, Rgb([9, 8, 7]));
        let cut = apply_mask(&img, &labels);
        assert_eq!(cut.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(cut.get_pixel(1, 0), &Rgb([9, 8, 7]));
    }
}
