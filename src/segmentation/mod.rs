pub mod mask;
mod session;
pub mod types;

pub use mask::{apply_mask, decode_mask, encode_mask, init_mask_with_rect, mask_to_rgb};
pub use session::{estimate_segmentation, GrabCut};
pub use types::{Class, InitMode, Label, LabelMap, Rect, SessionState};

use image::{DynamicImage, GrayImage, RgbImage};

use crate::config::GrabCutConfig;
use crate::error::{Result, SegmentError};
use crate::gmm::ColorGmm;

/// Segment `image` with the default configuration.
///
/// See [`grab_cut_with_config`].
pub fn grab_cut(
    image: &DynamicImage,
    mask: &mut GrayImage,
    rect: Rect,
    bgd_model: &mut Vec<f64>,
    fgd_model: &mut Vec<f64>,
    iter_count: i32,
    mode: InitMode,
) -> Result<()> {
    grab_cut_with_config(
        &GrabCutConfig::default(),
        image,
        mask,
        rect,
        bgd_model,
        fgd_model,
        iter_count,
        mode,
    )
}

/// Refine `mask` for `image` over `iter_count` iterations.
///
/// # Arguments
/// * `mask` - In/out label mask (0 = bg, 1 = fg, 2 = probable bg, 3 = probable fg).
///   Overwritten from `rect` in [`InitMode::WithRect`], read and validated otherwise
/// * `rect` - Initial region, only used by [`InitMode::WithRect`]
/// * `bgd_model`, `fgd_model` - In/out serialized models. Empty means "none yet"
/// * `mode` - Where the initial mask and models come from
///
/// Image, iteration count, model buffers and (outside rect mode) the mask are validated before
/// anything is written. After that, the mask and models are written back after seeding and after
/// every iteration, so a later failure leaves the committed iterations in place.
#[allow(clippy::too_many_arguments)]
pub fn grab_cut_with_config(
    config: &GrabCutConfig,
    image: &DynamicImage,
    mask: &mut GrayImage,
    rect: Rect,
    bgd_model: &mut Vec<f64>,
    fgd_model: &mut Vec<f64>,
    iter_count: i32,
    mode: InitMode,
) -> Result<()> {
    let _span = tracing::debug_span!("grab_cut", ?mode, iter_count).entered();

    config.validate()?;
    let image = validate_image(image)?;
    if iter_count <= 0 {
        tracing::warn!("rejecting iteration count {}", iter_count);
        return Err(SegmentError::InvalidIterationCount(iter_count));
    }
    let background = ColorGmm::from_params(bgd_model)?;
    let foreground = ColorGmm::from_params(fgd_model)?;

    let (width, height) = image.dimensions();
    let mut session = GrabCut::new(config.clone());
    let mut labels = match mode {
        InitMode::WithRect => {
            let labels = init_mask_with_rect(width, height, rect);
            encode_mask(&labels, mask);
            session.initialize(image, &labels).map_err(log_rejection)?;
            labels
        }
        InitMode::WithMask => {
            let labels = decode_mask(mask, width, height).map_err(log_rejection)?;
            session.initialize(image, &labels).map_err(log_rejection)?;
            labels
        }
        InitMode::Eval => {
            let labels = decode_mask(mask, width, height).map_err(log_rejection)?;
            session.resume(background, foreground);
            labels
        }
    };
    write_models(session.background(), session.foreground(), bgd_model, fgd_model);

    tracing::info!(
        "segmenting {}x{} image, {} iterations",
        width,
        height,
        iter_count
    );
    session.run_with(image, &mut labels, iter_count, |session, labels| {
        encode_mask(labels, mask);
        write_models(session.background(), session.foreground(), bgd_model, fgd_model);
    })?;

    let foreground_pixels = labels.iter().filter(|l| l.is_foreground_like()).count();
    tracing::info!(
        "segmentation done: {} of {} pixels foreground",
        foreground_pixels,
        labels.len()
    );
    Ok(())
}

/// Accept only non-empty 8-bit, 3-channel images.
pub fn validate_image(image: &DynamicImage) -> Result<&RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        tracing::warn!("rejecting empty image");
        return Err(SegmentError::InvalidImage("image is empty".to_string()));
    }
    image.as_rgb8().ok_or_else(|| {
        tracing::warn!("rejecting {:?} image", image.color());
        SegmentError::InvalidImage(format!(
            "expected 8-bit RGB, got {:?}",
            image.color()
        ))
    })
}

fn write_models(
    background: &ColorGmm,
    foreground: &ColorGmm,
    bgd_model: &mut Vec<f64>,
    fgd_model: &mut Vec<f64>,
) {
    *bgd_model = background.to_params();
    *fgd_model = foreground.to_params();
}

fn log_rejection(err: SegmentError) -> SegmentError {
    tracing::warn!("{}", err);
    err
}
