use image::RgbImage;

use super::{ColorGmm, COMPONENTS};
use crate::cluster::Clusterer;
use crate::color::{color_at, Color};
use crate::error::{Result, SegmentError};
use crate::segmentation::mask::check_dimensions;
use crate::segmentation::types::{Class, LabelMap};

/// Seed both class models from `mask`.
///
/// Pixels are split by class, each class is clustered into [`COMPONENTS`] groups,
/// and the cluster index becomes the initial component of each sample.
/// Fails with `InvalidMask` when `mask` does not match the image size.
pub fn init_gmms<C: Clusterer>(
    image: &RgbImage,
    mask: &LabelMap,
    clusterer: &mut C,
    background: &mut ColorGmm,
    foreground: &mut ColorGmm,
) -> Result<()> {
    let _span = tracing::debug_span!("init_gmms").entered();
    check_dimensions(image, mask)?;

    let mut bgd_samples: Vec<Color> = Vec::new();
    let mut fgd_samples: Vec<Color> = Vec::new();
    for (idx, label) in mask.iter().enumerate() {
        let color = color_at(image, idx);
        if label.is_background_like() {
            bgd_samples.push(color);
        } else {
            fgd_samples.push(color);
        }
    }

    if bgd_samples.is_empty() {
        return Err(SegmentError::DegenerateInitialization {
            class: Class::Background,
        });
    }
    if fgd_samples.is_empty() {
        return Err(SegmentError::DegenerateInitialization {
            class: Class::Foreground,
        });
    }

    tracing::debug!(
        "seeding models from {} background / {} foreground samples",
        bgd_samples.len(),
        fgd_samples.len()
    );

    for (gmm, samples) in [(background, &bgd_samples), (foreground, &fgd_samples)] {
        let labels = clusterer.cluster(samples, COMPONENTS);
        let mut learner = gmm.begin_learning();
        for (color, &ci) in samples.iter().zip(&labels) {
            learner.add_sample(ci, color);
        }
        gmm.end_learning(&learner);
    }

    Ok(())
}
