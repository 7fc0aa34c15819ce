use image::RgbImage;
use rayon::prelude::*;

use super::FlowNetwork;
use crate::color::color_at;
use crate::error::{Result, SegmentError};
use crate::gmm::ColorGmm;
use crate::segmentation::mask::check_dimensions;
use crate::segmentation::types::{Label, LabelMap};
use crate::weights::{neighbor_index, EdgeWeights, NEIGHBORS};

/// `-ln(p)` with `p` floored at the smallest positive normal, so the cost stays finite.
fn data_cost(likelihood: f64) -> f64 {
    -likelihood.max(f64::MIN_POSITIVE).ln()
}

/// Source and sink capacities of one pixel.
fn terminal_costs(
    label: Label,
    likelihoods: impl FnOnce() -> (f64, f64),
    lambda: f64,
) -> (f64, f64) {
    match label {
        Label::ProbableBackground | Label::ProbableForeground => {
            let (bgd, fgd) = likelihoods();
            (data_cost(bgd), data_cost(fgd))
        }
        Label::Background => (0.0, lambda),
        Label::Foreground => (lambda, 0.0),
    }
}

/// Rebuild `network` for the current mask and models: one node per pixel (row-major),
/// terminal edges for the data term and one undirected edge per neighbor pair for the smoothness term.
///
/// Source side means foreground. Cutting a probable pixel's source edge puts it in the background
/// and costs `-ln p_bg`, cutting its sink edge costs `-ln p_fg`.
///
/// `mask` and `weights` must match the image size.
pub fn build_graph(
    image: &RgbImage,
    mask: &LabelMap,
    background: &ColorGmm,
    foreground: &ColorGmm,
    lambda: f64,
    weights: &EdgeWeights,
    network: &mut FlowNetwork,
) -> Result<()> {
    let _span = tracing::debug_span!("build_graph").entered();

    check_dimensions(image, mask)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    if weights.maps().iter().any(|map| map.dim() != (height, width)) {
        return Err(SegmentError::InvalidImage(format!(
            "edge weights were computed for a {}x{} image, not {}x{}",
            weights.left.dim().1,
            weights.left.dim().0,
            width,
            height
        )));
    }
    network.clear();
    if width == 0 || height == 0 {
        return Ok(());
    }
    network.reserve(width * height, 2 * edge_pair_count(width, height));

    let terminals: Vec<Vec<(f64, f64)>> = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .map(|x| {
                    terminal_costs(
                        mask[[y, x]],
                        || {
                            let color = color_at(image, y * width + x);
                            (background.likelihood(&color), foreground.likelihood(&color))
                        },
                        lambda,
                    )
                })
                .collect()
        })
        .collect();

    let maps = weights.maps();
    for (y, row) in terminals.iter().enumerate() {
        for (x, &(source, sink)) in row.iter().enumerate() {
            let v = network.add_node();
            network.add_terminal_weights(v, source, sink);

            for (map, &(dx, dy)) in maps.iter().zip(NEIGHBORS.iter()) {
                if let Some(n) = neighbor_index(x, y, dx, dy, width, height) {
                    let w = map[[y, x]];
                    network.add_edge_pair(v, n, w, w);
                }
            }
        }
    }

    tracing::debug!(
        "graph has {} nodes and {} edges",
        network.node_count(),
        network.edge_pair_count()
    );
    Ok(())
}

/// Edge pairs a `width` x `height` grid produces: left, up-left, up and up-right neighbors.
pub fn edge_pair_count(width: usize, height: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    4 * width * height + 2 - 3 * (width + height)
}
