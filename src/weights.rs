//! Pairwise smoothness weights between each pixel and its left, up-left, up and up-right neighbors.

use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;

use crate::color::{color_at, squared_distance};

/// Neighbor offsets `(dx, dy)` looking backward in scan order, so each unordered pair is visited once.
pub const NEIGHBORS: [(i64, i64); 4] = [(-1, 0), (-1, -1), (0, -1), (1, -1)];

/// The four directional weight maps plus the contrast factor they were built with.
///
/// Each map holds, at `[[y, x]]`, the weight of the edge between `(x, y)` and the neighbor in that direction.
/// Out-of-bounds neighbors have weight zero.
#[derive(Debug, Clone)]
pub struct EdgeWeights {
    pub beta: f64,
    pub left: Array2<f64>,
    pub up_left: Array2<f64>,
    pub up: Array2<f64>,
    pub up_right: Array2<f64>,
}

impl EdgeWeights {
    /// Compute β and all four maps for `image` with smoothness strength `gamma`.
    pub fn compute(image: &RgbImage, gamma: f64) -> Self {
        let _span = tracing::debug_span!("pairwise_weights").entered();

        let beta = calc_beta(image);
        let (width, height) = (image.width() as usize, image.height() as usize);
        let gamma_div_sqrt2 = gamma / std::f64::consts::SQRT_2;
        let scales = [gamma, gamma_div_sqrt2, gamma, gamma_div_sqrt2];

        let mut maps: [Vec<f64>; 4] = Default::default();
        for (map, (&(dx, dy), &scale)) in maps.iter_mut().zip(NEIGHBORS.iter().zip(scales.iter())) {
            *map = vec![0.0; width * height];
            if beta == 0.0 {
                // Degenerate contrast: every weight stays zero.
                continue;
            }
            map.par_chunks_mut(width.max(1))
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, weight) in row.iter_mut().enumerate() {
                        if let Some(n) = neighbor_index(x, y, dx, dy, width, height) {
                            let d = squared_distance(
                                &color_at(image, y * width + x),
                                &color_at(image, n),
                            );
                            *weight = scale * (-beta * d).exp();
                        }
                    }
                });
        }

        let [left, up_left, up, up_right] = maps;
        let shape = (height, width);
        Self {
            beta,
            left: to_grid(left, shape),
            up_left: to_grid(up_left, shape),
            up: to_grid(up, shape),
            up_right: to_grid(up_right, shape),
        }
    }

    /// The maps in [`NEIGHBORS`] order.
    pub fn maps(&self) -> [&Array2<f64>; 4] {
        [&self.left, &self.up_left, &self.up, &self.up_right]
    }
}

fn to_grid(values: Vec<f64>, shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_vec(shape, values).unwrap_or_else(|_| Array2::zeros(shape))
}

/// Row-major index of the neighbor at `(x + dx, y + dy)`, if inside the image.
#[inline]
pub fn neighbor_index(
    x: usize,
    y: usize,
    dx: i64,
    dy: i64,
    width: usize,
    height: usize,
) -> Option<usize> {
    let nx = x as i64 + dx;
    let ny = y as i64 + dy;
    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
        return None;
    }
    Some(ny as usize * width + nx as usize)
}

/// β = 1 / (2 · mean squared color difference over all neighbor pairs).
///
/// Zero when the image has no contrast at all.
pub fn calc_beta(image: &RgbImage) -> f64 {
    let (width, height) = (image.width() as usize, image.height() as usize);
    if width == 0 || height == 0 {
        return 0.0;
    }

    // Row sums are collected and added in row order so the result does not depend on scheduling.
    let row_sums: Vec<(f64, usize)> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for x in 0..width {
                let color = color_at(image, y * width + x);
                for &(dx, dy) in NEIGHBORS.iter() {
                    if let Some(n) = neighbor_index(x, y, dx, dy, width, height) {
                        sum += squared_distance(&color, &color_at(image, n));
                        count += 1;
                    }
                }
            }
            (sum, count)
        })
        .collect();

    let (sum, count) = row_sums
        .iter()
        .fold((0.0, 0usize), |(s, c), &(rs, rc)| (s + rs, c + rc));

    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    if mean <= f64::EPSILON {
        return 0.0;
    }
    1.0 / (2.0 * mean)
}
