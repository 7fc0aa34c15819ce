use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{Clusterer, Seeding};
use crate::color::{squared_distance, Color};

/// Lloyd's algorithm with a fixed iteration cap.
///
/// Deterministic for a given seed: ties in the assignment step go to the lowest center index,
/// and a center that loses all its samples stays where it was.
pub struct KMeans {
    max_iterations: usize,
    seeding: Seeding,
    rng: StdRng,
}

impl KMeans {
    pub fn new(max_iterations: usize, seeding: Seeding, seed: u64) -> Self {
        Self {
            max_iterations,
            seeding,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn seed_centers(&mut self, samples: &[Color], k: usize) -> Vec<Color> {
        let mut centers = Vec::with_capacity(k);
        match self.seeding {
            Seeding::Random => {
                for _ in 0..k {
                    centers.push(samples[self.rng.gen_range(0..samples.len())]);
                }
            }
            Seeding::KMeansPlusPlus => {
                centers.push(samples[self.rng.gen_range(0..samples.len())]);
                let mut dist: Vec<f64> = samples
                    .iter()
                    .map(|s| squared_distance(s, &centers[0]))
                    .collect();

                while centers.len() < k {
                    let total: f64 = dist.iter().sum();
                    let pick = if total <= f64::EPSILON {
                        // All samples coincide with a center already.
                        self.rng.gen_range(0..samples.len())
                    } else {
                        let mut target = self.rng.gen::<f64>() * total;
                        let mut chosen = samples.len() - 1;
                        for (i, &d) in dist.iter().enumerate() {
                            if target < d {
                                chosen = i;
                                break;
                            }
                            target -= d;
                        }
                        chosen
                    };

                    let center = samples[pick];
                    for (d, s) in dist.iter_mut().zip(samples) {
                        *d = d.min(squared_distance(s, &center));
                    }
                    centers.push(center);
                }
            }
        }
        centers
    }
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(10, Seeding::KMeansPlusPlus, 0)
    }
}

fn nearest(sample: &Color, centers: &[Color]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = squared_distance(sample, c);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

impl Clusterer for KMeans {
    fn cluster(&mut self, samples: &[Color], k: usize) -> Vec<usize> {
        let _span = tracing::debug_span!("kmeans", samples = samples.len(), k).entered();

        if samples.is_empty() || k == 0 {
            return vec![0; samples.len()];
        }

        let mut centers = self.seed_centers(samples, k);
        let mut labels: Vec<usize> = samples.par_iter().map(|s| nearest(s, &centers)).collect();

        for iteration in 0..self.max_iterations {
            let mut sums = vec![[0.0f64; 3]; k];
            let mut counts = vec![0usize; k];
            for (s, &l) in samples.iter().zip(&labels) {
                sums[l][0] += s[0];
                sums[l][1] += s[1];
                sums[l][2] += s[2];
                counts[l] += 1;
            }
            for ((center, sum), &count) in centers.iter_mut().zip(&sums).zip(&counts) {
                if count > 0 {
                    let n = count as f64;
                    *center = [sum[0] / n, sum[1] / n, sum[2] / n];
                }
            }

            let next: Vec<usize> = samples.par_iter().map(|s| nearest(s, &centers)).collect();
            let changed = next.iter().zip(&labels).filter(|(a, b)| a != b).count();
            labels = next;

            tracing::trace!("k-means iteration {}: {} reassigned", iteration, changed);
            if changed == 0 {
                break;
            }
        }

        labels
    }
}
