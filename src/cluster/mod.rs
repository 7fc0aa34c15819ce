mod kmeans;

pub use kmeans::KMeans;

use crate::color::Color;

/// How initial cluster centers are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seeding {
    /// Centers drawn with probability proportional to squared distance from the ones already chosen.
    #[default]
    KMeansPlusPlus,
    /// Centers drawn uniformly from the samples.
    Random,
}

/// Trait for unsupervised clustering of color samples.
/// Used to seed the mixture components from an initial mask.
pub trait Clusterer {
    /// Partition `samples` into at most `k` groups.
    ///
    /// # Returns
    /// * One cluster index in `0..k` per sample, in sample order
    fn cluster(&mut self, samples: &[Color], k: usize) -> Vec<usize>;
}
