use super::{Matrix3, COMPONENTS};
use crate::color::Color;

/// Running sums for one component.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentStats {
    pub count: usize,
    pub sum: Color,
    pub prod: Matrix3,
}

/// Accumulator of one learning session, opened by [`ColorGmm::begin_learning`](super::ColorGmm::begin_learning)
/// and consumed by [`ColorGmm::end_learning`](super::ColorGmm::end_learning).
#[derive(Debug, Clone, Default)]
pub struct GmmLearner {
    stats: [ComponentStats; COMPONENTS],
}

impl GmmLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `color` as a sample of component `ci`. Out-of-range indices are ignored.
    pub fn add_sample(&mut self, ci: usize, color: &Color) {
        let Some(stats) = self.stats.get_mut(ci) else {
            tracing::warn!("ignoring sample for component {} (have {})", ci, COMPONENTS);
            return;
        };
        for r in 0..3 {
            stats.sum[r] += color[r];
            for c in 0..3 {
                stats.prod[r][c] += color[r] * color[c];
            }
        }
        stats.count += 1;
    }

    pub fn stats(&self, ci: usize) -> &ComponentStats {
        &self.stats[ci]
    }

    pub fn total_count(&self) -> usize {
        self.stats.iter().map(|s| s.count).sum()
    }
}
