use crate::cluster::Seeding;
use crate::error::{Result, SegmentError};

/// Tunable constants of one segmentation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabCutConfig {
    /// Smoothness strength. Pulls neighboring pixels toward the same label.
    pub gamma: f64,
    /// Hard-label terminal cost, as a multiple of `gamma`.
    pub lambda_factor: f64,
    /// Lloyd iteration cap for model seeding.
    pub kmeans_iterations: usize,
    /// Seed for the clustering RNG so runs are reproducible.
    pub kmeans_seed: u64,
    pub seeding: Seeding,
}

impl Default for GrabCutConfig {
    fn default() -> Self {
        Self {
            gamma: 50.0,
            lambda_factor: 9.0,
            kmeans_iterations: 10,
            kmeans_seed: 0,
            seeding: Seeding::KMeansPlusPlus,
        }
    }
}

impl GrabCutConfig {
    /// Terminal capacity that pins a hard-labeled pixel to its side.
    pub fn lambda(&self) -> f64 {
        self.lambda_factor * self.gamma
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(SegmentError::InvalidConfig(format!(
                "gamma must be finite and non-negative, got {}",
                self.gamma
            )));
        }
        if !self.lambda_factor.is_finite() || self.lambda_factor < 0.0 {
            return Err(SegmentError::InvalidConfig(format!(
                "lambda factor must be finite and non-negative, got {}",
                self.lambda_factor
            )));
        }
        if self.kmeans_iterations == 0 {
            return Err(SegmentError::InvalidConfig(
                "k-means needs at least one iteration".to_string(),
            ));
        }
        Ok(())
    }
}
