mod init;
mod learning;

pub use init::init_gmms;
pub use learning::GmmLearner;

use crate::color::Color;
use crate::error::{Result, SegmentError};

/// Number of Gaussian components per class model.
pub const COMPONENTS: usize = 5;

/// Length of a serialized model: weight (1) + mean (3) + covariance (9) per component.
pub const PARAMS_LEN: usize = 13 * COMPONENTS;

/// Diagonal noise added to a singular covariance. Doubled until the matrix is positive-definite.
const SINGULAR_FIX: f64 = 0.01;

/// Smallest Cholesky pivot accepted, relative to the largest variance.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// `(2π)^(-3/2)`, the normalization of a 3-variate Gaussian.
const GAUSS_NORM: f64 = 0.063_493_635_934_240_97;

pub type Matrix3 = [[f64; 3]; 3];

/// One weighted Gaussian of a mixture.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Component {
    pub weight: f64,
    pub mean: Color,
    pub covariance: Matrix3,
    inverse: Matrix3,
    determinant: f64,
}

impl Component {
    /// Unweighted density at `color`. Zero for a component that owns no samples.
    pub fn density(&self, color: &Color) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let d = [
            color[0] - self.mean[0],
            color[1] - self.mean[1],
            color[2] - self.mean[2],
        ];
        let inv = &self.inverse;
        let mahalanobis = d[0] * (d[0] * inv[0][0] + d[1] * inv[1][0] + d[2] * inv[2][0])
            + d[1] * (d[0] * inv[0][1] + d[1] * inv[1][1] + d[2] * inv[2][1])
            + d[2] * (d[0] * inv[0][2] + d[1] * inv[1][2] + d[2] * inv[2][2]);
        GAUSS_NORM / self.determinant.sqrt() * (-0.5 * mahalanobis).exp()
    }

    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    /// Cache determinant and inverse, regularizing the covariance first if it is not positive-definite.
    fn finalize(&mut self) {
        let mut fix = SINGULAR_FIX;
        while !is_positive_definite(&self.covariance) && fix.is_finite() {
            for i in 0..3 {
                self.covariance[i][i] += fix;
            }
            fix *= 2.0;
        }
        let det = determinant(&self.covariance);
        self.determinant = det;
        self.inverse = inverse(&self.covariance, det);
    }
}

/// Sylvester's criterion on the leading minors, read as Cholesky pivots `M1`, `M2/M1`, `M3/M2`.
///
/// Every pivot must clear a tolerance scaled by the largest variance, so rank-deficient
/// matrices whose minors are only rounding noise are rejected.
fn is_positive_definite(c: &Matrix3) -> bool {
    let scale = c[0][0].max(c[1][1]).max(c[2][2]);
    let tolerance = PIVOT_TOLERANCE * scale.max(0.0) + f64::EPSILON;

    let m1 = c[0][0];
    let m2 = c[0][0] * c[1][1] - c[0][1] * c[1][0];
    let m3 = determinant(c);
    m1 > tolerance && m2 / m1 > tolerance && m3 / m2 > tolerance
}

fn determinant(c: &Matrix3) -> f64 {
    c[0][0] * (c[1][1] * c[2][2] - c[1][2] * c[2][1])
        - c[0][1] * (c[1][0] * c[2][2] - c[1][2] * c[2][0])
        + c[0][2] * (c[1][0] * c[2][1] - c[1][1] * c[2][0])
}

fn inverse(c: &Matrix3, det: f64) -> Matrix3 {
    let inv_det = 1.0 / det;
    [
        [
            (c[1][1] * c[2][2] - c[1][2] * c[2][1]) * inv_det,
            -(c[0][1] * c[2][2] - c[0][2] * c[2][1]) * inv_det,
            (c[0][1] * c[1][2] - c[0][2] * c[1][1]) * inv_det,
        ],
        [
            -(c[1][0] * c[2][2] - c[1][2] * c[2][0]) * inv_det,
            (c[0][0] * c[2][2] - c[0][2] * c[2][0]) * inv_det,
            -(c[0][0] * c[1][2] - c[0][2] * c[1][0]) * inv_det,
        ],
        [
            (c[1][0] * c[2][1] - c[1][1] * c[2][0]) * inv_det,
            -(c[0][0] * c[2][1] - c[0][1] * c[2][0]) * inv_det,
            (c[0][0] * c[1][1] - c[0][1] * c[1][0]) * inv_det,
        ],
    ]
}

/// Color model of one class: a mixture of [`COMPONENTS`] weighted Gaussians over RGB.
///
/// A fresh model has all weights at zero and must go through at least one learning
/// session before [`likelihood`](Self::likelihood) means anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorGmm {
    components: [Component; COMPONENTS],
}

impl ColorGmm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model from a serialized buffer. An empty buffer gives a fresh model.
    ///
    /// Layout: `[weights(K) | means(3K) | covariances(9K, row-major)]`.
    pub fn from_params(params: &[f64]) -> Result<Self> {
        if params.is_empty() {
            return Ok(Self::new());
        }
        if params.len() != PARAMS_LEN {
            return Err(SegmentError::InvalidModel(format!(
                "expected {} values, got {}",
                PARAMS_LEN,
                params.len()
            )));
        }
        if params.iter().any(|v| !v.is_finite()) {
            return Err(SegmentError::InvalidModel(
                "model contains non-finite values".to_string(),
            ));
        }

        let (weights, rest) = params.split_at(COMPONENTS);
        let (means, covs) = rest.split_at(3 * COMPONENTS);

        let mut gmm = Self::new();
        for (ci, component) in gmm.components.iter_mut().enumerate() {
            let weight = weights[ci];
            if weight < 0.0 {
                return Err(SegmentError::InvalidModel(format!(
                    "component {} has negative weight {}",
                    ci, weight
                )));
            }
            component.weight = weight;
            component.mean = [means[3 * ci], means[3 * ci + 1], means[3 * ci + 2]];
            for r in 0..3 {
                for c in 0..3 {
                    component.covariance[r][c] = covs[9 * ci + 3 * r + c];
                }
            }
            if weight > 0.0 {
                if !is_positive_definite(&component.covariance) {
                    return Err(SegmentError::InvalidModel(format!(
                        "component {} covariance is not positive-definite",
                        ci
                    )));
                }
                let det = determinant(&component.covariance);
                component.determinant = det;
                component.inverse = inverse(&component.covariance, det);
            }
        }
        Ok(gmm)
    }

    /// Serialize into the buffer layout read by [`from_params`](Self::from_params).
    pub fn to_params(&self) -> Vec<f64> {
        let mut params = vec![0.0; PARAMS_LEN];
        for (ci, component) in self.components.iter().enumerate() {
            params[ci] = component.weight;
            params[COMPONENTS + 3 * ci..COMPONENTS + 3 * ci + 3].copy_from_slice(&component.mean);
            for r in 0..3 {
                let base = 4 * COMPONENTS + 9 * ci + 3 * r;
                params[base..base + 3].copy_from_slice(&component.covariance[r]);
            }
        }
        params
    }

    pub fn components(&self) -> &[Component; COMPONENTS] {
        &self.components
    }

    /// True once at least one component has been learned.
    pub fn is_trained(&self) -> bool {
        self.components.iter().any(|c| c.weight > 0.0)
    }

    /// Mixture density at `color`.
    pub fn likelihood(&self, color: &Color) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * c.density(color))
            .sum()
    }

    /// Index of the component with the highest weighted density. The first one wins ties.
    pub fn which_component(&self, color: &Color) -> usize {
        let mut best = 0;
        let mut max = 0.0;
        for (ci, c) in self.components.iter().enumerate() {
            let p = c.weight * c.density(color);
            if p > max {
                best = ci;
                max = p;
            }
        }
        best
    }

    /// Start a learning session with empty accumulators.
    pub fn begin_learning(&self) -> GmmLearner {
        GmmLearner::new()
    }

    /// Re-estimate parameters from the session's samples.
    ///
    /// Components without samples keep their mean and covariance but get weight zero,
    /// so the weights always sum to one. A session with no samples at all changes nothing.
    pub fn end_learning(&mut self, learner: &GmmLearner) {
        let total = learner.total_count();
        if total == 0 {
            return;
        }
        for (ci, component) in self.components.iter_mut().enumerate() {
            let stats = learner.stats(ci);
            if stats.count == 0 {
                // Keeps mean and covariance, drops out of the mixture.
                component.weight = 0.0;
                continue;
            }
            let n = stats.count as f64;
            component.weight = n / total as f64;

            let mean = [stats.sum[0] / n, stats.sum[1] / n, stats.sum[2] / n];
            for r in 0..3 {
                for c in 0..3 {
                    component.covariance[r][c] = stats.prod[r][c] / n - mean[r] * mean[c];
                }
            }
            component.mean = mean;
            component.finalize();
        }
    }
}
