use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;

use super::mask::check_dimensions;
use super::types::{Label, LabelMap, SessionState};
use crate::cluster::{Clusterer, KMeans};
use crate::color::color_at;
use crate::config::GrabCutConfig;
use crate::error::{Result, SegmentError};
use crate::gmm::{init_gmms, ColorGmm};
use crate::graph::{build_graph, Dinic, FlowNetwork, MinCut, MinCutSolver};
use crate::weights::EdgeWeights;

/// One segmentation run: the two class models plus the capabilities used to refine a mask.
///
/// The models persist across iterations; the component map and flow network are rebuilt every iteration.
/// The mask passed to [`iterate`](Self::iterate) is the only state carried from one iteration to the next.
pub struct GrabCut<C = KMeans, S = Dinic> {
    config: GrabCutConfig,
    clusterer: C,
    solver: S,
    background: ColorGmm,
    foreground: ColorGmm,
    network: FlowNetwork,
    state: SessionState,
}

impl GrabCut<KMeans, Dinic> {
    /// Session with the built-in k-means seeding and Dinic min-cut.
    pub fn new(config: GrabCutConfig) -> Self {
        let clusterer = KMeans::new(config.kmeans_iterations, config.seeding, config.kmeans_seed);
        Self::with_backends(config, clusterer, Dinic::new())
    }
}

impl Default for GrabCut<KMeans, Dinic> {
    fn default() -> Self {
        Self::new(GrabCutConfig::default())
    }
}

impl<C: Clusterer, S: MinCutSolver> GrabCut<C, S> {
    pub fn with_backends(config: GrabCutConfig, clusterer: C, solver: S) -> Self {
        Self {
            config,
            clusterer,
            solver,
            background: ColorGmm::new(),
            foreground: ColorGmm::new(),
            network: FlowNetwork::default(),
            state: SessionState::Uninitialized,
        }
    }

    pub fn config(&self) -> &GrabCutConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn background(&self) -> &ColorGmm {
        &self.background
    }

    pub fn foreground(&self) -> &ColorGmm {
        &self.foreground
    }

    /// Seed both models from `mask`.
    pub fn initialize(&mut self, image: &RgbImage, mask: &LabelMap) -> Result<()> {
        check_dimensions(image, mask)?;
        init_gmms(
            image,
            mask,
            &mut self.clusterer,
            &mut self.background,
            &mut self.foreground,
        )?;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Continue from previously learned models instead of seeding new ones.
    pub fn resume(&mut self, background: ColorGmm, foreground: ColorGmm) {
        self.background = background;
        self.foreground = foreground;
        self.state = SessionState::Initialized;
    }

    /// Component of the class model each pixel currently belongs to.
    pub fn assign_components(&self, image: &RgbImage, mask: &LabelMap) -> Array2<usize> {
        let _span = tracing::debug_span!("assign_components").entered();

        let (height, width) = mask.dim();
        let (background, foreground) = (&self.background, &self.foreground);
        let rows: Vec<Vec<usize>> = (0..height)
            .into_par_iter()
            .map(|y| {
                (0..width)
                    .map(|x| {
                        let color = color_at(image, y * width + x);
                        if mask[[y, x]].is_background_like() {
                            background.which_component(&color)
                        } else {
                            foreground.which_component(&color)
                        }
                    })
                    .collect()
            })
            .collect();

        Array2::from_shape_fn((height, width), |(y, x)| rows[y][x])
    }

    /// Re-estimate both models from the pixels' current classes and components.
    pub fn learn(&mut self, image: &RgbImage, mask: &LabelMap, components: &Array2<usize>) {
        let _span = tracing::debug_span!("learn_gmms").entered();

        let width = mask.dim().1;
        let mut bgd = self.background.begin_learning();
        let mut fgd = self.foreground.begin_learning();
        for ((y, x), &ci) in components.indexed_iter() {
            let color = color_at(image, y * width + x);
            if mask[[y, x]].is_background_like() {
                bgd.add_sample(ci, &color);
            } else {
                fgd.add_sample(ci, &color);
            }
        }
        self.background.end_learning(&bgd);
        self.foreground.end_learning(&fgd);
    }

    /// One refinement pass: assign components, learn, build the graph, cut, update `mask`.
    pub fn iterate(
        &mut self,
        image: &RgbImage,
        mask: &mut LabelMap,
        weights: &EdgeWeights,
    ) -> Result<()> {
        let completed = match self.state {
            SessionState::Uninitialized => {
                return Err(SegmentError::InvalidModel(
                    "session has no models yet; initialize or resume first".to_string(),
                ))
            }
            SessionState::Initialized => 0,
            SessionState::Iterating { completed } => completed,
            SessionState::Converged { iterations } => iterations,
        };
        check_dimensions(image, mask)?;

        let components = self.assign_components(image, mask);
        self.learn(image, mask, &components);
        build_graph(
            image,
            mask,
            &self.background,
            &self.foreground,
            self.config.lambda(),
            weights,
            &mut self.network,
        )?;
        let cut = self.solver.min_cut(&self.network);
        let changed = estimate_segmentation(&cut, mask);

        tracing::debug!(
            "iteration {}: {} probable pixels changed, cut = {:.3}",
            completed + 1,
            changed,
            cut.flow
        );
        self.state = SessionState::Iterating {
            completed: completed + 1,
        };
        Ok(())
    }

    /// Run exactly `iter_count` iterations. There is no early exit when the mask stops changing.
    pub fn run(&mut self, image: &RgbImage, mask: &mut LabelMap, iter_count: i32) -> Result<()> {
        self.run_with(image, mask, iter_count, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_iteration` after every committed iteration.
    pub fn run_with<F>(
        &mut self,
        image: &RgbImage,
        mask: &mut LabelMap,
        iter_count: i32,
        mut on_iteration: F,
    ) -> Result<()>
    where
        F: FnMut(&Self, &LabelMap),
    {
        if iter_count <= 0 {
            return Err(SegmentError::InvalidIterationCount(iter_count));
        }
        check_dimensions(image, mask)?;

        let weights = EdgeWeights::compute(image, self.config.gamma);
        tracing::debug!("beta = {:.6e}", weights.beta);

        for _ in 0..iter_count {
            self.iterate(image, mask, &weights)?;
            on_iteration(self, mask);
        }

        let iterations = match self.state {
            SessionState::Iterating { completed } => completed,
            SessionState::Converged { iterations } => iterations,
            SessionState::Uninitialized | SessionState::Initialized => 0,
        };
        self.state = SessionState::Converged { iterations };
        Ok(())
    }
}

/// Move every probable pixel to the side of the cut it landed on. Hard labels are left alone.
///
/// Returns how many probable pixels flipped.
pub fn estimate_segmentation(cut: &MinCut, mask: &mut LabelMap) -> usize {
    let width = mask.dim().1;
    let mut changed = 0;
    for ((y, x), label) in mask.indexed_iter_mut() {
        if !label.is_probable() {
            continue;
        }
        let next = if cut.in_source_segment(y * width + x) {
            Label::ProbableForeground
        } else {
            Label::ProbableBackground
        };
        if *label != next {
            changed += 1;
            *label = next;
        }
    }
    changed
}
