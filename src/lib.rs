//! Interactive foreground/background segmentation by iterated graph cuts.
//!
//! Two Gaussian-mixture color models (background, foreground) are fitted to the current mask,
//! a flow network encodes the resulting energy, and its minimum cut relabels the probable pixels.

pub mod cluster;
pub mod color;
pub mod config;
pub mod error;
pub mod gmm;
pub mod graph;
pub mod segmentation;
pub mod weights;

pub use config::GrabCutConfig;
pub use error::{Result, SegmentError};
pub use segmentation::{
    grab_cut, grab_cut_with_config, GrabCut, InitMode, Label, LabelMap, Rect, SessionState,
};
