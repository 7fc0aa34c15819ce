use thiserror::Error;

use crate::segmentation::types::Class;

/// Errors reported by the segmentation engine.
///
/// Everything except `DegenerateInitialization` is detected before any pixel work starts.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid mask: {0}")]
    InvalidMask(String),

    #[error("cannot seed the {class} model: the mask has no {class} pixels")]
    DegenerateInitialization { class: Class },

    #[error("iteration count must be positive, got {0}")]
    InvalidIterationCount(i32),

    #[error("invalid model buffer: {0}")]
    InvalidModel(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
