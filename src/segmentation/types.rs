use std::fmt;

use ndarray::Array2;

use crate::error::SegmentError;

/// Per-pixel segmentation label.
///
/// The byte values match the mask encoding callers read and write:
/// 0 = background, 1 = foreground, 2 = probable background, 3 = probable foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Label {
    #[default]
    Background,
    Foreground,
    ProbableBackground,
    ProbableForeground,
}

impl Label {
    pub const ALL: [Label; 4] = [
        Label::Background,
        Label::Foreground,
        Label::ProbableBackground,
        Label::ProbableForeground,
    ];

    pub fn is_background_like(self) -> bool {
        matches!(self, Label::Background | Label::ProbableBackground)
    }

    pub fn is_foreground_like(self) -> bool {
        matches!(self, Label::Foreground | Label::ProbableForeground)
    }

    /// Probable labels are the only ones the solver may revise.
    pub fn is_probable(self) -> bool {
        matches!(self, Label::ProbableBackground | Label::ProbableForeground)
    }

    pub fn class(self) -> Class {
        if self.is_background_like() {
            Class::Background
        } else {
            Class::Foreground
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        match label {
            Label::Background => 0,
            Label::Foreground => 1,
            Label::ProbableBackground => 2,
            Label::ProbableForeground => 3,
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = SegmentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Background),
            1 => Ok(Label::Foreground),
            2 => Ok(Label::ProbableBackground),
            3 => Ok(Label::ProbableForeground),
            other => Err(SegmentError::InvalidMask(format!(
                "mask value {} is not one of background (0), foreground (1), probable background (2) or probable foreground (3)",
                other
            ))),
        }
    }
}

/// The two competing classes, each with its own color model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Background,
    Foreground,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Background => write!(f, "background"),
            Class::Foreground => write!(f, "foreground"),
        }
    }
}

/// Label grid indexed `[[row, col]]`, same dimensions as the image.
pub type LabelMap = Array2<Label>;

/// Initial region of interest. Signed so that rectangles partially outside the image can be clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with a `width` x `height` image.
    ///
    /// Returns `(x0, y0, x1, y1)` as half-open pixel ranges, or `None` when nothing overlaps.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(width));
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// How a run obtains its initial mask and models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Outside the rectangle is background, inside is probable foreground. Models are re-seeded.
    WithRect,
    /// Use the caller's mask as-is after validation. Models are re-seeded.
    WithMask,
    /// Keep the caller's mask and models and only refine.
    Eval,
}

/// Lifecycle of a [`GrabCut`](super::GrabCut) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Iterating { completed: u32 },
    Converged { iterations: u32 },
}
