mod file;

pub use file::FileOutput;

use anyhow::Result;
use image::RgbImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a rendered result
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}
