use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Writes frames to an image file. The format follows the file extension.
pub struct FileOutput {
    path: PathBuf,
}

impl FileOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Writing result to {}", path.display());
        Self { path }
    }
}

impl OutputSink for FileOutput {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        frame
            .save(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::debug!("wrote {}x{} frame", frame.width(), frame.height());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn writes_png() {
        let path = std::env::temp_dir().join(format!("segcut_output_{}.png", std::process::id()));
        let frame = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        FileOutput::new(&path).write_frame(&frame).unwrap();

        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, frame);
        let _ = std::fs::remove_file(&path);
    }
}
