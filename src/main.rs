mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::{DynamicImage, GrayImage, RgbImage};
use segcut::segmentation::{apply_mask, decode_mask, mask_to_rgb};
use segcut::{grab_cut_with_config, GrabCutConfig, InitMode, LabelMap, Rect};
use std::time::Instant;

use output::{FileOutput, OutputSink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image
    #[arg(short, long)]
    input: String,

    /// Output image (mask visualization or foreground cut-out)
    #[arg(short, long, default_value = "segmented.png")]
    output: String,

    /// Initial rectangle as x,y,width,height
    #[arg(long, value_parser = parse_rect, conflicts_with = "mask")]
    rect: Option<Rect>,

    /// Initial label mask (grayscale, values 0-3) instead of a rectangle
    #[arg(long)]
    mask: Option<String>,

    /// Refine the given --mask without re-seeding the color models
    #[arg(long, requires = "mask")]
    eval: bool,

    /// Number of refinement iterations
    #[arg(long, default_value_t = 5)]
    iterations: i32,

    /// Smoothness strength
    #[arg(long, default_value_t = 50.0)]
    gamma: f64,

    /// Seed for k-means initialization
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Also write the raw label mask (values 0-3) for a later --mask run
    #[arg(long)]
    save_mask: Option<String>,

    /// Write the label visualization instead of the cut-out
    #[arg(long)]
    show_mask: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_rect(s: &str) -> std::result::Result<Rect, String> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("{}: {}", p, e)))
        .collect::<std::result::Result<_, _>>()?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => Err(format!("expected x,y,width,height, got {}", s)),
    }
}

/// Label visualization, or the input with everything but the foreground blacked out.
fn render_frame(image: &DynamicImage, labels: &LabelMap, show_mask: bool) -> Result<RgbImage> {
    if show_mask {
        return Ok(mask_to_rgb(labels));
    }
    let rgb = image.as_rgb8().context("Input was not converted to RGB")?;
    Ok(apply_mask(rgb, labels))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("segcut starting");

    let image = image::open(&args.input)
        .with_context(|| format!("Failed to load image {}", args.input))?;
    let image = DynamicImage::ImageRgb8(image.to_rgb8());
    let (width, height) = (image.width(), image.height());
    tracing::info!("Input: {}x{}", width, height);

    let (mut mask, rect, mode) = match (&args.mask, args.rect) {
        (Some(path), _) => {
            let mask = image::open(path)
                .with_context(|| format!("Failed to load mask {}", path))?
                .to_luma8();
            let mode = if args.eval {
                InitMode::Eval
            } else {
                InitMode::WithMask
            };
            (mask, Rect::default(), mode)
        }
        (None, Some(rect)) => (GrayImage::new(width, height), rect, InitMode::WithRect),
        (None, None) => bail!("either --rect or --mask is required"),
    };

    let config = GrabCutConfig {
        gamma: args.gamma,
        kmeans_seed: args.seed,
        ..Default::default()
    };

    let mut bgd_model = Vec::new();
    let mut fgd_model = Vec::new();
    let start = Instant::now();
    grab_cut_with_config(
        &config,
        &image,
        &mut mask,
        rect,
        &mut bgd_model,
        &mut fgd_model,
        args.iterations,
        mode,
    )
    .context("Segmentation failed")?;
    tracing::info!(
        "Segmented in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let labels = decode_mask(&mask, width, height).context("Engine returned an invalid mask")?;
    let frame = render_frame(&image, &labels, args.show_mask)?;

    let mut output = FileOutput::new(&args.output);
    output.write_frame(&frame).context("Failed to write output")?;

    if let Some(path) = &args.save_mask {
        mask.save(path)
            .with_context(|| format!("Failed to write mask {}", path))?;
        tracing::info!("Saved label mask to {}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use segcut::segmentation::init_mask_with_rect;

    #[test]
    fn parses_rect() {
        assert_eq!(parse_rect("1, 2,3,4").unwrap(), Rect::new(1, 2, 3, 4));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("a,2,3,4").is_err());
    }

    #[test]
    fn renders_cutout_from_loaded_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([7, 8, 9])));
        let labels = init_mask_with_rect(3, 2, Rect::new(1, 0, 1, 2));

        let cut = render_frame(&image, &labels, false).unwrap();
        assert_eq!(cut.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(cut.get_pixel(1, 1), &Rgb([7, 8, 9]));

        let vis = render_frame(&image, &labels, true).unwrap();
        assert_eq!(vis.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(vis.get_pixel(1, 0), &Rgb([192, 192, 192]));

        let gray = DynamicImage::ImageLuma8(GrayImage::new(3, 2));
        assert!(render_frame(&gray, &labels, false).is_err());
    }
}
