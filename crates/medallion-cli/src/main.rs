use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medallion_core::{locate_face, CropRect, SeetaFaceDetector, Template};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "medallion", about = "Medallion compositing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a photo onto the poster template as a circular cutout
    Render {
        /// Input photo (PNG, JPEG, ...)
        photo: PathBuf,
        /// Crop rectangle as x,y,w,h (pixels in the photo)
        #[arg(long, conflicts_with = "auto")]
        crop: Option<String>,
        /// Pick the crop rectangle via face detection
        #[arg(long)]
        auto: bool,
        /// Poster template image
        #[arg(long, default_value = "assets/template.png")]
        template: PathBuf,
        /// Cascade model file (used with --auto)
        #[arg(long, default_value = "models/seeta_fd_frontal_v1.0.bin")]
        detector_model: PathBuf,
        /// Output PNG path
        #[arg(short, long, default_value = "out.png")]
        output: PathBuf,
    },
    /// Locate the most prominent face and print a suggested crop
    Detect {
        /// Input photo (PNG, JPEG, ...)
        photo: PathBuf,
        /// Cascade model file
        #[arg(long, default_value = "models/seeta_fd_frontal_v1.0.bin")]
        detector_model: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            photo,
            crop,
            auto,
            template,
            detector_model,
            output,
        } => render(&photo, crop.as_deref(), auto, &template, &detector_model, &output),
        Commands::Detect {
            photo,
            detector_model,
            json,
        } => detect(&photo, &detector_model, json),
    }
}

fn render(
    photo_path: &Path,
    crop: Option<&str>,
    auto: bool,
    template_path: &Path,
    detector_model: &Path,
    output: &Path,
) -> Result<()> {
    let template = Template::load(template_path)
        .with_context(|| format!("loading template {}", template_path.display()))?;
    let photo = image::open(photo_path)
        .with_context(|| format!("loading photo {}", photo_path.display()))?;

    let rect = if auto {
        let mut detector = SeetaFaceDetector::load(detector_model)?;
        let region = locate_face(&mut detector, &photo)
            .context("no face detected; pass --crop to choose the region yourself")?;
        println!(
            "face at ({}, {}) {}x{} (confidence {:.2})",
            region.x, region.y, region.width, region.height, region.confidence
        );
        CropRect::from(region)
    } else {
        let spec = crop.context("either --crop x,y,w,h or --auto is required")?;
        parse_crop(spec)?
    };

    let png = medallion_core::render(&photo, rect, &template)?;
    std::fs::write(output, png)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {}", output.display());
    Ok(())
}

fn detect(photo_path: &Path, detector_model: &Path, json: bool) -> Result<()> {
    let photo = image::open(photo_path)
        .with_context(|| format!("loading photo {}", photo_path.display()))?;

    let mut detector = SeetaFaceDetector::load(detector_model)?;
    let Some(region) = locate_face(&mut detector, &photo) else {
        bail!("no face detected");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&region)?);
    } else {
        println!(
            "face at ({}, {}) {}x{} (confidence {:.2})",
            region.x, region.y, region.width, region.height, region.confidence
        );
    }
    Ok(())
}

/// Parse an `x,y,w,h` crop spec. Values may be fractional and are
/// truncated, matching the HTTP surface.
fn parse_crop(spec: &str) -> Result<CropRect> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        bail!("crop must be x,y,w,h — got {spec:?}");
    }
    let mut values = [0.0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("invalid crop component {part:?}"))?;
    }
    CropRect::from_f64(values[0], values[1], values[2], values[3])
        .context("crop width and height must be at least 1")
}
