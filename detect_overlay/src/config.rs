//! Command line configuration shared by the binaries.
//!
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Args;
use rusttype::Font;

use crate::{
    detector::{DetectionFilter, SsdParams},
    labels::Labels,
    renderer::RenderStyle,
    surface::{self, Color},
};

/// Fonts tried in order when no font is given.
const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
];

#[derive(Args, Clone, Debug)]
pub struct OverlayArgs {
    /// SSD detection model in ONNX format
    #[clap(long, default_value = "ssd_mobilenet_v3.onnx")]
    pub model: PathBuf,

    /// Width of the model input
    #[clap(long, default_value_t = 320)]
    pub input_width: u32,

    /// Height of the model input
    #[clap(long, default_value_t = 320)]
    pub input_height: u32,

    /// Class names file with one name per line [default: COCO names]
    #[clap(long)]
    pub labels: Option<PathBuf>,

    /// Minimum confidence of a detection to be shown
    #[clap(long, default_value_t = 0.55)]
    pub min_confidence: f32,

    /// Maximum IoU of two boxes of the same class before one is suppressed
    #[clap(long, default_value_t = 0.4)]
    pub max_iou: f32,

    /// Only show detections of these categories, comma separated [default: all]
    #[clap(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Display refresh rate in Hz, the loop never runs faster than this
    #[clap(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub refresh_rate: u32,

    /// Color of boxes and labels
    #[clap(long, default_value_t = Color::GREEN)]
    pub color: Color,

    /// Stroke width of the boxes in pixels
    #[clap(long, default_value_t = 4)]
    pub line_width: u32,

    /// TrueType font for the labels [default: first system font found]
    #[clap(long)]
    pub font: Option<PathBuf>,

    /// Font size of the labels in pixels
    #[clap(long, default_value_t = 18.0)]
    pub font_size: f32,

    /// Show the number of detections per category
    #[clap(long)]
    pub summary: bool,

    /// Show the CPU and memory load of the host
    #[clap(long)]
    pub system_stats: bool,

    /// Write the overlay of every frame to this PNG file
    #[clap(long)]
    pub snapshot: Option<PathBuf>,

    /// Seconds between two frame rate log messages
    #[clap(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub meter_interval: u64,
}

impl OverlayArgs {
    pub fn ssd_params(&self) -> SsdParams {
        SsdParams {
            input_width: self.input_width,
            input_height: self.input_height,
            min_confidence: self.min_confidence,
            max_iou: self.max_iou,
        }
    }

    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter::new(self.min_confidence).with_categories(self.categories.iter().cloned())
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            color: self.color,
            line_width: self.line_width,
            font_size: self.font_size,
            summary: self.summary,
        }
    }

    pub fn meter_period(&self) -> Duration {
        Duration::from_secs(self.meter_interval)
    }

    pub fn load_labels(&self) -> Result<Labels> {
        match &self.labels {
            Some(path) => Labels::from_file(path)
                .with_context(|| format!("failed to read labels from {}", path.display())),
            None => Ok(Labels::coco()),
        }
    }

    pub fn load_font(&self) -> Result<Font<'static>> {
        if let Some(path) = &self.font {
            return surface::load_font(path)
                .with_context(|| format!("failed to load font {}", path.display()));
        }

        for candidate in FONT_CANDIDATES.iter().map(Path::new) {
            if candidate.exists() {
                log::debug!("Using font {}", candidate.display());
                return surface::load_font(candidate)
                    .with_context(|| format!("failed to load font {}", candidate.display()));
            }
        }

        bail!("no font found, pass one with --font")
    }
}
