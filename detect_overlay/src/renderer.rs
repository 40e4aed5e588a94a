//! Render detections onto the overlay surface.
//!
//! Every call to `OverlayRenderer::render` replaces the whole content of the surface: it is
//! cleared first, then a box outline and a label are drawn for every detection. Optional status
//! lines (detection summary, host load) are stacked in the bottom left corner.
use std::collections::BTreeMap;

use common::{BoundingBox, Detection};

use crate::{
    surface::{Color, OverlaySurface, SurfaceError},
    system::LoadMonitor,
};

/// Distance between the label baseline and the top edge of its box.
const LABEL_OFFSET: f32 = 5.0;
/// Boxes with their top edge at or above this line get their label at this line instead.
const LABEL_MIN_Y: f32 = 10.0;
/// Margin of the status lines to the left and bottom edge of the surface.
const STATUS_MARGIN: f32 = 10.0;
/// Gap between two status lines, on top of the font size.
const STATUS_SPACING: f32 = 6.0;

/// How boxes and labels are drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub color: Color,
    pub line_width: u32,
    pub font_size: f32,
    /// Draw a line with the number of detections per category.
    pub summary: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            color: Color::GREEN,
            line_width: 4,
            font_size: 18.0,
            summary: false,
        }
    }
}

pub struct OverlayRenderer<S> {
    surface: S,
    style: RenderStyle,
    load_monitor: Option<Box<dyn LoadMonitor>>,
}

impl<S: OverlaySurface> OverlayRenderer<S> {
    pub fn new(surface: S, style: RenderStyle) -> Self {
        Self {
            surface,
            style,
            load_monitor: None,
        }
    }

    /// Also show the CPU and memory load of the host on every frame.
    pub fn with_load_monitor(mut self, monitor: impl LoadMonitor + 'static) -> Self {
        self.load_monitor = Some(Box::new(monitor));
        self
    }

    /// Replace the content of the surface with the given detections.
    ///
    /// Detections are drawn in the given order. If a drawing call fails, rendering stops and the
    /// surface is left with a partially drawn frame.
    pub fn render(&mut self, detections: &[Detection]) -> Result<(), SurfaceError> {
        let style = &self.style;

        self.surface.clear()?;

        for detection in detections {
            let bbox = &detection.bounding_box;
            self.surface
                .stroke_rect(bbox, style.color, style.line_width)?;

            let (x, y) = label_origin(bbox);
            self.surface
                .fill_text(&label_text(detection), x, y, style.color, style.font_size)?;
        }

        let mut status = vec![];
        if style.summary && !detections.is_empty() {
            status.push(summary_text(detections));
        }
        if let Some(monitor) = self.load_monitor.as_mut() {
            let load = monitor.sample();
            status.push(load.cpu_text());
            status.push(load.ram_text());
        }

        // Last line sits on the bottom margin, the others stack up from there
        let (_, height) = self.surface.dimensions();
        let line_height = style.font_size + STATUS_SPACING;
        for (i, line) in status.iter().rev().enumerate() {
            let y = height as f32 - STATUS_MARGIN - i as f32 * line_height;
            self.surface
                .fill_text(line, STATUS_MARGIN, y, style.color, style.font_size)?;
        }

        self.surface.present()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }
}

/// Label of a detection, e.g. `person (87.30%)`.
pub fn label_text(detection: &Detection) -> String {
    let percent = f64::from(detection.confidence) * 100.0;
    format!("{} ({}%)", detection.category, two_decimals(percent))
}

/// Format with two decimals, ties rounded up.
///
/// `format!` rounds ties to even and an `f32` product rounds before formatting, both of which
/// can move the last digit.
fn two_decimals(value: f64) -> String {
    format!("{:.2}", (value * 100.0).round() / 100.0)
}

/// Baseline origin of the label just above the top edge of the box.
///
/// Labels of boxes close to the top edge of the surface would be clipped, they are moved down to
/// a fixed line.
pub fn label_origin(bbox: &BoundingBox) -> (f32, f32) {
    let y = if bbox.y > LABEL_MIN_Y {
        bbox.y - LABEL_OFFSET
    } else {
        LABEL_MIN_Y
    };
    (bbox.x, y)
}

/// Number of detections per category, e.g. `car: 1, person: 2`.
pub fn summary_text(detections: &[Detection]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for detection in detections {
        *counts.entry(detection.category.as_str()).or_default() += 1;
    }

    counts
        .iter()
        .map(|(category, count)| format!("{category}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
