use std::path::{Path, PathBuf};

use common::BoundingBox;
use image::{Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use rusttype::{Font, Scale};

use super::{Color, OverlaySurface, SurfaceError};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
/// Wider strokes are drawn with this width.
const MAX_LINE_WIDTH: u32 = 1024;
/// Text positions are clamped to this distance from the origin.
const MAX_TEXT_OFFSET: f32 = (1 << 20) as f32;

/// Transparent RGBA raster to draw the overlay on.
pub struct ImageSurface {
    canvas: RgbaImage,
    font: Option<Font<'static>>,
    snapshot_path: Option<PathBuf>,
}

impl ImageSurface {
    /// Create a new, fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, TRANSPARENT),
            font: None,
            snapshot_path: None,
        }
    }

    /// Use `font` for text labels. Without a font, drawing text fails.
    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    /// Write the overlay to `path` every time a frame is presented.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }
}

impl OverlaySurface for ImageSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        for pixel in self.canvas.pixels_mut() {
            *pixel = TRANSPARENT;
        }
        Ok(())
    }

    fn stroke_rect(
        &mut self,
        rect: &BoundingBox,
        color: Color,
        line_width: u32,
    ) -> Result<(), SurfaceError> {
        if line_width == 0 {
            return Ok(());
        }
        let color = to_rgba(color);
        let line_width = line_width.min(MAX_LINE_WIDTH) as i32;

        // Edges beyond the surface are pulled in to where their stroke still stays off the surface
        let (canvas_width, canvas_height) = self.canvas.dimensions();
        let reach = line_width as f32;
        let clip = |v: f32, extent: u32| v.round().clamp(-reach, extent as f32 + reach) as i32;
        let (x, right) = (clip(rect.x, canvas_width), clip(rect.right(), canvas_width));
        let (y, bottom) = (clip(rect.y, canvas_height), clip(rect.bottom(), canvas_height));
        let (width, height) = (right - x, bottom - y);

        // Half of the stroke lies outside of the box, half inside
        for offset in (-(line_width - 1) / 2)..=(line_width / 2) {
            let (w, h) = (width + 2 * offset, height + 2 * offset);
            if w < 1 || h < 1 {
                continue;
            }
            let outline = Rect::at(x - offset, y - offset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut self.canvas, outline, color);
        }

        Ok(())
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        color: Color,
        font_size: f32,
    ) -> Result<(), SurfaceError> {
        let font = self.font.as_ref().ok_or(SurfaceError::MissingFont)?;
        let scale = Scale::uniform(font_size);

        // `draw_text_mut` positions the top of the glyphs, move up from the baseline
        let ascent = font.v_metrics(scale).ascent;
        let clamp = |v: f32| v.round().clamp(-MAX_TEXT_OFFSET, MAX_TEXT_OFFSET) as i32;

        draw_text_mut(
            &mut self.canvas,
            to_rgba(color),
            clamp(x),
            clamp(y - ascent),
            scale,
            font,
            text,
        );

        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        if let Some(path) = &self.snapshot_path {
            self.canvas.save(path)?;
            log::debug!("Overlay written to {}", path.display());
        }
        Ok(())
    }
}

fn to_rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, color.a])
}

/// Load a TrueType font from disk.
pub fn load_font(path: impl AsRef<Path>) -> Result<Font<'static>, SurfaceError> {
    let path = path.as_ref();
    let font_data = std::fs::read(path)?;
    Font::try_from_vec(font_data)
        .ok_or_else(|| SurfaceError::Font(format!("{} is not a TrueType font", path.display())))
}
