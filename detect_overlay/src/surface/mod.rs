//! Drawing surfaces the overlay is rendered onto.
//!
//! Two implementations are provided:
//! - `ImageSurface` draws onto a transparent RGBA raster with `imageproc` and `rusttype`.
//! - `RecordingSurface` keeps a log of the issued draw operations without rasterizing anything.
use std::{fmt, str::FromStr};

use common::BoundingBox;
use thiserror::Error;

pub mod raster;
pub mod recording;

pub use self::raster::{load_font, ImageSurface};
pub use self::recording::{DrawOp, RecordingSurface};

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("No font loaded, cannot draw text")]
    MissingFont,
    #[error("Failed to load font: {0}")]
    Font(String),
    #[error("Failed to read font file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write overlay image: {0}")]
    Image(#[from] image::ImageError),
}

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::GREEN
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("{0:?} is not a color, use `#RRGGBB` or `#RRGGBBAA`")]
pub struct ColorParseError(String);

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_owned());
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

/// A 2D drawing layer composited above the video.
///
/// Coordinates are in pixels of the video frame, the surface is expected to have the frame's
/// native size.
pub trait OverlaySurface: Send {
    fn dimensions(&self) -> (u32, u32);

    /// Erase all previous content, leaving a fully transparent surface.
    fn clear(&mut self) -> Result<(), SurfaceError>;

    /// Draw the outline of `rect` with a stroke centered on its edges.
    fn stroke_rect(
        &mut self,
        rect: &BoundingBox,
        color: Color,
        line_width: u32,
    ) -> Result<(), SurfaceError>;

    /// Draw `text` with its left end at `x` and its baseline at `y`.
    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        color: Color,
        font_size: f32,
    ) -> Result<(), SurfaceError>;

    /// Commit the finished frame.
    fn present(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}
