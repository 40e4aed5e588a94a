//! Camera frame source for the detection overlay.
//!
use thiserror::Error;

#[cfg(feature = "v4l")]
pub mod sensors;
pub mod source;

pub use source::CameraSource;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "v4l")]
    #[error("Failed to configure camera: {0}")]
    Config(#[from] rscam::Error),
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Unsupported camera setting: {0}")]
    Unsupported(String),
    #[error("Capture thread stopped before the camera was ready")]
    ThreadStopped,
}

/// Which device to open and how to configure it.
///
/// Resolution and frame interval default to the highest the camera supports for the format.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub device: String,
    /// FourCC pixel format, `MJPG` or `RGB3`.
    pub format: String,
    pub resolution: Option<(u32, u32)>,
    /// Frame interval as `(numerator, denominator)` seconds, `(1, 30)` for 30 fps.
    pub interval: Option<(u32, u32)>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_owned(),
            format: "MJPG".to_owned(),
            resolution: None,
            interval: None,
        }
    }
}

/// Parse a resolution given as `WIDTHxHEIGHT`.
pub fn parse_resolution(text: &str) -> Result<(u32, u32), String> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|err| format!("invalid width {width:?}: {err}"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|err| format!("invalid height {height:?}: {err}"))?;

    match (width, height) {
        (0, _) | (_, 0) => Err(format!("resolution {text:?} is empty")),
        resolution => Ok(resolution),
    }
}
