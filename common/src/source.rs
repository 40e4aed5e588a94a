//! Frame sources feeding the detection loop.
//!
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;

/// A single still image sampled from a video stream.
///
/// Frames are shared read-only between the loop and the detection service.
pub type Frame = Arc<RgbImage>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read frame: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to capture frame: {0}")]
    Capture(String),
    #[error("Frame source unavailable: {0}")]
    Unavailable(String),
}

/// Live or recorded video the loop pulls frames from.
#[async_trait]
pub trait FrameSource: Send {
    /// Get the current frame.
    ///
    /// Returns `Ok(None)` once the stream has ended and no further frames will follow.
    async fn current_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}
