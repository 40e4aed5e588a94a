//! Frame source reading a camera on a dedicated capture thread.
//!
use std::{sync::Arc, thread};

use async_trait::async_trait;
use common::{Frame, FrameSource, SourceError};
use image::{ImageFormat, RgbImage};
use tokio::sync::{oneshot, watch};

use crate::CameraError;

/// The capture thread gives up after this many failed captures in a row.
const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Latest capture result published by the capture thread.
type Published = Option<Result<Frame, String>>;

/// Live camera stream.
///
/// Frames are captured on their own thread and only the latest one is kept. A read waits for a
/// frame newer than the one returned before, so frames captured while the loop was busy are
/// dropped. The capture thread stops once the source is dropped.
pub struct CameraSource {
    frames: watch::Receiver<Published>,
}

impl CameraSource {
    /// Open the camera of `config` on a new capture thread.
    #[cfg(feature = "v4l")]
    pub async fn open(config: crate::CameraConfig) -> Result<Self, CameraError> {
        Self::spawn(move || crate::sensors::start_camera(&config)).await
    }

    /// Start a capture thread.
    ///
    /// `init` runs on the capture thread and returns the function capturing a single frame.
    /// Returns once `init` is done, with its error if it failed.
    pub async fn spawn<I, F>(init: I) -> Result<Self, CameraError>
    where
        I: FnOnce() -> Result<F, CameraError> + Send + 'static,
        F: FnMut() -> Result<RgbImage, CameraError> + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (frame_tx, frame_rx) = watch::channel(None);

        thread::Builder::new()
            .name("camera-capture".to_owned())
            .spawn(move || {
                let capture = match init() {
                    Ok(capture) => {
                        let _ = ready_tx.send(Ok(()));
                        capture
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                capture_frames(capture, frame_tx);
            })?;

        ready_rx.await.map_err(|_| CameraError::ThreadStopped)??;
        Ok(Self { frames: frame_rx })
    }
}

fn capture_frames<F>(mut capture: F, frames: watch::Sender<Published>)
where
    F: FnMut() -> Result<RgbImage, CameraError>,
{
    let mut failures = 0;
    loop {
        let published = match capture() {
            Ok(frame) => {
                failures = 0;
                Ok(Arc::new(frame))
            }
            Err(err) => {
                failures += 1;
                log::warn!("Failed to capture frame ({failures} in a row): {err}");
                Err(err.to_string())
            }
        };

        if frames.send(Some(published)).is_err() {
            log::debug!("Camera source dropped, stopping capture");
            break;
        }
        if failures >= MAX_CONSECUTIVE_FAILURES {
            log::error!("Giving up on the camera after {failures} failed captures");
            break;
        }
    }
}

#[async_trait]
impl FrameSource for CameraSource {
    async fn current_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.frames.changed().await.is_err() {
            // Capture thread is gone and its last result was already handed out
            return Ok(None);
        }

        let latest = self.frames.borrow_and_update().clone();
        match latest {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(msg)) => Err(SourceError::Capture(msg)),
            None => Ok(None),
        }
    }
}

/// Decode a raw camera frame of the given FourCC format.
pub fn decode_frame(
    format: &[u8],
    resolution: (u32, u32),
    data: &[u8],
) -> Result<RgbImage, CameraError> {
    match format {
        b"MJPG" | b"JPEG" => {
            Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8())
        }
        b"RGB3" => {
            let (width, height) = resolution;
            RgbImage::from_raw(width, height, data.to_vec()).ok_or_else(|| {
                CameraError::Unsupported(format!(
                    "frame of {} bytes is too small for {width}x{height} RGB",
                    data.len()
                ))
            })
        }
        _ => Err(CameraError::Unsupported(format!(
            "pixel format {:?}",
            String::from_utf8_lossy(format)
        ))),
    }
}
