//! Open and configure a V4L camera.
//!
use image::RgbImage;
use rscam::{Camera, Config, IntervalInfo, ResolutionInfo};

use crate::{source::decode_frame, CameraConfig, CameraError};

/// Open and start the configured camera.
///
/// Returns a function capturing and decoding one frame per call. The camera cannot leave the
/// thread it was opened on, so this is meant to run on the capture thread.
pub fn start_camera(
    config: &CameraConfig,
) -> Result<impl FnMut() -> Result<RgbImage, CameraError>, CameraError> {
    let format = fourcc(&config.format)?;
    let mut cam = Camera::new(&config.device)?;
    log_supported_formats(&cam, &config.format);

    log::info!("Using camera {}", config.device);

    let resolution = match config.resolution {
        Some(resolution) => resolution,
        None => {
            let info = cam.resolutions(&format)?;
            log::debug!("Found resolutions: {info:?}");
            pick_resolution(info)
                .ok_or_else(|| CameraError::Unsupported("no resolution found".to_owned()))?
        }
    };

    let interval = match config.interval {
        Some(interval) => interval,
        None => {
            let info = cam.intervals(&format, resolution)?;
            log::debug!("Found frame intervals: {info:?}");
            pick_interval(info)
                .ok_or_else(|| CameraError::Unsupported("no frame interval found".to_owned()))?
        }
    };

    log::info!(
        "Capturing {} at {}x{}, frame interval {}/{}s",
        config.format,
        resolution.0,
        resolution.1,
        interval.0,
        interval.1
    );

    cam.start(&Config {
        interval,
        resolution,
        format: &format,
        ..Default::default()
    })?;

    Ok(move || {
        let frame = cam.capture()?;
        decode_frame(&format, resolution, &frame)
    })
}

fn fourcc(format: &str) -> Result<[u8; 4], CameraError> {
    <[u8; 4]>::try_from(format.as_bytes())
        .map_err(|_| CameraError::Unsupported(format!("format {format:?} is not a FourCC code")))
}

/// Largest resolution in terms of number of pixels.
fn pick_resolution(info: ResolutionInfo) -> Option<(u32, u32)> {
    match info {
        ResolutionInfo::Discretes(resolutions) => resolutions
            .into_iter()
            .max_by_key(|&(width, height)| u64::from(width) * u64::from(height)),
        ResolutionInfo::Stepwise { max, .. } => Some(max),
    }
}

/// Shortest frame interval, intervals are fractions of a second.
fn pick_interval(info: IntervalInfo) -> Option<(u32, u32)> {
    match info {
        IntervalInfo::Discretes(intervals) => intervals
            .into_iter()
            .filter(|&(numerator, denominator)| numerator > 0 && denominator > 0)
            .min_by(|a, b| {
                (u64::from(a.0) * u64::from(b.1)).cmp(&(u64::from(b.0) * u64::from(a.1)))
            }),
        IntervalInfo::Stepwise { min, .. } => Some(min),
    }
}

fn log_supported_formats(cam: &Camera, format: &str) {
    let formats: Vec<_> = cam.formats().filter_map(Result::ok).collect();
    log::debug!(
        "Supported formats: {:?}, using format {:?}",
        formats,
        format
    );
}
