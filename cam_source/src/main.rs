use anyhow::{Context, Result};
use cam_source::{parse_resolution, CameraConfig, CameraSource};
use clap::Parser;
use detect_overlay::{run_overlay, OverlayArgs};
use env_logger::TimestampPrecision;

/// Run the detection overlay on a live camera stream.
#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Video device to capture from
    #[clap(long, default_value = "/dev/video0")]
    device: String,

    /// FourCC pixel format of the camera stream, MJPG or RGB3
    #[clap(long, default_value = "MJPG")]
    format: String,

    /// Capture resolution as WIDTHxHEIGHT [default: highest supported]
    #[clap(long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Capture frame rate in frames per second [default: highest supported]
    #[clap(long, value_parser = clap::value_parser!(u32).range(1..))]
    frame_rate: Option<u32>,

    #[clap(flatten)]
    overlay: OverlayArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let config = CameraConfig {
        device: args.device.clone(),
        format: args.format.clone(),
        resolution: args.resolution,
        interval: args.frame_rate.map(|fps| (1, fps)),
    };
    let source = CameraSource::open(config)
        .await
        .with_context(|| format!("failed to open camera {}", args.device))?;

    let stats = run_overlay(source, &args.overlay).await?;
    log::info!("Done: {stats:?}");

    Ok(())
}
