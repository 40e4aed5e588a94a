//! Run the detection overlay on a directory of still images.
//!
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use detect_overlay::{run_overlay, source::StillSource, OverlayArgs};
use env_logger::TimestampPrecision;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Directory with the images to play back as video frames
    #[clap(long)]
    images: PathBuf,

    /// Start over after the last image instead of stopping
    #[clap(long)]
    repeat: bool,

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

    let source = StillSource::from_dir(&args.images, args.repeat)?;
    let stats = run_overlay(source, &args.overlay).await?;
    log::info!("Done: {stats:?}");

    Ok(())
}
