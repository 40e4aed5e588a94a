//! Wire a frame source, the detection model and the overlay together.
//!
use anyhow::{Context, Result};
use common::FrameSource;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    config::OverlayArgs,
    detector::{Filtered, SsdDetector},
    frame_loop::{FrameLoop, LoopStats, RefreshClock},
    meter::spawn_rate_logger,
    renderer::OverlayRenderer,
    source::Primed,
    surface::ImageSurface,
    system::SysinfoMonitor,
};

/// Get the first frame of `source` for the size of the overlay.
///
/// The frame is handed out again by the returned source, so the loop detects on it as well.
pub async fn prime_source<S: FrameSource>(source: S) -> Result<(Primed<S>, (u32, u32))> {
    let (source, first_frame) = Primed::read_first(source)
        .await?
        .context("frame source ended before delivering a frame")?;
    Ok((source, first_frame.dimensions()))
}

/// Run detection on `source` until it ends or the process is asked to shut down.
///
/// Loading the model, labels or font and getting the first frame are startup steps, a failure
/// in any of them is returned before the loop starts.
pub async fn run_overlay<S>(source: S, args: &OverlayArgs) -> Result<LoopStats>
where
    S: FrameSource + 'static,
{
    let labels = args.load_labels()?;
    let model = SsdDetector::load(&args.model, args.ssd_params(), labels)?;
    let detector = Filtered::new(model, args.detection_filter());
    let font = args.load_font()?;

    // The overlay has the native resolution of the video
    let (source, (width, height)) = prime_source(source).await?;
    log::info!("Video resolution {width}x{height}");

    let mut surface = ImageSurface::new(width, height).with_font(font);
    if let Some(path) = &args.snapshot {
        surface = surface.with_snapshot_path(path);
    }
    let mut renderer = OverlayRenderer::new(surface, args.render_style());
    if args.system_stats {
        renderer = renderer.with_load_monitor(SysinfoMonitor::new());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    log::info!("Shutdown signal received, stopping frame loop");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }

    let frame_loop = FrameLoop::new(
        source,
        detector,
        renderer,
        RefreshClock::with_rate(args.refresh_rate),
    )
    .with_cancel_token(cancel.clone());
    let meter = spawn_rate_logger(frame_loop.subscribe(), args.meter_period(), cancel.clone());
    let handle = frame_loop.spawn();

    let stats = handle.join().await?;

    // Loop is done, also stop the meter and the signal listener
    cancel.cancel();
    meter.await?;

    Ok(stats)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                log::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
