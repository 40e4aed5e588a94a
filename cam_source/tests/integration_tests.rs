use std::time::Duration;

use async_trait::async_trait;
use cam_source::{CameraError, CameraSource};
use common::{BoundingBox, Detection, Frame};
use detect_overlay::{
    detector::{DetectError, DetectionService},
    surface::{DrawOp, RecordingSurface},
    FrameLoop, LoopState, OverlayRenderer, RefreshClock, RenderStyle,
};
use image::{Rgb, RgbImage};

/// Reports a single object filling the top left quarter of the frame.
struct QuarterDetector;

#[async_trait]
impl DetectionService for QuarterDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let (width, height) = frame.dimensions();
        Ok(vec![Detection::new(
            "person",
            0.8,
            BoundingBox::new(0.0, 0.0, width as f32 / 2.0, height as f32 / 2.0),
        )])
    }
}

fn fake_camera() -> impl FnMut() -> Result<RgbImage, CameraError> {
    || {
        std::thread::sleep(Duration::from_millis(10));
        Ok(RgbImage::from_pixel(64, 48, Rgb([128, 128, 128])))
    }
}

/// Frames from the capture thread run through detection and end up on the overlay.
#[tokio::test]
async fn test_camera_overlay() -> Result<(), Box<dyn std::error::Error>> {
    let source = CameraSource::spawn(|| Ok(fake_camera())).await?;
    let surface = RecordingSurface::new(64, 48);
    let renderer = OverlayRenderer::new(surface.clone(), RenderStyle::default());

    let handle = FrameLoop::new(source, QuarterDetector, renderer, RefreshClock::with_rate(60))
        .spawn();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.state(), LoopState::Running);

    let stats = handle.stop().await?;
    assert!(stats.rendered > 0, "{stats:?}");
    assert_eq!(stats.source_failures, 0);

    let last_frame = surface.last_frame();
    assert_eq!(last_frame.len(), 2);
    assert!(matches!(
        &last_frame[0],
        DrawOp::StrokeRect { rect, .. } if *rect == BoundingBox::new(0.0, 0.0, 32.0, 24.0)
    ));

    Ok(())
}

/// The loop stops on its own once the camera is gone for good.
#[tokio::test]
async fn test_unplugged_camera_stops_loop() -> Result<(), Box<dyn std::error::Error>> {
    let source = CameraSource::spawn(|| {
        let mut captured = 0;
        Ok(move || {
            captured += 1;
            match captured {
                1..=3 => Ok(RgbImage::new(64, 48)),
                _ => Err(CameraError::Unsupported("camera unplugged".to_owned())),
            }
        })
    })
    .await?;
    let renderer = OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default());

    let stats = FrameLoop::new(source, QuarterDetector, renderer, RefreshClock::with_rate(60))
        .run()
        .await;

    assert!(stats.iterations > 0, "{stats:?}");
    assert_eq!(stats.detect_failures, 0);

    Ok(())
}

#[cfg(feature = "v4l")]
#[tokio::test]
async fn test_camera_if_available() {
    match CameraSource::open(cam_source::CameraConfig::default()).await {
        Err(err) => println!("Could not open camera (maybe non available): {err}"),
        Ok(mut source) => {
            let frame = common::FrameSource::current_frame(&mut source).await;
            println!("Captured frame: {:?}", frame.map(|f| f.map(|f| f.dimensions())));
        }
    }
}
