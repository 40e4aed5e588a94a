//! The detect/render loop.
//!
//! Each iteration pulls the current frame from the source, waits for the detection service to
//! finish and renders the detections before waiting for the next display refresh. There is never
//! more than one detection in flight: if detection takes longer than a refresh period, the loop
//! simply runs at the pace of the detection service.
//!
//! The loop starts `Running` and ends `Stopped` when its cancellation token fires or the frame
//! source ends. Failed frame reads, detections and renders are logged and the loop carries on
//! with the next frame.
use std::time::Duration;

use async_trait::async_trait;
use common::FrameSource;
use tokio::{
    sync::watch,
    task::{JoinError, JoinHandle},
    time::{sleep_until, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{detector::DetectionService, renderer::OverlayRenderer, surface::OverlaySurface};

/// Frame-timing primitive of the host.
#[async_trait]
pub trait FrameClock: Send {
    /// Wait for the next display refresh.
    async fn next_frame(&mut self);
}

/// Clock ticking at a fixed display refresh rate.
///
/// Refreshes are spaced `period` apart, starting with the first call. `next_frame` always waits
/// for the first refresh after the call, refreshes missed while the loop was busy are skipped.
pub struct RefreshClock {
    period: Duration,
    epoch: Option<Instant>,
}

impl RefreshClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: None,
        }
    }

    /// Clock with `refresh_rate` ticks per second.
    pub fn with_rate(refresh_rate: u32) -> Self {
        Self::new(Duration::from_secs(1) / refresh_rate.max(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Get the first refresh strictly after `now`.
    fn next_refresh(&mut self, now: Instant) -> Instant {
        let epoch = *self.epoch.get_or_insert(now);
        let period = self.period.as_nanos().max(1);
        let ticks = (now - epoch).as_nanos() / period + 1;
        epoch + Duration::from_nanos((ticks * period) as u64)
    }
}

#[async_trait]
impl FrameClock for RefreshClock {
    async fn next_frame(&mut self) {
        let deadline = self.next_refresh(Instant::now());
        sleep_until(deadline).await;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What happened while the loop was running.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LoopStats {
    pub iterations: u64,
    pub rendered: u64,
    pub source_failures: u64,
    pub detect_failures: u64,
    pub render_failures: u64,
}

impl LoopStats {
    /// Frames the detection service got through, rendered or not.
    pub fn detected(&self) -> u64 {
        self.rendered + self.render_failures
    }
}

pub struct FrameLoop<S, D, T, C> {
    source: S,
    detector: D,
    renderer: OverlayRenderer<T>,
    clock: C,
    cancel: CancellationToken,
    stats: watch::Sender<LoopStats>,
}

impl<S, D, T, C> FrameLoop<S, D, T, C>
where
    S: FrameSource,
    D: DetectionService,
    T: OverlaySurface,
    C: FrameClock,
{
    pub fn new(source: S, detector: D, renderer: OverlayRenderer<T>, clock: C) -> Self {
        Self {
            source,
            detector,
            renderer,
            clock,
            cancel: CancellationToken::new(),
            stats: watch::channel(LoopStats::default()).0,
        }
    }

    /// Stop the loop when `cancel` fires.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Follow the stats of the loop, updated after every iteration.
    pub fn subscribe(&self) -> watch::Receiver<LoopStats> {
        self.stats.subscribe()
    }

    /// Run until cancelled or until the frame source ends.
    pub async fn run(mut self) -> LoopStats {
        let mut stats = LoopStats::default();
        log::info!("Frame loop running");

        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                frame = self.source.current_frame() => frame,
            };
            stats.iterations += 1;

            let frame = match frame {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("Frame source ended");
                    break;
                }
                Err(err) => {
                    log::warn!("Failed to get frame: {err}");
                    stats.source_failures += 1;
                    self.stats.send_replace(stats);
                    match self.wait_for_refresh().await {
                        true => continue,
                        false => break,
                    }
                }
            };

            let detections = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                detections = self.detector.detect(&frame) => detections,
            };

            match detections {
                Ok(detections) => {
                    log::debug!("Detected {} objects", detections.len());

                    match self.renderer.render(&detections) {
                        Ok(()) => stats.rendered += 1,
                        Err(err) => {
                            log::warn!("Failed to render frame, skipping it: {err}");
                            stats.render_failures += 1;
                        }
                    }
                }
                Err(err) => {
                    log::warn!("Detection failed: {err}");
                    stats.detect_failures += 1;
                }
            }
            self.stats.send_replace(stats);

            if !self.wait_for_refresh().await {
                break;
            }
        }

        self.stats.send_replace(stats);
        log::info!("Frame loop stopped: {stats:?}");
        stats
    }

    /// Wait for the next refresh, returns `false` if cancelled in the meantime.
    async fn wait_for_refresh(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.clock.next_frame() => true,
        }
    }
}

impl<S, D, T, C> FrameLoop<S, D, T, C>
where
    S: FrameSource + 'static,
    D: DetectionService + 'static,
    T: OverlaySurface + 'static,
    C: FrameClock + 'static,
{
    /// Run the loop on its own task.
    pub fn spawn(self) -> LoopHandle {
        let cancel = self.cancel_token();
        let join = tokio::spawn(self.run());
        LoopHandle { cancel, join }
    }
}

/// Handle to a spawned frame loop.
pub struct LoopHandle {
    cancel: CancellationToken,
    join: JoinHandle<LoopStats>,
}

impl LoopHandle {
    pub fn state(&self) -> LoopState {
        match self.join.is_finished() {
            true => LoopState::Stopped,
            false => LoopState::Running,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait for it to stop.
    pub async fn stop(self) -> Result<LoopStats, JoinError> {
        self.cancel.cancel();
        self.join.await
    }

    /// Wait for the loop to stop on its own.
    pub async fn join(self) -> Result<LoopStats, JoinError> {
        self.join.await
    }
}

#[cfg(test)]
mod test {

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use common::{BoundingBox, Detection, Frame, SourceError};
    use image::RgbImage;

    use super::*;
    use crate::{
        detector::DetectError,
        renderer::RenderStyle,
        source::StillSource,
        surface::{Color, RecordingSurface, SurfaceError},
    };

    #[derive(Debug, PartialEq)]
    enum Event {
        DetectStart,
        DetectEnd,
        Clear,
        Present,
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    /// Detector taking `delay` per frame and asserting it is never called concurrently.
    struct SlowDetector {
        delay: Duration,
        in_flight: AtomicUsize,
        events: EventLog,
    }

    #[async_trait]
    impl DetectionService for SlowDetector {
        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
            assert_eq!(self.in_flight.fetch_add(1, Ordering::SeqCst), 0);
            self.events.lock().unwrap().push(Event::DetectStart);

            tokio::time::sleep(self.delay).await;

            self.events.lock().unwrap().push(Event::DetectEnd);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![Detection::new(
                "person",
                0.9,
                BoundingBox::new(1.0, 20.0, 3.0, 4.0),
            )])
        }
    }

    struct LoggingSurface {
        events: EventLog,
    }

    impl OverlaySurface for LoggingSurface {
        fn dimensions(&self) -> (u32, u32) {
            (64, 48)
        }

        fn clear(&mut self) -> Result<(), SurfaceError> {
            self.events.lock().unwrap().push(Event::Clear);
            Ok(())
        }

        fn stroke_rect(&mut self, _: &BoundingBox, _: Color, _: u32) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn fill_text(
            &mut self,
            _: &str,
            _: f32,
            _: f32,
            _: Color,
            _: f32,
        ) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn present(&mut self) -> Result<(), SurfaceError> {
            self.events.lock().unwrap().push(Event::Present);
            Ok(())
        }
    }

    /// Surface on which every frame fails to render.
    struct BrokenSurface;

    impl OverlaySurface for BrokenSurface {
        fn dimensions(&self) -> (u32, u32) {
            (64, 48)
        }

        fn clear(&mut self) -> Result<(), SurfaceError> {
            Err(SurfaceError::MissingFont)
        }

        fn stroke_rect(&mut self, _: &BoundingBox, _: Color, _: u32) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn fill_text(
            &mut self,
            _: &str,
            _: f32,
            _: f32,
            _: Color,
            _: f32,
        ) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    /// Detector failing on every other call.
    #[derive(Default)]
    struct FlakyDetector {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DetectionService for FlakyDetector {
        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) % 2 {
                0 => Err(DetectError::Unavailable("flaky".into())),
                _ => Ok(vec![]),
            }
        }
    }

    /// Source failing on every frame.
    struct BrokenSource;

    #[async_trait]
    impl FrameSource for BrokenSource {
        async fn current_frame(&mut self) -> Result<Option<Frame>, SourceError> {
            Err(SourceError::Unavailable("unplugged".into()))
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|_| Arc::new(RgbImage::new(64, 48))).collect()
    }

    fn slow_detector(delay: Duration, events: &EventLog) -> SlowDetector {
        SlowDetector {
            delay,
            in_flight: AtomicUsize::new(0),
            events: Arc::clone(events),
        }
    }

    #[test]
    fn refresh_is_always_in_the_future() {
        let mut clock = RefreshClock::new(Duration::from_millis(10));
        let start = Instant::now();

        assert_eq!(clock.next_refresh(start), start + Duration::from_millis(10));
        assert_eq!(
            clock.next_refresh(start + Duration::from_millis(3)),
            start + Duration::from_millis(10)
        );
        // Exactly on a refresh waits for the one after
        assert_eq!(
            clock.next_refresh(start + Duration::from_millis(10)),
            start + Duration::from_millis(20)
        );
        // Missed refreshes are skipped
        assert_eq!(
            clock.next_refresh(start + Duration::from_millis(47)),
            start + Duration::from_millis(50)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn render_completes_before_next_detection() {
        let events: EventLog = Arc::default();
        let frame_loop = FrameLoop::new(
            StillSource::new(frames(5), false),
            slow_detector(Duration::from_millis(40), &events),
            OverlayRenderer::new(
                LoggingSurface {
                    events: Arc::clone(&events),
                },
                RenderStyle::default(),
            ),
            RefreshClock::with_rate(60),
        );

        let stats = frame_loop.run().await;
        assert_eq!(stats.rendered, 5);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4 * 5);
        for cycle in events.chunks(4) {
            assert_eq!(
                cycle,
                [
                    Event::DetectStart,
                    Event::DetectEnd,
                    Event::Clear,
                    Event::Present
                ]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fast_detection_runs_at_refresh_rate() {
        let handle = FrameLoop::new(
            StillSource::new(frames(1), true),
            slow_detector(Duration::ZERO, &Arc::default()),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(60),
        )
        .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let stats = handle.stop().await.unwrap();

        assert!((58..=61).contains(&stats.iterations), "{stats:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detection_throttles_the_loop() {
        let handle = FrameLoop::new(
            StillSource::new(frames(1), true),
            slow_detector(Duration::from_millis(100), &Arc::default()),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(60),
        )
        .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let stats = handle.stop().await.unwrap();

        // 100 ms detection plus the wait for the next refresh
        assert!((8..=10).contains(&stats.iterations), "{stats:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_loop() {
        let handle = FrameLoop::new(
            StillSource::new(frames(1), true),
            slow_detector(Duration::from_millis(5), &Arc::default()),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(30),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.state(), LoopState::Running);

        let cancel = handle.cancel_token();
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(handle.state(), LoopState::Stopped);

        let stats = handle.join().await.unwrap();
        assert!(stats.iterations > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detection_failures_do_not_stop_the_loop() {
        let stats = FrameLoop::new(
            StillSource::new(frames(6), false),
            FlakyDetector::default(),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(60),
        )
        .run()
        .await;

        assert_eq!(
            stats,
            LoopStats {
                iterations: 7,
                rendered: 3,
                detect_failures: 3,
                ..Default::default()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_the_final_stats() {
        let frame_loop = FrameLoop::new(
            StillSource::new(frames(6), false),
            FlakyDetector::default(),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(60),
        );
        let updates = frame_loop.subscribe();

        let stats = frame_loop.run().await;
        assert_eq!(*updates.borrow(), stats);
        assert_eq!(stats.detected(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn render_failures_skip_the_frame() {
        let stats = FrameLoop::new(
            StillSource::new(frames(3), false),
            slow_detector(Duration::ZERO, &Arc::default()),
            OverlayRenderer::new(BrokenSurface, RenderStyle::default()),
            RefreshClock::with_rate(60),
        )
        .run()
        .await;

        assert_eq!(stats.render_failures, 3);
        assert_eq!(stats.rendered, 0);
        assert_eq!(stats.detected(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn source_failures_are_retried_until_cancelled() {
        let handle = FrameLoop::new(
            BrokenSource,
            FlakyDetector::default(),
            OverlayRenderer::new(RecordingSurface::new(64, 48), RenderStyle::default()),
            RefreshClock::with_rate(10),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(450)).await;
        let stats = handle.stop().await.unwrap();

        assert_eq!(stats.source_failures, stats.iterations);
        assert!(stats.source_failures >= 4, "{stats:?}");
        assert_eq!(stats.rendered, 0);
    }
}
