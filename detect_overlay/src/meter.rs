//! Frame rate logging for a running frame loop.
//!
use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::frame_loop::LoopStats;

/// Frames per second over one logging period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRates {
    pub detected: f32,
    pub rendered: f32,
}

impl FrameRates {
    /// Rates between two snapshots of the loop stats taken `elapsed` apart.
    pub fn between(earlier: &LoopStats, later: &LoopStats, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f32();
        let per_sec = |before: u64, after: u64| match secs > 0.0 {
            true => after.saturating_sub(before) as f32 / secs,
            false => 0.0,
        };
        Self {
            detected: per_sec(earlier.detected(), later.detected()),
            rendered: per_sec(earlier.rendered, later.rendered),
        }
    }
}

/// Log the frame rates of the loop behind `stats` every `period` until `cancel` fires.
pub fn spawn_rate_logger(
    stats: watch::Receiver<LoopStats>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.tick().await;

        let mut last = *stats.borrow();
        let mut last_at = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticks.tick() => {}
            }

            let current = *stats.borrow();
            let now = Instant::now();
            let rates = FrameRates::between(&last, &current, now - last_at);
            if rates.detected > 0.0 {
                log::info!("Detected frames per second: {:.2}", rates.detected);
            }
            if rates.rendered > 0.0 {
                log::info!("Rendered frames per second: {:.2}", rates.rendered);
            }

            last = current;
            last_at = now;
        }
    })
}
