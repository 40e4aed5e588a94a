//! Run object detection on a video stream and draw the detections onto an overlay, frame by
//! frame.
pub mod app;
pub mod config;
pub mod detector;
pub mod frame_loop;
pub mod labels;
pub mod meter;
pub mod renderer;
pub mod source;
pub mod surface;
pub mod system;

pub use app::{prime_source, run_overlay};
pub use config::OverlayArgs;
pub use frame_loop::{FrameLoop, LoopHandle, LoopState, LoopStats, RefreshClock};
pub use renderer::{OverlayRenderer, RenderStyle};
