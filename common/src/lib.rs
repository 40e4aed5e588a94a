//! Common code shared between `detect_overlay` and `cam_source`.
pub mod detection;
pub mod source;

pub use detection::{BoundingBox, Detection};
pub use source::{Frame, FrameSource, SourceError};
