//! Detections produced by a detection service for a single frame.
//!

/// Axis-aligned box in pixel coordinates of the video frame.
///
/// The origin is the top left corner of the frame, `x` grows to the right and `y` grows
/// downwards.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its top-left and bottom-right corner points.
    ///
    /// Corners given in the wrong order produce an empty box instead of a negative size.
    pub fn from_corners(x_tl: f32, y_tl: f32, x_br: f32, y_br: f32) -> Self {
        Self {
            x: x_tl,
            y: y_tl,
            width: (x_br - x_tl).max(0.0),
            height: (y_br - y_tl).max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// One labeled, scored, localized object found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub category: String,
    /// Score in `[0, 1]`.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(category: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            category: category.into(),
            confidence,
            bounding_box,
        }
    }
}
