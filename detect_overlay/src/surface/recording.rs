use std::sync::{Arc, Mutex, PoisonError};

use common::BoundingBox;

use super::{Color, OverlaySurface, SurfaceError};

/// A single operation issued against a surface.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear,
    StrokeRect {
        rect: BoundingBox,
        color: Color,
        line_width: u32,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        color: Color,
        font_size: f32,
    },
    Present,
}

/// Surface which only records the operations issued against it.
///
/// Clones share the same log, so a clone kept aside can inspect what was drawn after the
/// surface itself was moved into a renderer.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Arc<Mutex<Vec<DrawOp>>>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a copy of all operations recorded so far.
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the operations drawn since the last `Clear`, without the `Present` marker.
    pub fn last_frame(&self) -> Vec<DrawOp> {
        let ops = self.ops.lock().unwrap_or_else(PoisonError::into_inner);
        let start = ops
            .iter()
            .rposition(|op| *op == DrawOp::Clear)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        ops[start..]
            .iter()
            .filter(|op| **op != DrawOp::Present)
            .cloned()
            .collect()
    }

    fn push(&self, op: DrawOp) {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }
}

impl OverlaySurface for RecordingSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.push(DrawOp::Clear);
        Ok(())
    }

    fn stroke_rect(
        &mut self,
        rect: &BoundingBox,
        color: Color,
        line_width: u32,
    ) -> Result<(), SurfaceError> {
        self.push(DrawOp::StrokeRect {
            rect: *rect,
            color,
            line_width,
        });
        Ok(())
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        color: Color,
        font_size: f32,
    ) -> Result<(), SurfaceError> {
        self.push(DrawOp::FillText {
            text: text.to_owned(),
            x,
            y,
            color,
            font_size,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        self.push(DrawOp::Present);
        Ok(())
    }
}
