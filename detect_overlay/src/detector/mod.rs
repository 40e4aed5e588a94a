//! Detection services turning a frame into a list of detections.
//!
use std::sync::Arc;

use async_trait::async_trait;
use common::{Detection, Frame};
use thiserror::Error;
use tract_onnx::prelude::TractError;

pub mod filter;
pub mod nms;
pub mod ssd;

pub use filter::{DetectionFilter, Filtered};
pub use ssd::{SsdDetector, SsdParams};

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model inference failed: {0:#}")]
    Inference(TractError),
    #[error("Unexpected model output: {0}")]
    Output(String),
    #[error("Inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Detection service unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous object detection on single frames.
#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;
}

#[async_trait]
impl<T: DetectionService + ?Sized> DetectionService for Arc<T> {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        (**self).detect(frame).await
    }
}
