//! SSD-style object detection model run with `tract`.
//!
//! The model takes a `1x3xHxW` tensor with pixel values scaled to `[-1, 1]` and produces two
//! outputs:
//! - scores of shape `1xNxC`, one row of class scores per anchor with class 0 as background
//! - boxes of shape `1xNx4`, normalized `[x_top_left, y_top_left, x_bottom_right, y_bottom_right]`
use std::{path::Path, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use common::{BoundingBox, Detection, Frame};
use image::RgbImage;
use tract_onnx::prelude::*;

use super::{
    nms::{non_maximum_suppression, Candidate},
    DetectError, DetectionService,
};
use crate::labels::Labels;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Mean and spread of the MobileNet-SSD input normalization.
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5;

#[derive(Clone, Debug, PartialEq)]
pub struct SsdParams {
    pub input_width: u32,
    pub input_height: u32,
    /// Candidates at or below this score are dropped before suppression.
    pub min_confidence: f32,
    /// Maximum overlap of two boxes of the same class before the less confident one is dropped.
    pub max_iou: f32,
}

impl Default for SsdParams {
    fn default() -> Self {
        Self {
            input_width: 320,
            input_height: 320,
            min_confidence: 0.5,
            max_iou: 0.4,
        }
    }
}

pub struct SsdDetector {
    model: Arc<NnModel>,
    params: Arc<SsdParams>,
    labels: Arc<Labels>,
}

impl SsdDetector {
    /// Load and optimize the model from an `.onnx` file.
    pub fn load(
        path: impl AsRef<Path>,
        params: SsdParams,
        labels: Labels,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let input_fact = InferenceFact::dt_shape(
            f32::datum_type(),
            tvec!(
                1,
                3,
                params.input_height as usize,
                params.input_width as usize
            ),
        );
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read model {}", path.display()))?
            .with_input_fact(0, input_fact)?
            .into_optimized()?
            .into_runnable()?;

        log::info!(
            "Loaded model {} with input {}x{}",
            path.display(),
            params.input_width,
            params.input_height
        );

        Ok(Self {
            model: Arc::new(model),
            params: Arc::new(params),
            labels: Arc::new(labels),
        })
    }
}

#[async_trait]
impl DetectionService for SsdDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let model = Arc::clone(&self.model);
        let params = Arc::clone(&self.params);
        let labels = Arc::clone(&self.labels);
        let frame = Arc::clone(frame);

        // Inference is CPU bound, keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let input = preproc(&frame, params.input_width, params.input_height);
            let outputs = model
                .run(tvec!(input.into()))
                .map_err(DetectError::Inference)?;
            if outputs.len() < 2 {
                return Err(DetectError::Output(format!(
                    "expected scores and boxes, got {} outputs",
                    outputs.len()
                )));
            }
            postproc(&outputs[0], &outputs[1], frame.dimensions(), &params, &labels)
        })
        .await?
    }
}

/// Resize the frame to the model input and convert it to a normalized NCHW tensor.
pub fn preproc(frame: &RgbImage, width: u32, height: u32) -> Tensor {
    let resized: RgbImage =
        image::imageops::resize(frame, width, height, image::imageops::FilterType::Triangle);

    tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| (resized[(x as _, y as _)][c] as f32 - PIXEL_MEAN) / PIXEL_STD,
    )
    .into()
}

/// Turn raw model outputs into detections in pixel coordinates of a frame of `frame_dims`.
pub fn postproc(
    scores: &Tensor,
    boxes: &Tensor,
    frame_dims: (u32, u32),
    params: &SsdParams,
    labels: &Labels,
) -> Result<Vec<Detection>, DetectError> {
    let scores = scores
        .to_array_view::<f32>()
        .map_err(DetectError::Inference)?
        .into_dimensionality::<tract_ndarray::Ix3>()
        .map_err(|e| DetectError::Output(format!("scores: {e}")))?;
    let boxes = boxes
        .to_array_view::<f32>()
        .map_err(DetectError::Inference)?
        .into_dimensionality::<tract_ndarray::Ix3>()
        .map_err(|e| DetectError::Output(format!("boxes: {e}")))?;

    let (num_anchors, num_classes) = (scores.shape()[1], scores.shape()[2]);
    if boxes.shape()[1] != num_anchors || boxes.shape()[2] != 4 {
        return Err(DetectError::Output(format!(
            "boxes of shape {:?} do not match scores of shape {:?}",
            boxes.shape(),
            scores.shape()
        )));
    }

    let mut candidates = vec![];
    for anchor in 0..num_anchors {
        // Best class per anchor, skipping the background class
        let best = (1..num_classes)
            .map(|class_id| (class_id, scores[[0, anchor, class_id]]))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((class_id, confidence)) = best {
            if confidence > params.min_confidence {
                let bbox = [0, 1, 2, 3].map(|i| boxes[[0, anchor, i]].clamp(0.0, 1.0));
                candidates.push(Candidate {
                    class_id,
                    confidence,
                    bbox,
                });
            }
        }
    }

    let (width, height) = (frame_dims.0 as f32, frame_dims.1 as f32);
    let detections = non_maximum_suppression(candidates, params.max_iou)
        .into_iter()
        .map(|candidate| {
            let [x_tl, y_tl, x_br, y_br] = candidate.bbox;
            Detection::new(
                labels.name(candidate.class_id),
                candidate.confidence,
                BoundingBox::from_corners(x_tl * width, y_tl * height, x_br * width, y_br * height),
            )
        })
        .collect();

    Ok(detections)
}
