//! Drop detections by score and category.
//!
use std::collections::HashSet;

use async_trait::async_trait;
use common::{Detection, Frame};

use super::{DetectError, DetectionService};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionFilter {
    /// Detections scoring below this value are dropped.
    pub min_confidence: f32,
    /// Categories to keep, all categories are kept if `None`.
    pub categories: Option<HashSet<String>>,
}

impl DetectionFilter {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence,
            categories: None,
        }
    }

    /// Only keep detections of the given categories. An empty list keeps all categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: HashSet<String> = categories.into_iter().map(Into::into).collect();
        self.categories = (!categories.is_empty()).then_some(categories);
        self
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence >= self.min_confidence
            && self
                .categories
                .as_ref()
                .map_or(true, |categories| categories.contains(&detection.category))
    }

    pub fn apply(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.retain(|detection| self.accepts(detection));
        detections
    }
}

/// Detection service passing the results of another service through a filter.
pub struct Filtered<D> {
    inner: D,
    filter: DetectionFilter,
}

impl<D: DetectionService> Filtered<D> {
    pub fn new(inner: D, filter: DetectionFilter) -> Self {
        Self { inner, filter }
    }
}

#[async_trait]
impl<D: DetectionService> DetectionService for Filtered<D> {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let detections = self.inner.detect(frame).await?;
        Ok(self.filter.apply(detections))
    }
}
