//! Class names of the detection model.
//!
use std::path::Path;

/// Names of the 80 COCO object categories, in the order of the model's class ids.
const COCO_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Lookup from class id to category name.
///
/// Class id 0 is the background class, class id `k` maps to the `k`-th name.
#[derive(Clone, Debug, PartialEq)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    /// Parse a class names file with one name per line.
    ///
    /// Empty lines in between keep their class id unnamed, trailing empty lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut names: Vec<String> = text.lines().map(|line| line.trim().to_owned()).collect();
        while names.last().map_or(false, |name| name.is_empty()) {
            names.pop();
        }
        Self { names }
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// The COCO category names most pretrained detection models are trained on.
    pub fn coco() -> Self {
        Self {
            names: COCO_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Get the category name of a class id, `class <id>` if it has no name.
    pub fn name(&self, class_id: usize) -> String {
        class_id
            .checked_sub(1)
            .and_then(|idx| self.names.get(idx))
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("class {class_id}"))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::coco()
    }
}
