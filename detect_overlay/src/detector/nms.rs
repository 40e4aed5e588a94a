//! Non-maximum suppression of overlapping candidate boxes.
//!

/// Positive additive constant to avoid divide-by-zero.
const EPS: f32 = 1.0e-7;

/// Raw detection of the model before suppression.
///
/// The box is given as `[x_top_left, y_top_left, x_bottom_right, y_bottom_right]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Run non-maximum-suppression on candidate bounding boxes.
///
/// Start with the most confident bounding box and iterate over all other bounding boxes in the
/// order of sinking confidence. Grow the vector of selected bounding boxes by adding only those
/// candidates which do not have an IoU above `max_iou` with an already chosen bounding box of the
/// same class. The selection is returned in descending order of confidence.
pub fn non_maximum_suppression(mut candidates: Vec<Candidate>, max_iou: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));

    let mut selected: Vec<Candidate> = vec![];
    'candidates: while let Some(candidate) = candidates.pop() {
        // Check for overlap with any of the selected bboxes of the same class
        for chosen in selected.iter() {
            if chosen.class_id == candidate.class_id && iou(&candidate.bbox, &chosen.bbox) > max_iou
            {
                continue 'candidates;
            }
        }

        selected.push(candidate);
    }

    selected
}

/// Calculate the intersection-over-union metric for two bounding boxes.
pub fn iou(bbox_a: &[f32; 4], bbox_b: &[f32; 4]) -> f32 {
    // If the boxes do not overlap, the top left corner of the overlap box ends up below or to the
    // right of its bottom right corner and the area is zero.
    let overlap_box: [f32; 4] = [
        f32::max(bbox_a[0], bbox_b[0]),
        f32::max(bbox_a[1], bbox_b[1]),
        f32::min(bbox_a[2], bbox_b[2]),
        f32::min(bbox_a[3], bbox_b[3]),
    ];

    let overlap_area = bbox_area(&overlap_box);

    // Avoid division-by-zero with `EPS`
    overlap_area / (bbox_area(bbox_a) + bbox_area(bbox_b) - overlap_area + EPS)
}

/// Calculate the area enclosed by a bounding box given by two corner points.
///
/// If the bottom-right point lies above or to the left of the top-left point, the area is zero.
fn bbox_area(bbox: &[f32; 4]) -> f32 {
    let width = bbox[2] - bbox[0];
    let height = bbox[3] - bbox[1];
    if width < 0.0 || height < 0.0 {
        return 0.0;
    }

    width * height
}

#[cfg(test)]
mod test {

    use super::*;

    fn candidate(class_id: usize, confidence: f32, bbox: [f32; 4]) -> Candidate {
        Candidate {
            class_id,
            confidence,
            bbox,
        }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 0.5, 0.5];
        let b = [0.6, 0.6, 0.9, 0.9];
        assert!((iou(&a, &a) - 1.0).abs() < 1.0e-4);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = [0.0, 0.0, 0.2, 0.1];
        let b = [0.1, 0.0, 0.3, 0.1];
        // Overlap 0.01, union 0.03
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1.0e-4);
    }

    #[test]
    fn suppress_overlapping_boxes_of_same_class() {
        let candidates = vec![
            candidate(1, 0.6, [0.1, 0.1, 0.5, 0.5]),
            candidate(1, 0.9, [0.12, 0.1, 0.5, 0.52]),
            candidate(1, 0.7, [0.6, 0.6, 0.9, 0.9]),
            // Same place, other class
            candidate(3, 0.8, [0.1, 0.1, 0.5, 0.5]),
        ];

        let selected = non_maximum_suppression(candidates, 0.5);

        let confidences: Vec<f32> = selected.iter().map(|c| c.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn nothing_to_suppress() {
        assert!(non_maximum_suppression(vec![], 0.5).is_empty());
    }
}
