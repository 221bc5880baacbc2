//! # Detection Module
//!
//! Object detection over decoded video frames.
//!
//! This module handles:
//! - The [`Detector`] trait the frame pipeline consumes
//! - The [`Detection`] result type (box, label, confidence)
//! - The ONNX-backed YOLO implementation in [`yolo`]
//!
//! Detectors are stateless per call: each processed frame produces a
//! fresh set of detections and nothing is tracked across frames.
//! Confidence filtering is the pipeline's job, not the detector's.

pub mod yolo;

use crate::error::Result;
use crate::video::stream::VideoFrame;

/// One detected object in original-frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// [x1, y1, x2, y2]
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

/// A detection model the frame pipeline can run a frame through.
pub trait Detector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>>;
}

/// COCO class names, indexed by YOLO class id.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Class id to human-readable label.
#[must_use]
pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("unknown")
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::PilotError;

    /// Scriptable detector for pipeline tests.
    pub struct MockDetector {
        pub detections: Vec<Detection>,
        pub fail: bool,
        pub calls: usize,
    }

    impl MockDetector {
        pub fn returning(detections: Vec<Detection>) -> Self {
            Self {
                detections,
                fail: false,
                calls: 0,
            }
        }

        pub fn failing() -> Self {
            Self {
                detections: Vec::new(),
                fail: true,
                calls: 0,
            }
        }
    }

    impl Detector for MockDetector {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Detection>> {
            self.calls += 1;
            if self.fail {
                return Err(PilotError::Detection("mock detector fault".into()));
            }
            Ok(self.detections.clone())
        }
    }
}
