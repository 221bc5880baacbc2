//! # YOLO Detector
//!
//! YOLOv8-style object detection through ONNX Runtime. The model takes
//! a letterboxed 640x640 RGB tensor and produces `[1, 84, 8400]`
//! predictions: four box coordinates in center format followed by 80
//! per-class confidences for each of the 8400 candidate boxes.

use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

use crate::error::{PilotError, Result};
use crate::video::stream::VideoFrame;

use super::{class_name, Detection, Detector, COCO_CLASSES};

const YOLO_INPUT_SIZE: usize = 640;
const YOLO_PREDICTIONS: usize = 8400;

/// Candidates below this confidence are discarded before NMS; the
/// pipeline applies the operator-facing threshold on what remains.
const CANDIDATE_FLOOR: f32 = 0.25;

const NMS_IOU_THRESHOLD: f32 = 0.45;

/// ONNX-backed YOLO detector.
pub struct YoloDetector {
    session: Session,
}

impl YoloDetector {
    /// Load a YOLO model from an ONNX file.
    pub fn load(model_path: &str) -> Result<Self> {
        info!("Loading detection model: {model_path}");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| PilotError::Detection(format!("model load failed: {e}")))?;

        info!("Detection model ready");
        Ok(Self { session })
    }

    /// Letterbox the frame into a 640x640 canvas, normalize to 0..1 and
    /// lay it out channel-first. Returns the tensor plus the scale and
    /// padding needed to map boxes back to frame coordinates.
    fn preprocess(&self, frame: &VideoFrame) -> Result<(Vec<f32>, f32, f32, f32)> {
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let target = YOLO_INPUT_SIZE;

        if frame.data.len() < src_w * src_h * 3 {
            return Err(PilotError::Detection(format!(
                "frame buffer too small for {src_w}x{src_h}"
            )));
        }

        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale) as usize).max(1);
        let scaled_h = ((src_h as f32 * scale) as usize).max(1);
        let pad_x = (target - scaled_w) as f32 / 2.0;
        let pad_y = (target - scaled_h) as f32 / 2.0;

        let resized = resize_bilinear(&frame.data, src_w, src_h, scaled_w, scaled_h);

        // gray letterbox background
        let mut canvas = vec![114u8; target * target * 3];
        for y in 0..scaled_h {
            let dst_y = y + pad_y as usize;
            let src_start = y * scaled_w * 3;
            let dst_start = (dst_y * target + pad_x as usize) * 3;
            canvas[dst_start..dst_start + scaled_w * 3]
                .copy_from_slice(&resized[src_start..src_start + scaled_w * 3]);
        }

        // HWC -> CHW, normalized
        let mut input = vec![0.0f32; 3 * target * target];
        for c in 0..3 {
            for h in 0..target {
                for w in 0..target {
                    let hwc_idx = (h * target + w) * 3 + c;
                    let chw_idx = c * target * target + h * target + w;
                    input[chw_idx] = canvas[hwc_idx] as f32 / 255.0;
                }
            }
        }

        Ok((input, scale, pad_x, pad_y))
    }

    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let shape = [1usize, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))
                .map_err(|e| PilotError::Detection(format!("input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => input_value])
            .map_err(|e| PilotError::Detection(format!("inference failed: {e}")))?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PilotError::Detection(format!("output tensor: {e}")))?;

        Ok(data.to_vec())
    }

    fn postprocess(
        &self,
        output: &[f32],
        scale: f32,
        pad_x: f32,
        pad_y: f32,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();

        for i in 0..YOLO_PREDICTIONS {
            let cx = output[i];
            let cy = output[YOLO_PREDICTIONS + i];
            let w = output[YOLO_PREDICTIONS * 2 + i];
            let h = output[YOLO_PREDICTIONS * 3 + i];

            let mut max_conf = 0.0f32;
            let mut best_class = 0;
            for c in 0..COCO_CLASSES.len() {
                let conf = output[YOLO_PREDICTIONS * (4 + c) + i];
                if conf > max_conf {
                    max_conf = conf;
                    best_class = c;
                }
            }

            if max_conf < CANDIDATE_FLOOR {
                continue;
            }

            // center format to corners, then undo the letterbox
            let x1 = (cx - w / 2.0 - pad_x) / scale;
            let y1 = (cy - h / 2.0 - pad_y) / scale;
            let x2 = (cx + w / 2.0 - pad_x) / scale;
            let y2 = (cy + h / 2.0 - pad_y) / scale;

            detections.push(Detection {
                bbox: [x1, y1, x2, y2],
                confidence: max_conf,
                class_id: best_class,
                label: class_name(best_class).to_string(),
            });
        }

        nms(detections, NMS_IOU_THRESHOLD)
    }
}

impl Detector for YoloDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.preprocess(frame)?;
        let output = self.infer(&input)?;

        let expected = (4 + COCO_CLASSES.len()) * YOLO_PREDICTIONS;
        if output.len() < expected {
            return Err(PilotError::Detection(format!(
                "unexpected model output: {} values, need {expected}",
                output.len()
            )));
        }

        let detections = self.postprocess(&output, scale, pad_x, pad_y);
        debug!("Detected {} objects", detections.len());
        Ok(detections)
    }
}

fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;
            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);
            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }
    dst
}

fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let overlaps = keep
            .iter()
            .any(|kept| iou(&kept.bbox, &candidate.bbox) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], confidence: f32) -> Detection {
        Detection {
            bbox,
            confidence,
            class_id: 0,
            label: "person".to_string(),
        }
    }

    // ==================== IoU Tests ====================

    #[test]
    fn test_iou_identical_boxes() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 0.0, 15.0, 10.0];
        // intersection 50, union 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    // ==================== NMS Tests ====================

    #[test]
    fn test_nms_suppresses_overlapping_weaker_box() {
        let detections = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.9),
            det([1.0, 1.0, 11.0, 11.0], 0.6),
        ];
        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let detections = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.9),
            det([50.0, 50.0, 60.0, 60.0], 0.6),
        ];
        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_orders_by_confidence() {
        let detections = vec![
            det([50.0, 50.0, 60.0, 60.0], 0.6),
            det([0.0, 0.0, 10.0, 10.0], 0.9),
        ];
        let kept = nms(detections, 0.45);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(nms(Vec::new(), 0.45).is_empty());
    }

    // ==================== Resize Tests ====================

    #[test]
    fn test_resize_identity() {
        let src = vec![
            10, 20, 30, 40, 50, 60, //
            70, 80, 90, 100, 110, 120,
        ];
        let dst = resize_bilinear(&src, 2, 2, 2, 2);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_resize_uniform_image_stays_uniform() {
        let src = vec![128u8; 4 * 4 * 3];
        let dst = resize_bilinear(&src, 4, 4, 8, 8);
        assert_eq!(dst.len(), 8 * 8 * 3);
        assert!(dst.iter().all(|&v| v == 128));
    }
}
