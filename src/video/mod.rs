//! # Video Module
//!
//! The perception half of the pilot loop.
//!
//! This module handles:
//! - Receiving and decoding the H.264 downlink ([`stream`])
//! - The per-tick frame pipeline: fetch, detect, overlay, emit
//! - Drawing detection overlays ([`overlay`])

pub mod overlay;
pub mod stream;

use image::RgbImage;
use tokio::sync::watch;
use tracing::warn;

use crate::detect::{Detection, Detector};

use overlay::OverlayPainter;
use stream::VideoFrame;

/// The per-tick frame pipeline.
///
/// Each tick runs FETCH → DETECT → OVERLAY → EMIT:
///
/// - FETCH pulls the newest decoded frame from the latest-wins slot and
///   never blocks; with no new frame since the last tick the whole tick
///   is skipped and the caller keeps its previous image on screen.
/// - DETECT runs only when a detector is configured. A detector fault
///   is logged and the raw frame still flows through — the overlay
///   stage simply has nothing to draw.
/// - Rescheduling is owned by the control loop's fixed-delay interval,
///   so slow detection drops frames instead of accumulating lag.
pub struct FramePipeline {
    frames: watch::Receiver<Option<VideoFrame>>,
    detector: Option<Box<dyn Detector>>,
    painter: OverlayPainter,
    confidence_threshold: f32,
}

impl FramePipeline {
    #[must_use]
    pub fn new(
        frames: watch::Receiver<Option<VideoFrame>>,
        detector: Option<Box<dyn Detector>>,
        painter: OverlayPainter,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            frames,
            detector,
            painter,
            confidence_threshold,
        }
    }

    /// Run one pipeline tick. Returns the image to display, or `None`
    /// when no new frame arrived (or the frame was invalid) — the
    /// previously displayed image then stays up, never a blank.
    pub fn tick(&mut self) -> Option<RgbImage> {
        // FETCH
        if !self.frames.has_changed().unwrap_or(false) {
            return None;
        }
        let frame = self.frames.borrow_and_update().clone()?;

        // DETECT
        let detections = self.run_detection(&frame);

        // OVERLAY + EMIT
        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.data.len() != expected {
            warn!(
                "Dropped malformed frame #{}: {} bytes for {}x{}",
                frame.seq,
                frame.data.len(),
                frame.width,
                frame.height
            );
            return None;
        }
        let mut image = RgbImage::from_raw(frame.width, frame.height, frame.data)?;
        self.painter.draw(&mut image, &detections);
        Some(image)
    }

    fn run_detection(&mut self, frame: &VideoFrame) -> Vec<Detection> {
        let Some(detector) = self.detector.as_mut() else {
            return Vec::new();
        };

        match detector.detect(frame) {
            Ok(detections) => detections
                .into_iter()
                .filter(|d| d.confidence >= self.confidence_threshold)
                .collect(),
            Err(err) => {
                // the raw frame is still emitted
                warn!("Detection failed on frame #{}: {err}", frame.seq);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::mocks::MockDetector;
    use image::Rgb;

    fn frame(seq: u64) -> VideoFrame {
        VideoFrame {
            data: vec![0u8; 64 * 64 * 3],
            width: 64,
            height: 64,
            seq,
        }
    }

    fn detection(confidence: f32) -> Detection {
        Detection {
            bbox: [8.0, 8.0, 32.0, 32.0],
            confidence,
            class_id: 0,
            label: "person".to_string(),
        }
    }

    fn pipeline(
        detector: Option<Box<dyn Detector>>,
    ) -> (watch::Sender<Option<VideoFrame>>, FramePipeline) {
        let (tx, rx) = watch::channel(None);
        let pipeline = FramePipeline::new(rx, detector, OverlayPainter::new(""), 0.5);
        (tx, pipeline)
    }

    #[test]
    fn test_tick_without_frame_emits_nothing() {
        let (_tx, mut pipeline) = pipeline(None);
        assert!(pipeline.tick().is_none());
    }

    #[test]
    fn test_tick_emits_new_frame() {
        let (tx, mut pipeline) = pipeline(None);
        tx.send(Some(frame(1))).unwrap();

        let image = pipeline.tick().expect("frame emitted");
        assert_eq!(image.dimensions(), (64, 64));
    }

    #[test]
    fn test_stale_frame_not_re_emitted() {
        let (tx, mut pipeline) = pipeline(None);
        tx.send(Some(frame(1))).unwrap();

        assert!(pipeline.tick().is_some());
        // no new frame since the last tick: nothing emitted, the
        // previously displayed image stays unchanged
        assert!(pipeline.tick().is_none());

        tx.send(Some(frame(2))).unwrap();
        assert!(pipeline.tick().is_some());
    }

    #[test]
    fn test_detections_are_overlaid() {
        let detector = MockDetector::returning(vec![detection(0.9)]);
        let (tx, mut pipeline) = pipeline(Some(Box::new(detector)));
        tx.send(Some(frame(1))).unwrap();

        let image = pipeline.tick().expect("frame emitted");
        assert_eq!(*image.get_pixel(8, 8), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_low_confidence_detections_filtered() {
        let detector = MockDetector::returning(vec![detection(0.3)]);
        let (tx, mut pipeline) = pipeline(Some(Box::new(detector)));
        tx.send(Some(frame(1))).unwrap();

        let image = pipeline.tick().expect("frame emitted");
        // below the 0.5 threshold: no box drawn
        assert_eq!(*image.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_detector_fault_still_emits_raw_frame() {
        let detector = MockDetector::failing();
        let (tx, mut pipeline) = pipeline(Some(Box::new(detector)));
        tx.send(Some(frame(1))).unwrap();

        let image = pipeline.tick().expect("raw frame emitted despite fault");
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let (tx, mut pipeline) = pipeline(None);
        tx.send(Some(VideoFrame {
            data: vec![0u8; 10],
            width: 64,
            height: 64,
            seq: 1,
        }))
        .unwrap();

        assert!(pipeline.tick().is_none());
    }

    #[test]
    fn test_latest_frame_wins() {
        let (tx, mut pipeline) = pipeline(None);
        // two frames arrive between ticks; only the newest is seen
        tx.send(Some(frame(1))).unwrap();
        tx.send(Some(frame(2))).unwrap();

        assert!(pipeline.tick().is_some());
        assert!(pipeline.tick().is_none());
    }
}
