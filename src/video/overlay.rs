//! # Detection Overlay
//!
//! Draws detection boxes and labels onto a decoded frame. The box is a
//! two-pixel hollow rectangle; the label (`name confidence`) renders on
//! a filled background above the box when a font is configured, and is
//! skipped entirely otherwise.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::detect::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_HEIGHT: u32 = 16;
const LABEL_SCALE: f32 = 14.0;

/// Draws detection results onto frames.
pub struct OverlayPainter {
    font: Option<FontVec>,
}

impl OverlayPainter {
    /// Load the label font if a path is configured. A missing or
    /// invalid font downgrades to box-only overlays.
    #[must_use]
    pub fn new(font_path: &str) -> Self {
        let font = if font_path.is_empty() {
            None
        } else {
            match std::fs::read(font_path) {
                Ok(bytes) => match FontVec::try_from_vec(bytes) {
                    Ok(font) => Some(font),
                    Err(err) => {
                        warn!("Invalid overlay font {font_path}: {err}, labels disabled");
                        None
                    }
                },
                Err(err) => {
                    warn!("Cannot read overlay font {font_path}: {err}, labels disabled");
                    None
                }
            }
        };
        Self { font }
    }

    #[must_use]
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw all detections onto the frame.
    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection]) {
        for detection in detections {
            self.draw_one(image, detection);
        }
    }

    fn draw_one(&self, image: &mut RgbImage, detection: &Detection) {
        let (width, height) = image.dimensions();

        let x1 = detection.bbox[0].clamp(0.0, (width - 1) as f32) as i32;
        let y1 = detection.bbox[1].clamp(0.0, (height - 1) as f32) as i32;
        let x2 = detection.bbox[2].clamp(0.0, (width - 1) as f32) as i32;
        let y2 = detection.bbox[3].clamp(0.0, (height - 1) as f32) as i32;
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        // Rect width/height are pixel counts, so the right/bottom edges
        // land exactly on x2/y2
        let rect = Rect::at(x1, y1).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
        // second pass one pixel in for a 2px stroke
        if x2 - x1 >= 2 && y2 - y1 >= 2 {
            let inner = Rect::at(x1 + 1, y1 + 1).of_size((x2 - x1 - 1) as u32, (y2 - y1 - 1) as u32);
            draw_hollow_rect_mut(image, inner, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let text = format!("{} {:.2}", detection.label, detection.confidence);
            let label_y = (y1 - LABEL_HEIGHT as i32).max(0);
            let label_w = (text.len() as u32 * 8).min(width - x1 as u32);
            draw_filled_rect_mut(
                image,
                Rect::at(x1, label_y).of_size(label_w.max(1), LABEL_HEIGHT),
                BOX_COLOR,
            );
            draw_text_mut(
                image,
                LABEL_TEXT_COLOR,
                x1 + 2,
                label_y + 1,
                PxScale::from(LABEL_SCALE),
                font,
                &text,
            );
        }
    }
}
