//! # Presentation Module
//!
//! The operator-facing window. Blits annotated frames, exposes the
//! currently-held key set for the keyboard input variant, and signals
//! shutdown when the operator closes the window or presses Escape.

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use tracing::debug;

use crate::error::{PilotError, Result};

/// The pilot's video window.
pub struct PilotWindow {
    window: Window,
}

impl PilotWindow {
    /// Open the window. Failure here is fatal at startup — without a
    /// presentation surface there is nothing to fly with.
    pub fn open(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| PilotError::Window(e.to_string()))?;
        // pacing is owned by the control loop's tick interval
        window.set_target_fps(0);
        Ok(Self { window })
    }

    /// Blit a frame. The buffer carries its own dimensions; minifb
    /// scales it to the window.
    pub fn present(&mut self, image: &RgbImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let buffer = rgb_to_0rgb(image);
        self.window
            .update_with_buffer(&buffer, width as usize, height as usize)
            .map_err(|e| PilotError::Window(e.to_string()))
    }

    /// Keep the event loop alive on ticks without a new frame; the
    /// previously presented buffer stays on screen.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// Keys currently held, for the keyboard sampler.
    #[must_use]
    pub fn held_keys(&self) -> Vec<Key> {
        self.window.get_keys()
    }

    /// The presentation layer's shutdown signal.
    #[must_use]
    pub fn close_requested(&self) -> bool {
        if !self.window.is_open() {
            debug!("Window closed");
            return true;
        }
        self.window.is_key_down(Key::Escape)
    }
}

/// Pack RGB8 pixels into the 0RGB u32 layout minifb expects.
#[must_use]
pub fn rgb_to_0rgb(image: &RgbImage) -> Vec<u32> {
    image
        .pixels()
        .map(|p| (u32::from(p.0[0]) << 16) | (u32::from(p.0[1]) << 8) | u32::from(p.0[2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb_packing() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0xAB, 0xCD, 0xEF]));
        image.put_pixel(1, 0, Rgb([0x00, 0xFF, 0x00]));

        let buffer = rgb_to_0rgb(&image);
        assert_eq!(buffer, vec![0x00AB_CDEF, 0x0000_FF00]);
    }

    #[test]
    fn test_packed_buffer_length() {
        let image = RgbImage::new(8, 4);
        assert_eq!(rgb_to_0rgb(&image).len(), 32);
    }
}
