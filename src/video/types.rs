use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Represents a single decoded video frame
///
/// This is a simple wrapper around an RGB image buffer with the pixel
/// conversions the feature extractors need.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Grayscale copy using BT.601 luma weights
    pub fn to_gray(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b] = self.buffer.get_pixel(x, y).0;
            Luma([luma(r, g, b)])
        })
    }
}

/// 0.299 R + 0.587 G + 0.114 B in 14-bit fixed point, rounded
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
    value.min(255) as u8
}

/// What is known about a video source before decoding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Path to the video file
    pub path: PathBuf,

    /// Frames per second
    pub frame_rate: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Native resolution
    pub width: u32,
    pub height: u32,

    /// Whether the container carries an audio stream
    pub has_audio: bool,
}

impl VideoInfo {
    /// Frame size after scaling down to `max_width` (even dimensions, aspect kept)
    pub fn analysis_size(&self, max_width: Option<u32>) -> (u32, u32) {
        match max_width {
            Some(target) if target < self.width && self.width > 0 => {
                let even = |v: u32| (v.max(2) / 2) * 2;
                let scale = target as f64 / self.width as f64;
                let height = (self.height as f64 * scale).round() as u32;
                (even(target), even(height))
            }
            _ => (self.width, self.height),
        }
    }
}
