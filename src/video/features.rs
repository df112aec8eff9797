use image::GrayImage;
use tracing::debug;

use crate::analysis::{FeatureSequence, VISUAL_FEATURE_WIDTH};
use crate::error::{Result, VideoError};
use crate::video::source::MediaSource;
use crate::video::types::Frame;

/// Per-frame motion, edge density, brightness variance and color variance
#[derive(Debug, Clone)]
pub struct VisualFeatureExtractor {
    canny_low: f32,
    canny_high: f32,
}

impl Default for VisualFeatureExtractor {
    fn default() -> Self {
        Self::new(50.0, 150.0)
    }
}

impl VisualFeatureExtractor {
    pub fn new(canny_low: f32, canny_high: f32) -> Self {
        Self { canny_low, canny_high }
    }

    /// Decode the whole source once, front to back
    pub fn extract(&self, source: &mut dyn MediaSource) -> Result<FeatureSequence> {
        let frame_rate = source.info().frame_rate;
        let mut features = FeatureSequence::new(VISUAL_FEATURE_WIDTH, frame_rate);
        let mut previous: Option<GrayImage> = None;

        while let Some(frame) = source.next_frame()? {
            let gray = frame.to_gray();
            if let Some(prev) = &previous {
                if prev.dimensions() != gray.dimensions() {
                    return Err(VideoError::DecodeFailed {
                        reason: format!(
                            "frame {} is {:?}, previous frames were {:?}",
                            features.len(),
                            gray.dimensions(),
                            prev.dimensions()
                        ),
                    }
                    .into());
                }
            }

            let row = self.frame_features(&frame, &gray, previous.as_ref());
            features.push(&row)?;
            previous = Some(gray);

            if features.len() % 500 == 0 {
                debug!("Processed {} frames", features.len());
            }
        }

        debug!("Extracted visual features for {} frames", features.len());
        Ok(features)
    }

    /// Features of one frame given its grayscale version and the previous one
    pub fn frame_features(
        &self,
        frame: &Frame,
        gray: &GrayImage,
        previous: Option<&GrayImage>,
    ) -> [f64; VISUAL_FEATURE_WIDTH] {
        let motion = previous.map_or(0.0, |prev| mean_abs_diff(gray, prev));
        let edges = canny(gray, self.canny_low, self.canny_high);
        let edge_density = if edges.is_empty() {
            0.0
        } else {
            edges.iter().filter(|&&e| e).count() as f64 / edges.len() as f64
        };
        let brightness_variance = variance(gray.as_raw().iter().copied());
        let color_variance = (0..3)
            .map(|c| variance(frame.as_image().as_raw().iter().skip(c).step_by(3).copied()))
            .sum::<f64>()
            / 3.0;

        [motion, edge_density, brightness_variance, color_variance]
    }
}

fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let n = a.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    total as f64 / n as f64
}

/// Population variance of 8-bit samples
fn variance(values: impl Iterator<Item = u8>) -> f64 {
    let (mut n, mut sum, mut sum_sq) = (0u64, 0u64, 0u64);
    for v in values {
        let v = v as u64;
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum as f64 / n as f64;
    (sum_sq as f64 / n as f64 - mean * mean).max(0.0)
}

/// Canny edge map: 3x3 Sobel, L1 magnitude, non-maximum suppression and
/// hysteresis between `low` and `high`. Returns one flag per pixel, row-major.
pub fn canny(gray: &GrayImage, low: f32, high: f32) -> Vec<bool> {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let px = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        gray.as_raw()[y * width + x] as i32
    };

    let mut gx = vec![0i32; width * height];
    let mut gy = vec![0i32; width * height];
    let mut magnitude = vec![0i32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let dx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            let dy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y as usize * width + x as usize;
            gx[i] = dx;
            gy[i] = dy;
            magnitude[i] = dx.abs() + dy.abs();
        }
    }

    let mag = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0
        } else {
            magnitude[y as usize * width + x as usize]
        }
    };

    const TAN_22_5: f64 = 0.414_213_562;
    const TAN_67_5: f64 = 2.414_213_562;

    // 0 = not an edge, 1 = weak candidate, 2 = strong edge
    let mut state = vec![0u8; width * height];
    let mut stack = Vec::new();
    for y in 0..height as isize {
        for x in 0..width as isize {
            let i = y as usize * width + x as usize;
            let m = magnitude[i];
            if (m as f32) <= low {
                continue;
            }

            let (ax, ay) = (gx[i].abs() as f64, gy[i].abs() as f64);
            let is_max = if ay < ax * TAN_22_5 {
                m > mag(x - 1, y) && m >= mag(x + 1, y)
            } else if ay > ax * TAN_67_5 {
                m > mag(x, y - 1) && m >= mag(x, y + 1)
            } else {
                let s = if (gx[i] < 0) != (gy[i] < 0) { -1 } else { 1 };
                m > mag(x - s, y - 1) && m > mag(x + s, y + 1)
            };
            if !is_max {
                continue;
            }

            if (m as f32) > high {
                state[i] = 2;
                stack.push((x, y));
            } else {
                state[i] = 1;
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let j = ny as usize * width + nx as usize;
                if state[j] == 1 {
                    state[j] = 2;
                    stack.push((nx, ny));
                }
            }
        }
    }

    state.into_iter().map(|s| s == 2).collect()
}
