use realfft::RealFftPlanner;
use tracing::debug;

use crate::analysis::{FeatureSequence, AUDIO_FEATURE_WIDTH};
use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Per-window energy, zero-crossing rate and spectral centroid
///
/// Windows are `window_seconds` long and overlap by half.
#[derive(Debug, Clone)]
pub struct AudioFeatureExtractor {
    window_seconds: f64,
}

impl Default for AudioFeatureExtractor {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl AudioFeatureExtractor {
    pub fn new(window_seconds: f64) -> Self {
        Self { window_seconds }
    }

    /// Window length in samples for a given sample rate
    pub fn window_size(&self, sample_rate: u32) -> usize {
        ((self.window_seconds * sample_rate as f64).round() as usize).max(2)
    }

    /// Extract one feature row per window of the mono mix
    pub fn extract(&self, audio: &AudioData) -> Result<FeatureSequence> {
        if audio.sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: "sample rate must be positive".to_string(),
            }
            .into());
        }

        let samples = audio.mono_samples();
        let window_size = self.window_size(audio.sample_rate);
        let hop_size = window_size / 2;
        let rate = audio.sample_rate as f64 / hop_size as f64;

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(window_size);
        let mut input_buffer = fft.make_input_vec();
        let mut spectrum_buffer = fft.make_output_vec();
        let bin_hz = audio.sample_rate as f64 / window_size as f64;

        let mut features = FeatureSequence::new(AUDIO_FEATURE_WIDTH, rate);

        for window in samples.windows(window_size).step_by(hop_size) {
            let energy: f64 = window.iter().map(|&x| (x as f64) * (x as f64)).sum();

            let zero_crossings = window
                .windows(2)
                .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                .count();
            let zero_crossing_rate = zero_crossings as f64 / window.len() as f64;

            for (dst, &src) in input_buffer.iter_mut().zip(window) {
                *dst = src as f64;
            }
            fft.process(&mut input_buffer, &mut spectrum_buffer)
                .map_err(|e| AudioError::InvalidParameters {
                    details: format!("FFT processing failed: {}", e),
                })?;

            let (weighted, total) = spectrum_buffer
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(weighted, total), (k, c)| {
                    let magnitude = c.norm();
                    (weighted + magnitude * k as f64 * bin_hz, total + magnitude)
                });
            let spectral_centroid = if total > 0.0 { weighted / total } else { 0.0 };

            features.push(&[energy, zero_crossing_rate, spectral_centroid])?;
        }

        debug!(
            "Extracted {} audio windows ({} samples, hop {}) at {:.1} windows/s",
            features.len(),
            window_size,
            hop_size,
            rate
        );
        Ok(features)
    }

    /// Feature rows for a source without audio: silence on the video frame grid
    pub fn silent(duration: f64, frame_rate: f64) -> FeatureSequence {
        let rows = (duration * frame_rate).max(0.0).floor() as usize;
        FeatureSequence::zeros(rows, AUDIO_FEATURE_WIDTH, frame_rate)
    }
}
