/// Decoded audio track
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples (interleaved for multi-channel, plain for mono)
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Duration in seconds
    pub duration: f64,
}

impl AudioData {
    /// Wrap interleaved samples, deriving the duration
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let frames = samples.len() / channels.max(1) as usize;
        let duration = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.0
        };

        Self {
            samples,
            sample_rate,
            channels,
            duration,
        }
    }

    /// Get mono mix of all channels
    pub fn mono_samples(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_mix_averages_channels() {
        let audio = AudioData::new(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 4, 2);
        assert_eq!(audio.mono_samples(), vec![0.5, 0.5, 0.0]);
        assert_eq!(audio.duration, 0.75);
    }

    #[test]
    fn test_mono_passthrough() {
        let audio = AudioData::new(vec![0.1, 0.2], 2, 1);
        assert_eq!(audio.mono_samples(), vec![0.1, 0.2]);
    }
}
