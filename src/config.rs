use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{AUDIO_FEATURE_WIDTH, VISUAL_FEATURE_WIDTH},
    error::{ConfigError, Result},
};

/// Main configuration for Moment Catcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio feature extraction settings
    pub audio: AudioConfig,

    /// Visual feature extraction settings
    pub video: VideoConfig,

    /// Excitement scoring and peak picking settings
    pub scoring: ScoringConfig,

    /// Moment detection and trailer budget
    pub detection: DetectionParams,

    /// Output rendering settings
    pub render: RenderConfig,

    /// Upload/download workspace settings
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.video.validate()?;
        self.scoring.validate()?;
        self.detection.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Audio feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analysis window length in seconds; windows overlap by half
    pub window_seconds: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { window_seconds: 0.1 }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if !(self.window_seconds > 0.0) {
            return Err(invalid("audio.window_seconds", self.window_seconds).into());
        }
        Ok(())
    }
}

/// Visual feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Downscale frames to this width before analysis (native size when unset)
    pub analysis_width: Option<u32>,

    /// Lower hysteresis threshold of the edge detector
    pub canny_low: f32,

    /// Upper hysteresis threshold of the edge detector
    pub canny_high: f32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            analysis_width: None,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.analysis_width == Some(0) {
            return Err(invalid("video.analysis_width", 0).into());
        }

        if self.canny_low < 0.0 || self.canny_low > self.canny_high {
            return Err(invalid(
                "video.canny_thresholds",
                format!("{}-{}", self.canny_low, self.canny_high),
            )
            .into());
        }

        Ok(())
    }
}

/// Excitement scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// One weight per feature column: energy, zcr, centroid, motion, edges,
    /// brightness variance, color variance
    pub weights: Vec<f64>,

    /// Scores must exceed this percentile of all scores to become peaks
    pub threshold_percentile: f64,

    /// Minimum distance between two peaks, in seconds
    pub min_peak_spacing: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: vec![0.3, 0.2, 0.1, 0.2, 0.1, 0.1, 0.1],
            threshold_percentile: 70.0,
            min_peak_spacing: 2.0,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<()> {
        let expected = AUDIO_FEATURE_WIDTH + VISUAL_FEATURE_WIDTH;
        if self.weights.len() != expected {
            return Err(invalid(
                "scoring.weights",
                format!("{} weights (expected {})", self.weights.len(), expected),
            )
            .into());
        }

        if !(0.0..=100.0).contains(&self.threshold_percentile) {
            return Err(invalid("scoring.threshold_percentile", self.threshold_percentile).into());
        }

        if self.min_peak_spacing < 0.0 {
            return Err(invalid("scoring.min_peak_spacing", self.min_peak_spacing).into());
        }

        Ok(())
    }
}

/// Parameters of a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Maximum number of moments to return
    pub num_moments: usize,

    /// Length of each moment in seconds
    pub moment_duration: f64,

    /// Trailer duration budget in seconds
    pub max_trailer_duration: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            num_moments: 10,
            moment_duration: 3.0,
            max_trailer_duration: 30.0,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_moments == 0 {
            return Err(invalid("detection.num_moments", self.num_moments).into());
        }

        if !(self.moment_duration > 0.0) {
            return Err(invalid("detection.moment_duration", self.moment_duration).into());
        }

        if self.max_trailer_duration < 0.0 {
            return Err(invalid("detection.max_trailer_duration", self.max_trailer_duration).into());
        }

        Ok(())
    }
}

/// Output rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// ffmpeg executable
    pub ffmpeg: String,

    /// ffprobe executable
    pub ffprobe: String,

    /// Video codec for the trailer
    pub video_codec: String,

    /// Audio codec for the trailer
    pub audio_codec: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// Upload/download workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Largest accepted upload in bytes
    pub max_upload_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.weights.len(), 7);
        assert_eq!(config.detection.num_moments, 10);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original = Config::default();
        original.video.analysis_width = Some(320);
        original.detection.num_moments = 4;

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded.video.analysis_width, Some(320));
        assert_eq!(loaded.detection, original.detection);
        assert_eq!(loaded.scoring.weights, original.scoring.weights);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[detection]\nnum_moments = 3\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.detection.num_moments, 3);
        assert_eq!(config.detection.moment_duration, 3.0);
        assert_eq!(config.render.video_codec, "libx264");
    }

    #[test]
    fn test_six_weights_rejected() {
        let mut config = Config::default();
        config.scoring.weights = vec![0.3, 0.2, 0.1, 0.2, 0.1, 0.1];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_detection_params() {
        let mut params = DetectionParams::default();
        params.moment_duration = 0.0;
        assert!(params.validate().is_err());

        let mut params = DetectionParams::default();
        params.num_moments = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(matches!(
            result,
            Err(crate::error::CatcherError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
