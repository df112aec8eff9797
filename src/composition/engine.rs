use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    analysis::{
        ExcitementScorer, FeatureNormalizer, FeatureSequence, Moment, PeakSelector, Timeline,
    },
    audio::AudioFeatureExtractor,
    composition::assembler::TrailerAssembler,
    config::{Config, DetectionParams},
    error::Result,
    video::{
        FfmpegRenderer, FfmpegSource, MediaSource, TrailerRenderer, VideoInfo,
        VisualFeatureExtractor,
    },
};

/// Result of running detection over one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Source the moments were found in
    pub info: VideoInfo,

    /// Selected moments, sorted by start time
    pub moments: Vec<Moment>,

    /// Excitement score of every aligned window
    pub scores: Vec<f64>,

    /// Windows per second of `scores`
    pub window_rate: f64,

    /// False when the silent fallback replaced the audio features
    pub used_audio: bool,
}

/// Structured outcome of a trailer run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailerReport {
    pub source: PathBuf,
    pub output: PathBuf,

    /// Moments included in the trailer, in playback order
    pub moments: Vec<Moment>,

    /// Number of moments detected before the budget was applied
    pub detected: usize,

    /// Sum of included moment durations in seconds
    pub total_duration: f64,

    /// Duration budget the trailer was assembled against
    pub budget: f64,

    pub created_at: DateTime<Utc>,
}

impl TrailerReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| std::io::Error::other(e).into())
    }
}

/// Moment detection and trailer pipeline
///
/// Every run is independent: stages take their inputs by reference and
/// hand back fresh results, nothing accumulates on the instance.
///
/// 1. Audio features (or silence when the source has no track)
/// 2. Visual features, one sequential pass over the frames
/// 3. Alignment, standardization and scoring
/// 4. Peak picking into moments
/// 5. Budgeted assembly and rendering
pub struct MomentCatcher {
    config: Config,
    renderer: Box<dyn TrailerRenderer>,
}

impl MomentCatcher {
    /// Create a pipeline rendering through ffmpeg
    pub fn new(config: Config) -> Self {
        let renderer = Box::new(FfmpegRenderer::new(&config.render));
        Self { config, renderer }
    }

    /// Create a pipeline with a custom renderer
    pub fn with_renderer(config: Config, renderer: Box<dyn TrailerRenderer>) -> Self {
        Self { config, renderer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find the most exciting moments of an opened source
    ///
    /// The source is read to the end but not closed; the caller owns it.
    pub fn detect(
        &self,
        source: &mut dyn MediaSource,
        params: &DetectionParams,
    ) -> Result<Detection> {
        params.validate()?;
        let info = source.info().clone();
        info!("🎬 Detecting moments in {}", info.path.display());
        info!(
            "   {:.1}s at {:.2} fps, {}x{}",
            info.duration, info.frame_rate, info.width, info.height
        );

        // Step 1: audio
        let (audio_features, used_audio) = self.audio_features(source, &info)?;

        // Step 2: frames
        let video = &self.config.video;
        let visual =
            VisualFeatureExtractor::new(video.canny_low, video.canny_high).extract(source)?;
        info!("   Visual features: {} frames", visual.len());

        // Step 3: scores
        let matrix = FeatureNormalizer::new().normalize(&audio_features, &visual)?;
        let scores = ExcitementScorer::new(self.config.scoring.weights.clone()).score(&matrix)?;
        debug!("Scored {} windows at {:.2} windows/s", scores.len(), matrix.rate());

        // Step 4: moments
        let selector = PeakSelector::new(
            self.config.scoring.threshold_percentile,
            self.config.scoring.min_peak_spacing,
        );
        let moments = selector.select(
            &scores,
            params.num_moments,
            params.moment_duration,
            Timeline {
                rate: matrix.rate(),
                duration: info.duration,
            },
        )?;

        if moments.is_empty() {
            warn!("No exciting moments found in {}", info.path.display());
        } else {
            info!("   ✅ {} moments found", moments.len());
            for moment in &moments {
                debug!(
                    "      {:7.2}s - {:7.2}s  score {:.3}",
                    moment.start_time, moment.end_time, moment.score
                );
            }
        }

        Ok(Detection {
            info,
            moments,
            scores,
            window_rate: matrix.rate(),
            used_audio,
        })
    }

    fn audio_features(
        &self,
        source: &mut dyn MediaSource,
        info: &VideoInfo,
    ) -> Result<(FeatureSequence, bool)> {
        match source.read_audio()? {
            Some(audio) => {
                info!(
                    "   Audio: {:.1}s, {} Hz, {} channels",
                    audio.duration, audio.sample_rate, audio.channels
                );
                let features =
                    AudioFeatureExtractor::new(self.config.audio.window_seconds).extract(&audio)?;
                Ok((features, true))
            }
            None => {
                warn!(
                    "{} has no audio track, scoring on visual features only",
                    info.path.display()
                );
                Ok((AudioFeatureExtractor::silent(info.duration, info.frame_rate), false))
            }
        }
    }

    /// Open `path`, detect moments and release the source on every exit path
    pub fn detect_file<P: AsRef<Path>>(
        &self,
        path: P,
        params: &DetectionParams,
    ) -> Result<Detection> {
        let mut source = FfmpegSource::open(path, &self.config.render, &self.config.video)?;
        let detection = self.detect(&mut source, params);
        let closed = source.close();

        let detection = detection?;
        closed?;
        Ok(detection)
    }

    /// Assemble detected moments into a trailer at `output`
    pub fn generate_trailer<P: AsRef<Path>>(
        &self,
        detection: &Detection,
        output: P,
        max_duration: f64,
    ) -> Result<TrailerReport> {
        let output = output.as_ref();
        info!("🎞️  Assembling trailer ({:.1}s budget)", max_duration);

        let trailer = TrailerAssembler::new(max_duration).assemble(
            &detection.moments,
            &detection.info,
            output,
            self.renderer.as_ref(),
        )?;

        Ok(TrailerReport {
            source: detection.info.path.clone(),
            output: output.to_path_buf(),
            moments: trailer.moments,
            detected: detection.moments.len(),
            total_duration: trailer.total_duration,
            budget: max_duration,
            created_at: Utc::now(),
        })
    }

    /// Detect moments in `input` and write the trailer to `output`
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        params: &DetectionParams,
    ) -> Result<TrailerReport> {
        let detection = self.detect_file(input, params)?;
        let report = self.generate_trailer(&detection, output, params.max_trailer_duration)?;
        info!("🎉 Trailer saved to {}", report.output.display());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioData;
    use crate::video::{Frame, MemorySource, RenderRequest};
    use std::sync::{Arc, Mutex};

    struct RecordingRenderer {
        requests: Arc<Mutex<Vec<usize>>>,
    }

    impl TrailerRenderer for RecordingRenderer {
        fn name(&self) -> &str {
            "recording"
        }

        fn render(&self, request: &RenderRequest<'_>) -> Result<()> {
            self.requests.lock().unwrap().push(request.segments.len());
            std::fs::write(request.output, b"")?;
            Ok(())
        }
    }

    fn info(frames: usize, has_audio: bool) -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("memory.mp4"),
            frame_rate: 10.0,
            duration: frames as f64 / 10.0,
            width: 8,
            height: 8,
            has_audio,
        }
    }

    /// Dark frames with bright flashes at the given indices
    fn flashes(count: usize, at: &[usize]) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                if at.contains(&i) {
                    Frame::new_filled(8, 8, [250, 250, 250])
                } else {
                    Frame::new_filled(8, 8, [10, 10, 10])
                }
            })
            .collect()
    }

    fn catcher() -> (MomentCatcher, Arc<Mutex<Vec<usize>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let renderer = RecordingRenderer {
            requests: Arc::clone(&requests),
        };
        (MomentCatcher::with_renderer(Config::default(), Box::new(renderer)), requests)
    }

    #[test]
    fn test_detect_without_audio_uses_fallback() {
        let (catcher, _) = catcher();
        let mut source = MemorySource::new(info(100, false), flashes(100, &[30, 70]), None);
        let params = DetectionParams {
            num_moments: 5,
            ..DetectionParams::default()
        };

        let detection = catcher.detect(&mut source, &params).unwrap();
        assert!(!detection.used_audio);
        assert_eq!(detection.scores.len(), 100);
        assert_eq!(detection.window_rate, 10.0);

        let peaks: Vec<usize> = detection.moments.iter().map(|m| m.peak_window).collect();
        assert_eq!(peaks, vec![30, 70]);
    }

    #[test]
    fn test_detect_with_audio_track() {
        let (catcher, _) = catcher();
        let audio = AudioData::new(
            (0..8000 * 5).map(|i| ((i as f32) * 0.05).sin() * 0.2).collect(),
            8000,
            1,
        );
        let mut source = MemorySource::new(info(50, true), flashes(50, &[25]), Some(audio));

        let detection = catcher.detect(&mut source, &DetectionParams::default()).unwrap();
        assert!(detection.used_audio);
        assert!(detection.scores.len() <= 50);
        assert!(detection.moments.len() <= 10);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (catcher, _) = catcher();
        let mut source = MemorySource::new(info(10, false), flashes(10, &[]), None);
        let params = DetectionParams {
            num_moments: 0,
            ..DetectionParams::default()
        };
        assert!(catcher.detect(&mut source, &params).is_err());
    }

    #[test]
    fn test_generate_trailer_report() {
        let (catcher, requests) = catcher();
        let mut source = MemorySource::new(info(100, false), flashes(100, &[30, 70]), None);
        let detection = catcher.detect(&mut source, &DetectionParams::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("trailer.mp4");
        let report = catcher.generate_trailer(&detection, &output, 30.0).unwrap();

        assert_eq!(report.detected, 2);
        assert_eq!(report.moments.len(), 2);
        assert_eq!(report.total_duration, 6.0);
        assert_eq!(*requests.lock().unwrap(), vec![2]);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"total_duration\": 6.0"));
        assert!(json.contains("created_at"));
    }
}
