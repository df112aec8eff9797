use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::analysis::Moment;
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};

/// Everything a renderer needs to cut one trailer
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Source video
    pub source: &'a Path,

    /// Sub-ranges to keep, in output order
    pub segments: &'a [Moment],

    /// Whether the source has an audio stream to carry over
    pub with_audio: bool,

    /// Destination file
    pub output: &'a Path,
}

/// Cuts the admitted moments out of the source and writes them back to back
pub trait TrailerRenderer: Send + Sync {
    /// Returns a unique name for this renderer
    fn name(&self) -> &str;

    /// Render the trailer; on failure no valid output may be left behind
    fn render(&self, request: &RenderRequest<'_>) -> Result<()>;
}

/// Renderer driving the ffmpeg command line tool
pub struct FfmpegRenderer {
    ffmpeg: String,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    pub fn check_ffmpeg_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Filter graph trimming every segment and concatenating them in order
    pub fn filter_graph(segments: &[Moment], with_audio: bool) -> String {
        let mut graph = String::new();
        let mut inputs = String::new();

        for (i, segment) in segments.iter().enumerate() {
            graph.push_str(&format!(
                "[0:v]trim=start={:.6}:end={:.6},setpts=PTS-STARTPTS[v{}];",
                segment.start_time, segment.end_time, i
            ));
            inputs.push_str(&format!("[v{}]", i));

            if with_audio {
                graph.push_str(&format!(
                    "[0:a]atrim=start={:.6}:end={:.6},asetpts=PTS-STARTPTS[a{}];",
                    segment.start_time, segment.end_time, i
                ));
                inputs.push_str(&format!("[a{}]", i));
            }
        }

        if with_audio {
            graph.push_str(&format!("{}concat=n={}:v=1:a=1[outv][outa]", inputs, segments.len()));
        } else {
            graph.push_str(&format!("{}concat=n={}:v=1:a=0[outv]", inputs, segments.len()));
        }
        graph
    }

    /// Full ffmpeg argument list for a request
    pub fn build_args(&self, request: &RenderRequest<'_>) -> Vec<String> {
        let mut args: Vec<String> = ["-v", "error", "-y", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(request.source.display().to_string());
        args.push("-filter_complex".to_string());
        args.push(Self::filter_graph(request.segments, request.with_audio));
        args.push("-map".to_string());
        args.push("[outv]".to_string());
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());

        if request.with_audio {
            args.push("-map".to_string());
            args.push("[outa]".to_string());
            args.push("-c:a".to_string());
            args.push(self.audio_codec.clone());
        }

        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());
        args.push(request.output.display().to_string());
        args
    }

    fn discard_partial_output(output: &Path) {
        if output.exists() {
            if let Err(e) = std::fs::remove_file(output) {
                warn!("Failed to remove partial output {}: {}", output.display(), e);
            }
        }
    }
}

impl TrailerRenderer for FfmpegRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<()> {
        if request.segments.is_empty() {
            return Err(RenderError::EncodeFailed {
                reason: "nothing to render".to_string(),
            }
            .into());
        }

        if !self.check_ffmpeg_available() {
            return Err(RenderError::ToolUnavailable {
                tool: self.ffmpeg.clone(),
            }
            .into());
        }

        let args = self.build_args(request);
        debug!("Running {} {}", self.ffmpeg, args.join(" "));
        info!(
            "Rendering {} segments to {} ({}/{})",
            request.segments.len(),
            request.output.display(),
            self.video_codec,
            self.audio_codec
        );

        let output = match Command::new(&self.ffmpeg).args(&args).stdin(Stdio::null()).output() {
            Ok(output) => output,
            Err(e) => {
                Self::discard_partial_output(request.output);
                return Err(RenderError::EncodeFailed {
                    reason: format!("{} execution failed: {}", self.ffmpeg, e),
                }
                .into());
            }
        };

        if !output.status.success() {
            Self::discard_partial_output(request.output);
            return Err(RenderError::EncodeFailed {
                reason: format!(
                    "ffmpeg failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        if !request.output.is_file() {
            return Err(RenderError::OutputMissing {
                path: request.output.display().to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatcherError;

    fn moments() -> Vec<Moment> {
        vec![
            Moment { start_time: 1.0, end_time: 4.0, score: 2.0, peak_window: 75 },
            Moment { start_time: 10.5, end_time: 13.5, score: 1.0, peak_window: 360 },
        ]
    }

    #[test]
    fn test_filter_graph_with_audio() {
        let graph = FfmpegRenderer::filter_graph(&moments(), true);
        assert!(graph
            .starts_with("[0:v]trim=start=1.000000:end=4.000000,setpts=PTS-STARTPTS[v0];"));
        assert!(graph
            .contains("[0:a]atrim=start=10.500000:end=13.500000,asetpts=PTS-STARTPTS[a1];"));
        assert!(graph.ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[outv][outa]"));
    }

    #[test]
    fn test_filter_graph_video_only() {
        let graph = FfmpegRenderer::filter_graph(&moments(), false);
        assert!(!graph.contains("atrim"));
        assert!(graph.ends_with("[v0][v1]concat=n=2:v=1:a=0[outv]"));
    }

    #[test]
    fn test_build_args_uses_codecs() {
        let renderer = FfmpegRenderer::new(&RenderConfig::default());
        let segments = moments();
        let request = RenderRequest {
            source: Path::new("in.mp4"),
            segments: &segments,
            with_audio: true,
            output: Path::new("out.mp4"),
        };

        let args = renderer.build_args(&request);
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    fn render_to(config: &RenderConfig, output: &Path) -> CatcherError {
        let segments = moments();
        let request = RenderRequest {
            source: Path::new("in.mp4"),
            segments: &segments,
            with_audio: false,
            output,
        };
        FfmpegRenderer::new(config).render(&request).unwrap_err()
    }

    #[test]
    fn test_missing_ffmpeg_reports_tool_unavailable() {
        let config = RenderConfig {
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            ..RenderConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");

        let err = render_to(&config, &output);
        assert!(matches!(err, CatcherError::Render(RenderError::ToolUnavailable { .. })));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_encode_removes_partial_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");

        // Answers the version check, then writes half a file to its last argument and fails
        let ffmpeg = dir.path().join("ffmpeg");
        std::fs::write(
            &ffmpeg,
            concat!(
                "#!/bin/sh\n",
                "if [ \"$1\" = \"-version\" ]; then echo \"ffmpeg version stub\"; exit 0; fi\n",
                "for last; do :; done\n",
                "echo partial > \"$last\"\n",
                "echo boom >&2\n",
                "exit 1\n",
            ),
        )
        .unwrap();
        std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = RenderConfig {
            ffmpeg: ffmpeg.display().to_string(),
            ..RenderConfig::default()
        };
        let err = render_to(&config, &output);

        match err {
            CatcherError::Render(RenderError::EncodeFailed { reason }) => {
                assert!(reason.contains("boom"), "{}", reason)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!output.exists());
    }
}
