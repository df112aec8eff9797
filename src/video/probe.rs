use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tracing::info;

use crate::error::{Result, VideoError};
use crate::video::types::VideoInfo;

/// Read stream metadata with ffprobe
pub fn probe<P: AsRef<Path>>(ffprobe: &str, path: P) -> Result<VideoInfo> {
    let path = path.as_ref();
    let open_failed = |reason: String| VideoError::OpenFailed {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(open_failed("no such file".to_string()).into());
    }

    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| open_failed(format!("{} execution failed: {}", ffprobe, e)))?;

    if !output.status.success() {
        return Err(open_failed(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))
        .into());
    }

    let info = parse_probe(path, &output.stdout)?;
    info!(
        "Video metadata: {}x{} @ {:.2}fps, {:.2}s, audio: {}",
        info.width, info.height, info.frame_rate, info.duration, info.has_audio
    );
    Ok(info)
}

/// Build [`VideoInfo`] from ffprobe's JSON output
pub fn parse_probe(path: &Path, json: &[u8]) -> Result<VideoInfo> {
    let probe_failed = |reason: &str| VideoError::ProbeFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let json: Value = serde_json::from_slice(json).map_err(|e| probe_failed(&e.to_string()))?;
    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| probe_failed("no streams"))?;

    let video = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| probe_failed("no video stream found"))?;
    let has_audio = streams.iter().any(|s| s["codec_type"] == "audio");

    let width = video["width"].as_u64().unwrap_or(0) as u32;
    let height = video["height"].as_u64().unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(probe_failed("video stream has no dimensions").into());
    }

    let frame_rate = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video[*key].as_str())
        .map(parse_frame_rate)
        .find(|fps| *fps > 0.0)
        .ok_or_else(|| probe_failed("unknown frame rate"))?;

    let duration = [&json["format"]["duration"], &video["duration"]]
        .iter()
        .filter_map(|v| v.as_str().and_then(|d| d.parse::<f64>().ok()))
        .find(|d| *d > 0.0)
        .ok_or_else(|| probe_failed("unknown duration"))?;

    Ok(VideoInfo {
        path: path.to_path_buf(),
        frame_rate,
        duration,
        width,
        height,
        has_audio,
    })
}

/// Parse "30000/1001" or "25" into frames per second
fn parse_frame_rate(fps: &str) -> f64 {
    match fps.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            let den: f64 = den.trim().parse().unwrap_or(0.0);
            if den != 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => fps.trim().parse().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 1280, "height": 720,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001", "duration": "12.0"},
            {"codec_type": "audio", "sample_rate": "48000", "channels": 2}
        ],
        "format": {"duration": "12.012000"}
    }"#;

    #[test]
    fn test_parse_probe() {
        let info = parse_probe(Path::new("clip.mp4"), PROBE.as_bytes()).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert!((info.duration - 12.012).abs() < 1e-9);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_without_audio() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 64, "height": 48,
            "avg_frame_rate": "0/0", "r_frame_rate": "25/1", "duration": "4.0"}], "format": {}}"#;
        let info = parse_probe(Path::new("silent.mkv"), json.as_bytes()).unwrap();
        assert_eq!(info.frame_rate, 25.0);
        assert_eq!(info.duration, 4.0);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_parse_probe_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(parse_probe(Path::new("song.mp3"), json.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let result = probe("ffprobe", "/no/such/video.mp4");
        assert!(matches!(
            result,
            Err(crate::error::CatcherError::Video(VideoError::OpenFailed { .. }))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), 25.0);
        assert_eq!(parse_frame_rate("24000/1001"), 24000.0 / 1001.0);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
    }
}
