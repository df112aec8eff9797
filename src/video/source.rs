use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::audio::{AudioData, AudioLoader};
use crate::config::{RenderConfig, VideoConfig};
use crate::error::{Result, VideoError};
use crate::video::probe::probe;
use crate::video::types::{Frame, VideoInfo};

/// A video opened for one analysis run
///
/// Frames come out strictly in presentation order and can be read once.
/// Implementations release their handles in [`MediaSource::close`] and again
/// on drop, so every exit path frees them.
pub trait MediaSource {
    /// Metadata known before decoding
    fn info(&self) -> &VideoInfo;

    /// Decode the audio track, `None` when the source has none
    fn read_audio(&mut self) -> Result<Option<AudioData>>;

    /// Next frame, `None` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release decoder resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Media source backed by the ffmpeg command line tools
///
/// Frames are piped out of ffmpeg as raw RGB24, one process per source.
pub struct FfmpegSource {
    info: VideoInfo,
    ffmpeg: String,
    frame_size: (u32, u32),
    decoder: Option<FrameDecoder>,
    exhausted: bool,
    frames_read: usize,
}

struct FrameDecoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
}

impl FrameDecoder {
    /// Diagnostics collected from the decoder, once its stderr has closed
    fn diagnostics(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

impl FfmpegSource {
    /// Probe `path` and prepare it for decoding
    pub fn open<P: AsRef<Path>>(
        path: P,
        render: &RenderConfig,
        video: &VideoConfig,
    ) -> Result<Self> {
        let info = probe(&render.ffprobe, path)?;
        let frame_size = info.analysis_size(video.analysis_width);

        Ok(Self {
            info,
            ffmpeg: render.ffmpeg.clone(),
            frame_size,
            decoder: None,
            exhausted: false,
            frames_read: 0,
        })
    }

    fn spawn_decoder(&self) -> Result<FrameDecoder> {
        let (width, height) = self.frame_size;
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.info.path)
            .args([
                "-map", "0:v:0",
                "-an",
                "-vf", &format!("scale={}:{}", width, height),
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::OpenFailed {
                path: self.info.path.display().to_string(),
                reason: format!("{} execution failed: {}", self.ffmpeg, e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::OpenFailed {
            path: self.info.path.display().to_string(),
            reason: "decoder has no output pipe".to_string(),
        })?;

        // A full stderr pipe blocks ffmpeg, so it is drained on its own thread
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                String::from_utf8_lossy(&bytes).into_owned()
            })
        });

        debug!(
            "Spawned frame decoder for {} at {}x{}",
            self.info.path.display(),
            width,
            height
        );
        Ok(FrameDecoder {
            child,
            stdout: BufReader::new(stdout),
            stderr,
        })
    }

    /// Wait for the decoder after its output ended and surface its failure
    fn finish_decoder(&mut self) -> Result<()> {
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(());
        };

        let status = decoder.child.wait()?;
        let stderr = decoder.diagnostics();
        if !status.success() {
            return Err(VideoError::DecodeFailed {
                reason: format!("ffmpeg exited with {}: {}", status, stderr.trim()),
            }
            .into());
        }

        info!("Decoded {} frames from {}", self.frames_read, self.info.path.display());
        Ok(())
    }
}

impl MediaSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_audio(&mut self) -> Result<Option<AudioData>> {
        if !self.info.has_audio {
            return Ok(None);
        }
        AudioLoader::new(self.ffmpeg.clone())
            .load_track(&self.info.path)
            .map(Some)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.decoder.is_none() {
            self.decoder = Some(self.spawn_decoder()?);
        }

        let (width, height) = self.frame_size;
        let mut bytes = vec![0u8; width as usize * height as usize * 3];
        let filled = match self.decoder.as_mut() {
            Some(decoder) => read_full(&mut decoder.stdout, &mut bytes)?,
            None => 0,
        };

        if filled == 0 {
            self.exhausted = true;
            self.finish_decoder()?;
            return Ok(None);
        }
        if filled < bytes.len() {
            self.exhausted = true;
            return Err(VideoError::DecodeFailed {
                reason: format!(
                    "truncated frame {} ({} of {} bytes)",
                    self.frames_read,
                    filled,
                    bytes.len()
                ),
            }
            .into());
        }

        self.frames_read += 1;
        Frame::from_rgb_bytes(width, height, bytes)
            .map(Some)
            .ok_or_else(|| {
                VideoError::DecodeFailed {
                    reason: "frame buffer size mismatch".to_string(),
                }
                .into()
            })
    }

    fn close(&mut self) -> Result<()> {
        self.exhausted = true;
        if let Some(mut decoder) = self.decoder.take() {
            if let Ok(None) = decoder.child.try_wait() {
                debug!("Stopping frame decoder for {}", self.info.path.display());
                if let Err(e) = decoder.child.kill() {
                    warn!("Failed to stop frame decoder: {}", e);
                }
            }
            decoder.child.wait()?;
            decoder.diagnostics();
        }
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Media source holding already-decoded frames and audio
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
    audio: Option<AudioData>,
}

impl MemorySource {
    pub fn new(info: VideoInfo, frames: Vec<Frame>, audio: Option<AudioData>) -> Self {
        Self {
            info,
            frames: frames.into(),
            audio,
        }
    }
}

impl MediaSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_audio(&mut self) -> Result<Option<AudioData>> {
        Ok(self.audio.clone())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.frames.clear();
        self.audio = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn info() -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("memory"),
            frame_rate: 10.0,
            duration: 0.3,
            width: 2,
            height: 2,
            has_audio: false,
        }
    }

    #[test]
    fn test_memory_source_yields_frames_in_order() {
        let frames = (0..3).map(|i| Frame::new_filled(2, 2, [i * 10, 0, 0])).collect();
        let mut source = MemorySource::new(info(), frames, None);

        assert!(source.read_audio().unwrap().is_none());
        for i in 0..3u8 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0), [i * 10, 0, 0]);
        }
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_close_releases_memory_source() {
        let frames = vec![Frame::new_filled(2, 2, [0, 0, 0])];
        let audio = AudioData::new(vec![0.0; 4], 4, 1);
        let mut source = MemorySource::new(info(), frames, Some(audio));
        source.close().unwrap();
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.read_audio().unwrap().is_none());
    }

    #[test]
    fn test_read_full_reports_short_reads() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = &data[..];
        let mut buf = [0u8; 3];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = FfmpegSource::open(
            "/no/such/file.mp4",
            &RenderConfig::default(),
            &VideoConfig::default(),
        );
        assert!(result.is_err());
    }

    #[cfg(unix)]
    const STUB_METADATA: &str = concat!(
        r#"echo '{"streams":[{"codec_type":"video","width":2,"height":2,"#,
        r#""avg_frame_rate":"10/1"}],"format":{"duration":"1.0"}}'"#,
    );

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_decoder_does_not_stall() {
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let render = RenderConfig {
            ffprobe: write_script(dir.path(), "ffprobe", STUB_METADATA),
            // 200 kB of warnings, far beyond a pipe buffer, then ten 2x2 frames
            ffmpeg: write_script(
                dir.path(),
                "ffmpeg",
                "head -c 200000 /dev/zero >&2\nhead -c 120 /dev/zero",
            ),
            ..RenderConfig::default()
        };
        let mut source = FfmpegSource::open(&input, &render, &VideoConfig::default()).unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut count = 0;
            let outcome = loop {
                match source.next_frame() {
                    Ok(Some(_)) => count += 1,
                    Ok(None) => break Ok(count),
                    Err(e) => break Err(e.to_string()),
                }
            };
            let _ = tx.send(outcome);
        });

        let outcome = rx
            .recv_timeout(Duration::from_secs(20))
            .expect("decoder stalled");
        assert_eq!(outcome, Ok(10));
    }
}
