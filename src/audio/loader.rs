use std::fs::File;
use std::path::Path;
use std::process::Command;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Decodes the audio track of a media file
///
/// The track is demuxed straight from the container with Symphonia. Codecs
/// Symphonia cannot handle are transcoded to a temporary WAV by ffmpeg and
/// read back with hound.
pub struct AudioLoader {
    ffmpeg: String,
}

impl AudioLoader {
    pub fn new<S: Into<String>>(ffmpeg: S) -> Self {
        Self { ffmpeg: ffmpeg.into() }
    }

    /// Load the first decodable audio track of `path`
    pub fn load_track<P: AsRef<Path>>(&self, path: P) -> Result<AudioData> {
        let path = path.as_ref();
        match Self::load_with_symphonia(path) {
            Ok(audio) => Ok(audio),
            Err(e) => {
                warn!(
                    "Symphonia could not decode audio of {}: {}; extracting with ffmpeg",
                    path.display(),
                    e
                );
                self.load_with_ffmpeg(path)
            }
        }
    }

    /// Load WAV files using the hound crate
    pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioData> {
        let path = path.as_ref();
        let decode_failed = |reason: String| AudioError::DecodeFailed {
            path: path.display().to_string(),
            reason,
        };

        let reader = hound::WavReader::open(path).map_err(|e| decode_failed(e.to_string()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| decode_failed(e.to_string()))?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|sample| Self::int_to_float(sample, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| decode_failed(e.to_string()))?
            }
        };

        Ok(AudioData::new(samples, spec.sample_rate, spec.channels))
    }

    fn load_with_symphonia(path: &Path) -> Result<AudioData> {
        let decode_failed = |reason: String| AudioError::DecodeFailed {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| decode_failed(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| decode_failed(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| {
                t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some()
            })
            .ok_or_else(|| decode_failed("no decodable audio track".to_string()))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or_default();
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_failed(e.to_string()))?;

        let mut samples = Vec::new();
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(decode_failed(e.to_string()).into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count() as u16;

                    let needed = decoded.capacity() * spec.channels.count();
                    if buffer.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                        buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = buffer.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(decode_failed(e.to_string()).into()),
            }
        }

        if channels == 0 || samples.is_empty() {
            return Err(decode_failed("audio track decoded to no samples".to_string()).into());
        }

        Ok(AudioData::new(samples, sample_rate, channels))
    }

    fn load_with_ffmpeg(&self, path: &Path) -> Result<AudioData> {
        let wav = tempfile::Builder::new()
            .prefix("moment_catcher_audio_")
            .suffix(".wav")
            .tempfile()?;

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-y", "-i"])
            .arg(path)
            .args(["-map", "0:a:0", "-vn", "-acodec", "pcm_s16le", "-f", "wav"])
            .arg(wav.path())
            .output()
            .map_err(|e| AudioError::ExtractFailed {
                reason: format!("{} execution failed: {}", self.ffmpeg, e),
            })?;

        if !output.status.success() {
            return Err(AudioError::ExtractFailed {
                reason: format!(
                    "ffmpeg failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        // `wav` is deleted when it goes out of scope
        Self::load_wav(wav.path())
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => (sample as f32 - 128.0) / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }
}
