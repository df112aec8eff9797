//! # Audio Feature Module
//!
//! Decodes the audio track of a video and reduces it to a sequence of
//! per-window features used by the excitement score.
//!
//! ## Core Features
//!
//! - **Track decoding**: Symphonia demuxing straight from the container, with
//!   an ffmpeg + hound fallback for codecs Symphonia does not cover
//! - **Mono mixing**: multi-channel tracks are averaged across channels
//! - **Window features**: energy, zero-crossing rate and FFT spectral centroid
//!   over 100ms windows with 50% overlap
//!
//! ## Usage
//!
//! ```rust
//! use moment_catcher::audio::{AudioData, AudioFeatureExtractor};
//!
//! let audio = AudioData::new(vec![0.0; 16_000], 16_000, 1);
//! let features = AudioFeatureExtractor::default().extract(&audio).unwrap();
//! assert_eq!(features.width(), 3);
//! ```

pub mod features;
pub mod loader;
pub mod types;

pub use features::AudioFeatureExtractor;
pub use loader::AudioLoader;
pub use types::AudioData;
