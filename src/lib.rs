//! # Moment Catcher
//!
//! Cut a short trailer out of a long video by finding its most audiovisually
//! intense moments.
//!
//! The audio track and the frames are each reduced to per-window features,
//! aligned on the video frame grid, standardized and weighted into one
//! excitement score per frame. Well-separated score peaks become fixed-length
//! moments, and the best of them are concatenated into the trailer until a
//! duration budget is met.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moment_catcher::{config::Config, MomentCatcher};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let params = config.detection.clone();
//!
//! let catcher = MomentCatcher::new(config);
//! let report = catcher.process("match.mp4", "trailer.mp4", &params)?;
//! println!("{} moments, {:.1}s", report.moments.len(), report.total_duration);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - Track decoding and audio window features
//! - [`video`] - Media sources, visual frame features and trailer rendering
//! - [`analysis`] - Normalization, scoring and peak selection
//! - [`composition`] - Pipeline orchestration and budgeted assembly
//! - [`service`] - Upload/download boundary
//! - [`config`] - Configuration management
//!
//! ## Custom Sources
//!
//! Anything that can hand out frames in order can be analyzed by implementing
//! [`MediaSource`](video::MediaSource):
//!
//! ```rust
//! use moment_catcher::audio::AudioData;
//! use moment_catcher::video::{Frame, MediaSource, VideoInfo};
//! use moment_catcher::Result;
//!
//! struct Slideshow {
//!     info: VideoInfo,
//!     frames: Vec<Frame>,
//! }
//!
//! impl MediaSource for Slideshow {
//!     fn info(&self) -> &VideoInfo {
//!         &self.info
//!     }
//!
//!     fn read_audio(&mut self) -> Result<Option<AudioData>> {
//!         Ok(None)
//!     }
//!
//!     fn next_frame(&mut self) -> Result<Option<Frame>> {
//!         Ok(self.frames.pop())
//!     }
//! }
//! ```

pub mod analysis;
pub mod audio;
pub mod composition;
pub mod config;
pub mod error;
pub mod service;
pub mod tools;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    analysis::Moment,
    composition::{Detection, MomentCatcher, TrailerReport},
    config::{Config, DetectionParams},
    error::{CatcherError, Result},
};
