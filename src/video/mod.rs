//! # Video Processing Module
//!
//! Opens video sources, turns their frames into visual features and renders
//! the final trailer.

pub mod features;
pub mod probe;
pub mod renderer;
pub mod source;
pub mod types;

pub use features::VisualFeatureExtractor;
pub use probe::probe;
pub use renderer::{FfmpegRenderer, RenderRequest, TrailerRenderer};
pub use source::{FfmpegSource, MediaSource, MemorySource};
pub use types::{Frame, VideoInfo};
