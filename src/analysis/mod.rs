//! # Excitement Analysis
//!
//! Turns the per-window audio and visual feature streams into a ranked list
//! of moments:
//!
//! 1. [`FeatureNormalizer`] aligns both streams on the video frame grid,
//!    concatenates them and standardizes every column.
//! 2. [`ExcitementScorer`] weights each row into one scalar score.
//! 3. [`PeakSelector`] keeps well-separated peaks above a percentile
//!    threshold and converts the best of them into [`Moment`]s.
//!
//! ```rust
//! use moment_catcher::analysis::{find_peaks, percentile};
//!
//! let scores = [0.0, 0.2, 0.1, 1.5, 0.3, 0.0];
//! let threshold = percentile(&scores, 70.0);
//! assert_eq!(find_peaks(&scores, threshold, 1), vec![3]);
//! ```

pub mod features;
pub mod normalizer;
pub mod peaks;
pub mod scoring;

pub use features::{FeatureSequence, AUDIO_FEATURE_WIDTH, VISUAL_FEATURE_WIDTH};
pub use normalizer::{FeatureMatrix, FeatureNormalizer};
pub use peaks::{find_peaks, percentile, Moment, PeakSelector, Timeline};
pub use scoring::ExcitementScorer;
