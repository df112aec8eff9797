use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Columns produced per audio window: energy, zero-crossing rate, spectral centroid
pub const AUDIO_FEATURE_WIDTH: usize = 3;

/// Columns produced per video frame: motion, edge density, brightness variance,
/// color variance
pub const VISUAL_FEATURE_WIDTH: usize = 4;

/// Fixed-width feature rows sampled at a known rate
///
/// Values are stored row-major. The width travels with the data so that
/// mismatched sequences are caught before they are combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSequence {
    width: usize,
    rate: f64,
    values: Vec<f64>,
}

impl FeatureSequence {
    /// Create an empty sequence with `width` columns and `rate` rows per second
    pub fn new(width: usize, rate: f64) -> Self {
        Self {
            width,
            rate,
            values: Vec::new(),
        }
    }

    /// A sequence of `len` all-zero rows
    pub fn zeros(len: usize, width: usize, rate: f64) -> Self {
        Self {
            width,
            rate,
            values: vec![0.0; len * width],
        }
    }

    /// Build from explicit rows, checking every row has `width` values
    pub fn from_rows<R: AsRef<[f64]>>(width: usize, rate: f64, rows: &[R]) -> Result<Self> {
        let mut sequence = Self::new(width, rate);
        for row in rows {
            sequence.push(row.as_ref())?;
        }
        Ok(sequence)
    }

    /// Append one row
    pub fn push(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.width {
            return Err(AnalysisError::DimensionMismatch {
                what: "feature row".to_string(),
                expected: self.width,
                found: row.len(),
            }
            .into());
        }
        self.values.extend_from_slice(row);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows per second of source time
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.width)?;
        self.values.get(start..start + self.width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.width.max(1))
    }

    /// Keep at most `len` leading rows
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len * self.width);
    }

    /// Fail unless this sequence has exactly `expected` columns
    pub fn expect_width(&self, what: &str, expected: usize) -> Result<()> {
        if self.width != expected {
            return Err(AnalysisError::DimensionMismatch {
                what: what.to_string(),
                expected,
                found: self.width,
            }
            .into());
        }
        Ok(())
    }

    /// Re-sample onto another row rate by nearest-row lookup
    ///
    /// Row `i` of the result covers time `i / target_rate` and takes the row
    /// whose start time is closest to it. The result spans the same duration
    /// as the input, rounded down to whole target rows.
    pub fn resample(&self, target_rate: f64) -> Result<Self> {
        if !(target_rate > 0.0) || !(self.rate > 0.0) {
            return Err(AnalysisError::InvalidParameters {
                details: format!("cannot resample {} rows/s to {} rows/s", self.rate, target_rate),
            }
            .into());
        }

        if (self.rate - target_rate).abs() < f64::EPSILON {
            return Ok(self.clone());
        }

        let source_len = self.len();
        let target_len = (source_len as f64 * target_rate / self.rate).floor() as usize;
        let mut resampled = Self::new(self.width, target_rate);
        resampled.values.reserve(target_len * self.width);

        for i in 0..target_len {
            let source_index = ((i as f64 * self.rate / target_rate).round() as usize)
                .min(source_len.saturating_sub(1));
            if let Some(row) = self.row(source_index) {
                resampled.values.extend_from_slice(row);
            }
        }

        Ok(resampled)
    }
}
