use tracing::debug;

use crate::analysis::features::{FeatureSequence, AUDIO_FEATURE_WIDTH, VISUAL_FEATURE_WIDTH};
use crate::error::{AnalysisError, Result};

/// Aligned, concatenated and standardized audio + visual features
///
/// One row per video frame; columns are the audio features followed by the
/// visual features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    width: usize,
    rate: f64,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows per second, equal to the video frame rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.width;
        Some(&self.values[start..start + self.width])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.width.max(1))
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().skip(index).step_by(self.width.max(1)).copied()
    }
}

/// Joins the two feature streams into one standardized matrix
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Align, concatenate and standardize
    ///
    /// The audio sequence is first moved onto the visual sequence's time base,
    /// then both are cut to the shorter length. Each column is standardized to
    /// zero mean and unit variance over this run's rows only; constant columns
    /// become all zeros.
    pub fn normalize(
        &self,
        audio: &FeatureSequence,
        visual: &FeatureSequence,
    ) -> Result<FeatureMatrix> {
        audio.expect_width("audio features", AUDIO_FEATURE_WIDTH)?;
        visual.expect_width("visual features", VISUAL_FEATURE_WIDTH)?;

        let mut audio = audio.resample(visual.rate())?;
        let mut visual = visual.clone();

        let rows = audio.len().min(visual.len());
        debug!(
            "Aligning {} audio rows with {} visual rows -> {} rows",
            audio.len(),
            visual.len(),
            rows
        );
        audio.truncate(rows);
        visual.truncate(rows);

        let mut matrix = concatenate(&audio, &visual)?;
        standardize(&mut matrix);
        Ok(matrix)
    }
}

fn concatenate(audio: &FeatureSequence, visual: &FeatureSequence) -> Result<FeatureMatrix> {
    if audio.len() != visual.len() {
        return Err(AnalysisError::LengthMismatch {
            expected: visual.len(),
            found: audio.len(),
        }
        .into());
    }

    let width = audio.width() + visual.width();
    let mut values = Vec::with_capacity(audio.len() * width);
    for (a, v) in audio.rows().zip(visual.rows()) {
        values.extend_from_slice(a);
        values.extend_from_slice(v);
    }

    Ok(FeatureMatrix {
        rows: audio.len(),
        width,
        rate: visual.rate(),
        values,
    })
}

fn standardize(matrix: &mut FeatureMatrix) {
    if matrix.rows == 0 {
        return;
    }

    let n = matrix.rows as f64;
    for col in 0..matrix.width {
        let mean = matrix.column(col).sum::<f64>() / n;
        let variance = matrix.column(col).map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };

        for row in 0..matrix.rows {
            let value = &mut matrix.values[row * matrix.width + col];
            *value = (*value - mean) / scale;
        }
    }
}
