use crate::analysis::normalizer::FeatureMatrix;
use crate::error::{AnalysisError, Result};

/// Reduces each standardized feature row to one excitement score
#[derive(Debug, Clone)]
pub struct ExcitementScorer {
    weights: Vec<f64>,
}

impl ExcitementScorer {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Dot product of every row with the weight vector
    ///
    /// The weight vector must have exactly one entry per matrix column.
    pub fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if matrix.width() != self.weights.len() {
            return Err(AnalysisError::DimensionMismatch {
                what: "feature matrix".to_string(),
                expected: self.weights.len(),
                found: matrix.width(),
            }
            .into());
        }

        Ok(matrix
            .iter_rows()
            .take(matrix.rows())
            .map(|row| row.iter().zip(&self.weights).map(|(x, w)| x * w).sum())
            .collect())
    }
}
