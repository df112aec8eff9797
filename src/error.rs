use thiserror::Error;

/// Main error type for the Moment Catcher library
#[derive(Error, Debug)]
pub enum CatcherError {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to decode audio track of {path}: {reason}")]
    DecodeFailed { path: String, reason: String },

    #[error("Audio extraction failed: {reason}")]
    ExtractFailed { reason: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video source {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Failed to probe {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodeFailed { reason: String },
}

/// Feature normalization and scoring errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{what} has {found} columns, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Row count mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Invalid analysis parameters: {details}")]
    InvalidParameters { details: String },
}

/// Trailer assembly errors
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("No moments to assemble ({detected} detected, budget {budget:.1}s)")]
    NothingToAssemble { detected: usize, budget: f64 },
}

/// Final output rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Required tool not available: {tool}")]
    ToolUnavailable { tool: String },

    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Renderer reported success but {path} was not written")]
    OutputMissing { path: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Upload/download boundary errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid file name: {name:?}")]
    InvalidFilename { name: String },

    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("Upload exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Convenience type alias for Results using CatcherError
pub type Result<T> = std::result::Result<T, CatcherError>;

impl CatcherError {
    /// True when the run ended because nothing was worth assembling
    pub fn is_empty_trailer(&self) -> bool {
        matches!(self, Self::Composition(CompositionError::NothingToAssemble { .. }))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::OpenFailed { path, .. }) => {
                format!(
                    "Could not open video '{}'. \
                     Please check the file exists and is a supported format.",
                    path
                )
            }
            Self::Composition(CompositionError::NothingToAssemble { .. }) => {
                "Failed to generate trailer: no exciting moments were found.".to_string()
            }
            Self::Render(RenderError::ToolUnavailable { tool }) => {
                format!("'{}' was not found. Please install FFmpeg.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Service(ServiceError::NotFound { .. }) => "File not found".to_string(),
            _ => format!("Processing failed: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_trailer_detection() {
        let err: CatcherError = CompositionError::NothingToAssemble {
            detected: 0,
            budget: 30.0,
        }
        .into();
        assert!(err.is_empty_trailer());
        assert!(err.user_message().contains("no exciting moments"));

        let err: CatcherError = RenderError::EncodeFailed {
            reason: "boom".to_string(),
        }
        .into();
        assert!(!err.is_empty_trailer());
        assert_eq!(err.user_message(), "Processing failed: Render error: Encoding failed: boom");
    }
}
