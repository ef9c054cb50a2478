//! Error types for the classification pipeline

use std::fmt;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Preprocess,
    ModelLoad,
    Inference,
    Compose,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Preprocess => "preprocess",
            PipelineStage::ModelLoad => "model_load",
            PipelineStage::Inference => "inference",
            PipelineStage::Compose => "compose",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for a single classification
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Uploaded bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Model artifact missing or corrupt
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// Model ran but the output could not be used
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Model returned no scores
    #[error("Model returned an empty score vector")]
    EmptyScores,
}

impl PipelineError {
    /// Stage that produced this error
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Decode(_) => PipelineStage::Preprocess,
            PipelineError::ModelLoad { .. } => PipelineStage::ModelLoad,
            PipelineError::Inference(_) => PipelineStage::Inference,
            PipelineError::EmptyScores => PipelineStage::Inference,
        }
    }

    /// Whether the caller sent something we cannot process
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Decode(_))
    }
}
