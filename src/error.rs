//! Error types for the scoring pipeline.
//!
//! Startup paths (config, artifact loading) use `anyhow`; the per-request
//! pipeline returns [`ScoreError`] so a failed score never takes the
//! service down.

/// Failure raised while transforming, scaling or predicting a single record.
///
/// The `Display` output is the message returned to the client in the
/// `{"error": ...}` payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("Found unknown categories ['{value}'] in column {column_index} during transform")]
    UnknownCategory { value: String, column_index: usize },

    #[error("Column '{0}' is categorical but received a numeric value")]
    NotCategorical(String),

    #[error("Column '{0}' is numeric but received a string value")]
    NotNumeric(String),

    #[error("Column '{0}' is not present in the input row")]
    MissingColumn(String),

    #[error("X has {actual} features, but {stage} is expecting {expected} features as input.")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Transformer produced no columns to drop")]
    EmptyTransform,

    #[error("Model output is invalid: {0}")]
    ModelOutput(String),

    #[error("{0}")]
    Backend(String),
}

/// Result alias for the request path.
pub type PipelineResult<T> = Result<T, ScoreError>;
