//! Churn prediction result and response payloads

use serde::{Deserialize, Serialize};

/// Default decision threshold; a probability must be strictly above it.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Binary churn decision as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChurnLabel {
    Yes,
    No,
}

impl ChurnLabel {
    /// Label a raw probability; exactly `threshold` is still `No`.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            ChurnLabel::Yes
        } else {
            ChurnLabel::No
        }
    }
}

/// Outcome of scoring one customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Churn probability rounded to 4 decimal places
    pub probability: f64,

    /// Thresholded decision
    #[serde(rename = "churn_prediction")]
    pub label: ChurnLabel,
}

impl ScoreResult {
    /// Build a result from the model's raw probability.
    ///
    /// The label is decided on the unrounded value.
    pub fn from_raw(probability: f64, threshold: f64) -> Self {
        Self {
            probability: round4(probability),
            label: ChurnLabel::from_probability(probability, threshold),
        }
    }
}

/// Body returned by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreResponse {
    Scored(ScoreResult),
    Failed { error: String },
}

/// Round to 4 decimal places the way Python's `round(x, 4)` does.
///
/// Formatting is correctly rounded from the exact binary value, so this
/// avoids the double rounding of `(x * 1e4).round() / 1e4`.
pub fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.4}").parse().unwrap_or(value)
}
