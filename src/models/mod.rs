//! Fitted artifacts and the scoring pipeline built from them

pub mod loader;
pub mod network;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;
pub mod scorer;
pub mod transformer;

pub use loader::{ArtifactLoader, ScoringArtifacts};
pub use network::DenseNetwork;
pub use scaler::Scaler;
pub use scorer::ChurnScorer;
pub use transformer::ColumnTransformer;

use crate::error::PipelineResult;

/// A trained binary classifier mapping scaled features to a churn probability.
///
/// Implementations are immutable after load and shared across requests.
pub trait ChurnModel: Send + Sync {
    /// Backend name, reported by the health endpoint
    fn name(&self) -> &str;

    /// Number of features the model consumes
    fn input_width(&self) -> usize;

    /// Probability of the positive (churn) class for one feature vector
    fn predict(&self, features: &[f32]) -> PipelineResult<f32>;
}
