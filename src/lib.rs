//! Churn Scoring Service Library
//!
//! Serves churn-probability predictions for bank customers from a
//! pre-trained classifier, reproducing the training-time preprocessing
//! (column transform, scaling) exactly.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::ScoreError;
pub use feature_extractor::FeatureExtractor;
pub use models::scorer::ChurnScorer;
pub use types::{customer::CustomerRecord, prediction::ScoreResult};
