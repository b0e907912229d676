//! Type definitions for the churn scoring service

pub mod customer;
pub mod prediction;

pub use customer::{CustomerRecord, GenderFlag};
pub use prediction::{ChurnLabel, ScoreResponse, ScoreResult};
