//! Fitted feature scalers

use crate::error::{PipelineResult, ScoreError};
use anyhow::{bail, Result};
use serde::Deserialize;

/// Scaler exported from the training pipeline, tagged by `kind`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

/// `(x - mean) / scale`, per feature
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
}

/// `x * scale + min`, per feature
#[derive(Debug, Clone, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

fn default_true() -> bool {
    true
}

impl Scaler {
    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Scaler::Standard(_) => "StandardScaler",
            Scaler::MinMax(_) => "MinMaxScaler",
        }
    }

    /// Number of features the scaler was fit on.
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard(s) => s.scale.len(),
            Scaler::MinMax(s) => s.scale.len(),
        }
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<()> {
        let (a, b) = match self {
            Scaler::Standard(s) => (s.mean.len(), s.scale.len()),
            Scaler::MinMax(s) => (s.min.len(), s.scale.len()),
        };
        if a != b {
            bail!("{} parameter lengths differ ({} vs {})", self.name(), a, b);
        }
        if a == 0 {
            bail!("{} has no features", self.name());
        }
        if let Scaler::Standard(s) = self {
            if s.scale.iter().any(|v| *v == 0.0 || !v.is_finite()) {
                bail!("StandardScaler scale contains zero or non-finite values");
            }
        }
        Ok(())
    }

    /// Scale one feature vector.
    pub fn transform(&self, features: &[f64]) -> PipelineResult<Vec<f64>> {
        let expected = self.n_features();
        if features.len() != expected {
            return Err(ScoreError::ShapeMismatch {
                stage: self.name(),
                expected,
                actual: features.len(),
            });
        }

        let scaled = match self {
            Scaler::Standard(s) => features
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    let centered = if s.with_mean { x - s.mean[i] } else { x };
                    if s.with_std {
                        centered / s.scale[i]
                    } else {
                        centered
                    }
                })
                .collect(),
            Scaler::MinMax(s) => features
                .iter()
                .enumerate()
                .map(|(i, &x)| x * s.scale[i] + s.min[i])
                .collect(),
        };

        Ok(scaled)
    }
}
