//! Dense feed-forward network evaluator.
//!
//! Evaluates a stack of fully connected layers exported from a Keras
//! `Sequential` model of `Dense` layers. Weights are stored the way Keras
//! stores them (`kernel[input][unit]`) and arithmetic runs in `f32`.

use crate::error::{PipelineResult, ScoreError};
use crate::models::ChurnModel;
use anyhow::{bail, Result};
use serde::Deserialize;

/// Activation applied after a dense layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// One fully connected layer
#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    /// `[input][unit]` weight matrix
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    pub fn input_width(&self) -> usize {
        self.kernel.len()
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.kernel) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        for v in out.iter_mut() {
            *v = self.activation.apply(*v);
        }
        out
    }
}

/// Network of dense layers producing a single probability
#[derive(Debug, Clone, Deserialize)]
pub struct DenseNetwork {
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            bail!("network has no layers");
        }
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.input_width() == 0 || layer.units() == 0 {
                bail!("layer {} is empty", idx);
            }
            if layer.kernel.iter().any(|row| row.len() != layer.units()) {
                bail!(
                    "layer {} kernel rows do not match its {} units",
                    idx,
                    layer.units()
                );
            }
            if idx > 0 && self.layers[idx - 1].units() != layer.input_width() {
                bail!(
                    "layer {} expects {} inputs but layer {} produces {}",
                    idx,
                    layer.input_width(),
                    idx - 1,
                    self.layers[idx - 1].units()
                );
            }
        }
        if self.output_width() != 1 {
            bail!(
                "network must end in a single unit, found {}",
                self.output_width()
            );
        }
        Ok(())
    }

    fn output_width(&self) -> usize {
        self.layers.last().map(DenseLayer::units).unwrap_or(0)
    }
}

impl ChurnModel for DenseNetwork {
    fn name(&self) -> &str {
        "dense"
    }

    fn input_width(&self) -> usize {
        self.layers.first().map(DenseLayer::input_width).unwrap_or(0)
    }

    fn predict(&self, features: &[f32]) -> PipelineResult<f32> {
        let expected = self.input_width();
        if features.len() != expected {
            return Err(ScoreError::ShapeMismatch {
                stage: "DenseNetwork",
                expected,
                actual: features.len(),
            });
        }

        let mut activations = features.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        match activations.as_slice() {
            [p] => Ok(*p),
            other => Err(ScoreError::ModelOutput(format!(
                "expected 1 output, got {}",
                other.len()
            ))),
        }
    }
}
