//! ONNX Runtime model backend (requires the `onnx` feature)

use crate::error::{PipelineResult, ScoreError};
use crate::models::ChurnModel;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Churn model served through an ONNX Runtime session
pub struct OnnxModel {
    /// `Session::run` needs `&mut`, the scorer is shared read-only
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_width: usize,
}

impl OnnxModel {
    /// Load an exported Keras model (e.g. via tf2onnx).
    ///
    /// `input_width` is the number of features the model expects; ONNX
    /// exports usually leave the batch dimension dynamic but fix this one.
    pub fn load<P: AsRef<Path>>(path: P, input_width: usize, threads: usize) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("ONNX model declares no inputs")?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .context("ONNX model declares no outputs")?;

        info!(
            input = %input_name,
            output = %output_name,
            input_width = input_width,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_width,
        })
    }
}

impl ChurnModel for OnnxModel {
    fn name(&self) -> &str {
        "onnx"
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn predict(&self, features: &[f32]) -> PipelineResult<f32> {
        if features.len() != self.input_width {
            return Err(ScoreError::ShapeMismatch {
                stage: "OnnxModel",
                expected: self.input_width,
                actual: features.len(),
            });
        }

        // shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| ScoreError::Backend(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ScoreError::Backend(format!("Lock error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| ScoreError::Backend(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ScoreError::ModelOutput(format!("missing output '{}'", self.output_name)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ScoreError::ModelOutput(e.to_string()))?;

        // [batch, 1] sigmoid output
        let probability = data
            .first()
            .copied()
            .ok_or_else(|| ScoreError::ModelOutput("empty output tensor".to_string()))?;

        debug!(probability = probability, "ONNX inference complete");

        Ok(probability)
    }
}
