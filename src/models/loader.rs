//! Artifact loader
//!
//! Reads the fitted transformer, scaler and network exported by the
//! training pipeline. Any missing or unreadable artifact is a hard error:
//! the service must not start with a partial pipeline.

use crate::config::ModelsConfig;
use crate::models::network::DenseNetwork;
use crate::models::scaler::Scaler;
use crate::models::transformer::ColumnTransformer;
use crate::models::ChurnModel;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// The three fitted artifacts the scoring pipeline runs on
pub struct ScoringArtifacts {
    pub transformer: ColumnTransformer,
    pub scaler: Scaler,
    pub model: Box<dyn ChurnModel>,
}

/// Loader for the fitted artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with default settings (1 ONNX thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load all three artifacts named by the configuration
    pub fn load_all(&self, models: &ModelsConfig) -> Result<ScoringArtifacts> {
        let transformer = self.load_transformer(models.transformer_path())?;
        let scaler = self.load_scaler(models.scaler_path())?;
        let model = self.load_model(models.model_path(), scaler.n_features())?;

        info!(
            models_dir = %models.models_dir,
            backend = model.name(),
            features = model.input_width(),
            "Loaded scoring artifacts"
        );

        Ok(ScoringArtifacts {
            transformer,
            scaler,
            model,
        })
    }

    pub fn load_transformer<P: AsRef<Path>>(&self, path: P) -> Result<ColumnTransformer> {
        let path = path.as_ref();
        let transformer: ColumnTransformer = read_json(path)?;
        transformer
            .validate()
            .with_context(|| format!("Invalid transformer in {}", path.display()))?;

        info!(
            path = %path.display(),
            steps = transformer.transformers.len(),
            "Transformer loaded"
        );
        Ok(transformer)
    }

    pub fn load_scaler<P: AsRef<Path>>(&self, path: P) -> Result<Scaler> {
        let path = path.as_ref();
        let scaler: Scaler = read_json(path)?;
        scaler
            .validate()
            .with_context(|| format!("Invalid scaler in {}", path.display()))?;

        info!(
            path = %path.display(),
            kind = scaler.name(),
            features = scaler.n_features(),
            "Scaler loaded"
        );
        Ok(scaler)
    }

    /// Load the network, picking the backend from the file extension.
    ///
    /// `input_width` is only consulted by backends that cannot report it
    /// themselves.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        input_width: usize,
    ) -> Result<Box<dyn ChurnModel>> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "json" => {
                let network: DenseNetwork = read_json(path)?;
                network
                    .validate()
                    .with_context(|| format!("Invalid network in {}", path.display()))?;
                info!(
                    path = %path.display(),
                    layers = network.layers.len(),
                    "Dense network loaded"
                );
                Ok(Box::new(network))
            }
            "onnx" => self.load_onnx(path, input_width),
            other => bail!(
                "Unsupported model format '{}' for {}",
                other,
                path.display()
            ),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path, input_width: usize) -> Result<Box<dyn ChurnModel>> {
        let model = crate::models::onnx::OnnxModel::load(path, input_width, self.onnx_threads)?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: &Path, _input_width: usize) -> Result<Box<dyn ChurnModel>> {
        bail!(
            "{} is an ONNX model but this build lacks the `onnx` feature",
            path.display()
        )
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open artifact {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse artifact {}", path.display()))
}
