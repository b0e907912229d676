//! Demo Artifact Generator
//!
//! Writes a seeded, randomly initialised artifact set (transformer, scaler,
//! dense network) so the service can be started without the training
//! pipeline. Predictions from these artifacts are meaningless.
//!
//! Usage: `demo-artifacts [out_dir] [seed] [hidden_units]`

use churn_scoring_service::{
    config::ModelsConfig,
    feature_extractor::TRANSFORMER_COLUMNS,
    models::{ArtifactLoader, ChurnScorer},
    types::{customer::CustomerRecord, prediction::DEFAULT_THRESHOLD},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Column statistics of the bank churn training set, after one-hot encoding
/// Geography (Germany, Spain) and dropping the target.
const FEATURE_MEAN: [f64; 11] = [
    0.2509, 0.2477, 650.5288, 0.5457, 38.9218, 5.0128, 76485.8893, 1.5302, 0.7055, 0.5151,
    100090.2399,
];
const FEATURE_SCALE: [f64; 11] = [
    0.4336, 0.4317, 96.6481, 0.4979, 10.4873, 2.8920, 62394.2851, 0.5817, 0.4558, 0.4998,
    57507.6172,
];

/// Glorot-uniform initialised `[inputs][units]` kernel
fn glorot_kernel(rng: &mut StdRng, inputs: usize, units: usize) -> Vec<Vec<f32>> {
    let limit = (6.0 / (inputs + units) as f32).sqrt();
    (0..inputs)
        .map(|_| (0..units).map(|_| rng.gen_range(-limit..limit)).collect())
        .collect()
}

fn dense_layer(rng: &mut StdRng, inputs: usize, units: usize, activation: &str) -> Value {
    json!({
        "kernel": glorot_kernel(rng, inputs, units),
        "bias": vec![0.0_f32; units],
        "activation": activation,
    })
}

fn write_json(path: &Path, value: &Value) -> anyhow::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    info!(path = %path.display(), "Wrote artifact");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("demo_artifacts=info".parse()?)
                .add_directive("churn_scoring_service=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let out_dir = args.get(1).map(|s| s.as_str()).unwrap_or("model");
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);
    let hidden: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(8);

    info!(out_dir = %out_dir, seed = seed, hidden_units = hidden, "Generating demo artifacts");

    std::fs::create_dir_all(out_dir)?;
    let out_dir = Path::new(out_dir);
    let mut rng = StdRng::seed_from_u64(seed);

    let transformer = json!({
        "feature_names_in": TRANSFORMER_COLUMNS,
        "transformers": [{
            "name": "ohe",
            "kind": "one_hot",
            "columns": ["Geography"],
            "categories": [["France", "Germany", "Spain"]],
            "drop": "first",
            "handle_unknown": "error",
        }],
        "remainder": "passthrough",
    });

    let scaler = json!({
        "kind": "standard",
        "mean": FEATURE_MEAN,
        "scale": FEATURE_SCALE,
    });

    let features = FEATURE_MEAN.len();
    let network = json!({
        "layers": [
            dense_layer(&mut rng, features, hidden, "relu"),
            dense_layer(&mut rng, hidden, hidden, "relu"),
            dense_layer(&mut rng, hidden, 1, "sigmoid"),
        ],
    });

    let models = ModelsConfig {
        models_dir: out_dir.to_string_lossy().into_owned(),
        ..ModelsConfig::default()
    };
    write_json(&models.transformer_path(), &transformer)?;
    write_json(&models.scaler_path(), &scaler)?;
    write_json(&models.model_path(), &network)?;

    // Round-trip through the real loader to prove the set is servable
    let artifacts = ArtifactLoader::new().load_all(&models)?;
    let scorer = ChurnScorer::new(artifacts, DEFAULT_THRESHOLD)?;
    let sample = CustomerRecord::sample();
    let result = scorer.score(&sample)?;

    info!(
        probability = result.probability,
        label = ?result.label,
        "Sample customer scored with demo artifacts"
    );

    Ok(())
}
