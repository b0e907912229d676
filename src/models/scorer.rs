//! Churn scorer: the immutable scoring context shared by all requests

use crate::error::{PipelineResult, ScoreError};
use crate::feature_extractor::{FeatureExtractor, TRANSFORMER_COLUMNS};
use crate::models::loader::ScoringArtifacts;
use crate::types::customer::CustomerRecord;
use crate::types::prediction::ScoreResult;
use anyhow::{bail, Result};
use tracing::{debug, info};

/// Scoring pipeline over frozen artifacts.
///
/// Built once at startup and shared behind an `Arc`; nothing in it is
/// mutated afterwards, so concurrent `score` calls need no coordination.
pub struct ChurnScorer {
    extractor: FeatureExtractor,
    artifacts: ScoringArtifacts,
    threshold: f64,
}

impl ChurnScorer {
    /// Assemble the pipeline, checking that the artifacts fit together.
    pub fn new(artifacts: ScoringArtifacts, threshold: f64) -> Result<Self> {
        if let Some(names) = &artifacts.transformer.feature_names_in {
            if names.iter().map(String::as_str).ne(TRANSFORMER_COLUMNS.iter().copied()) {
                bail!(
                    "Transformer was fit on columns {:?}, expected {:?}",
                    names,
                    TRANSFORMER_COLUMNS
                );
            }
        }

        for step in &artifacts.transformer.transformers {
            if let Some(column) = step
                .columns
                .iter()
                .find(|c| !TRANSFORMER_COLUMNS.contains(&c.as_str()))
            {
                bail!(
                    "Transformer step '{}' uses column '{}', which is not one of {:?}",
                    step.name,
                    column,
                    TRANSFORMER_COLUMNS
                );
            }
        }

        let transformed = artifacts.transformer.output_width(&TRANSFORMER_COLUMNS);
        if transformed == 0 {
            bail!("Transformer produces no columns");
        }
        let scaler_width = artifacts.scaler.n_features();
        if transformed - 1 != scaler_width {
            bail!(
                "Transformer yields {} features after dropping the target, scaler expects {}",
                transformed - 1,
                scaler_width
            );
        }
        if artifacts.model.input_width() != scaler_width {
            bail!(
                "Scaler yields {} features, model expects {}",
                scaler_width,
                artifacts.model.input_width()
            );
        }

        info!(
            features = scaler_width,
            backend = artifacts.model.name(),
            threshold = threshold,
            "Churn scorer ready"
        );

        Ok(Self {
            extractor: FeatureExtractor::new(),
            artifacts,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.artifacts.model.name()
    }

    pub fn feature_count(&self) -> usize {
        self.artifacts.model.input_width()
    }

    /// Raw model probability for a customer, before thresholding/rounding.
    pub fn probability(&self, customer: &CustomerRecord) -> PipelineResult<f64> {
        let row = self.extractor.extract(customer);

        let mut transformed = self.artifacts.transformer.transform(&row)?;
        // last column is the placeholder target
        if transformed.pop().is_none() {
            return Err(ScoreError::EmptyTransform);
        }

        let scaled = self.artifacts.scaler.transform(&transformed)?;

        // the network runs in single precision
        let input: Vec<f32> = scaled.iter().map(|&v| v as f32).collect();
        let probability = f64::from(self.artifacts.model.predict(&input)?);

        if !(0.0..=1.0).contains(&probability) {
            return Err(ScoreError::ModelOutput(format!(
                "probability {} is outside [0, 1]",
                probability
            )));
        }

        Ok(probability)
    }

    /// Score one customer.
    pub fn score(&self, customer: &CustomerRecord) -> PipelineResult<ScoreResult> {
        let probability = self.probability(customer)?;
        let result = ScoreResult::from_raw(probability, self.threshold);

        debug!(
            geography = %customer.geography,
            probability = probability,
            label = ?result.label,
            "Customer scored"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelsConfig;
    use crate::models::loader::ArtifactLoader;
    use crate::models::ChurnModel;
    use crate::types::prediction::{ChurnLabel, DEFAULT_THRESHOLD};
    use std::path::Path;

    fn fixture_artifacts() -> ScoringArtifacts {
        let config = ModelsConfig {
            models_dir: Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("tests/fixtures/model")
                .to_string_lossy()
                .into_owned(),
            ..ModelsConfig::default()
        };
        ArtifactLoader::new().load_all(&config).unwrap()
    }

    fn scorer() -> ChurnScorer {
        ChurnScorer::new(fixture_artifacts(), DEFAULT_THRESHOLD).unwrap()
    }

    /// Returns a fixed probability regardless of input
    struct ConstantModel(f32);

    impl ChurnModel for ConstantModel {
        fn name(&self) -> &str {
            "constant"
        }

        fn input_width(&self) -> usize {
            11
        }

        fn predict(&self, _features: &[f32]) -> PipelineResult<f32> {
            Ok(self.0)
        }
    }

    fn scorer_with_model(model: ConstantModel) -> ChurnScorer {
        let mut artifacts = fixture_artifacts();
        artifacts.model = Box::new(model);
        ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).unwrap()
    }

    #[test]
    fn test_reference_customer_sits_on_threshold() {
        // France, age 40: every weighted feature scales to zero
        let result = scorer().score(&CustomerRecord::sample()).unwrap();
        assert_eq!(result.probability, 0.5);
        assert_eq!(result.label, ChurnLabel::No);
    }

    #[test]
    fn test_older_customer_churns() {
        let mut customer = CustomerRecord::sample();
        customer.age = 50;

        let result = scorer().score(&customer).unwrap();
        assert_eq!(result.probability, 0.7311);
        assert_eq!(result.label, ChurnLabel::Yes);
    }

    #[test]
    fn test_geography_is_one_hot_encoded() {
        let mut customer = CustomerRecord::sample();
        customer.geography = "Germany".to_string();

        let result = scorer().score(&customer).unwrap();
        assert_eq!(result.probability, 0.8808);
        assert_eq!(result.label, ChurnLabel::Yes);
    }

    #[test]
    fn test_younger_customer_stays() {
        let mut customer = CustomerRecord::sample();
        customer.age = 30;

        let result = scorer().score(&customer).unwrap();
        assert_eq!(result.probability, 0.2689);
        assert_eq!(result.label, ChurnLabel::No);
    }

    #[test]
    fn test_score_is_idempotent() {
        let scorer = scorer();
        let customer = CustomerRecord::sample();
        assert_eq!(scorer.score(&customer), scorer.score(&customer));

        let mut other = customer.clone();
        other.geography = "Spain".to_string();
        other.gender = "MALE".to_string();
        assert_eq!(scorer.score(&other), scorer.score(&other));
    }

    #[test]
    fn test_unknown_geography_is_an_error_result() {
        let mut customer = CustomerRecord::sample();
        customer.geography = "Atlantis".to_string();

        let err = scorer().score(&customer).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Found unknown categories ['Atlantis'] in column 0 during transform"
        );
    }

    #[test]
    fn test_probability_just_above_threshold() {
        let result = scorer_with_model(ConstantModel(0.50001)).score(&CustomerRecord::sample());
        assert_eq!(result.unwrap().label, ChurnLabel::Yes);

        let result = scorer_with_model(ConstantModel(0.5)).score(&CustomerRecord::sample());
        assert_eq!(result.unwrap().label, ChurnLabel::No);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        let err = scorer_with_model(ConstantModel(1.5))
            .score(&CustomerRecord::sample())
            .unwrap_err();
        assert!(matches!(err, ScoreError::ModelOutput(_)));

        let err = scorer_with_model(ConstantModel(f32::NAN))
            .score(&CustomerRecord::sample())
            .unwrap_err();
        assert!(matches!(err, ScoreError::ModelOutput(_)));
    }

    #[test]
    fn test_mismatched_artifacts_rejected_at_startup() {
        struct WideModel;
        impl ChurnModel for WideModel {
            fn name(&self) -> &str {
                "wide"
            }
            fn input_width(&self) -> usize {
                12
            }
            fn predict(&self, _features: &[f32]) -> PipelineResult<f32> {
                Ok(0.0)
            }
        }

        let mut artifacts = fixture_artifacts();
        artifacts.model = Box::new(WideModel);
        assert!(ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).is_err());
    }

    #[test]
    fn test_wrong_training_columns_rejected_at_startup() {
        let mut artifacts = fixture_artifacts();
        let mut names: Vec<String> = TRANSFORMER_COLUMNS.iter().map(|c| c.to_string()).collect();
        names.swap(0, 1);
        artifacts.transformer.feature_names_in = Some(names);

        let err = ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).err().unwrap();
        assert!(err.to_string().contains("Transformer was fit on columns"));
    }

    #[test]
    fn test_unknown_step_column_rejected_without_fit_names() {
        let mut artifacts = fixture_artifacts();
        artifacts.transformer.feature_names_in = None;
        artifacts.transformer.transformers[0].columns = vec!["Surname".to_string()];

        let err = ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).err().unwrap();
        assert!(err.to_string().contains("uses column 'Surname'"));
    }

    #[test]
    fn test_missing_fit_names_still_loads() {
        let mut artifacts = fixture_artifacts();
        artifacts.transformer.feature_names_in = None;

        let scorer = ChurnScorer::new(artifacts, DEFAULT_THRESHOLD).unwrap();
        let result = scorer.score(&CustomerRecord::sample()).unwrap();
        assert_eq!(result.probability, 0.5);
    }
}
