//! Fitted column transformer.
//!
//! Mirrors scikit-learn's `ColumnTransformer` at inference time: each step
//! consumes named columns and the outputs are concatenated in step order,
//! followed by the remainder columns in input order.

use crate::error::{PipelineResult, ScoreError};
use crate::feature_extractor::{Cell, FeatureRow};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// Column transformer exported from the training pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnTransformer {
    /// Columns seen during fit, in order
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
    /// Fitted steps, applied in order
    pub transformers: Vec<TransformerStep>,
    /// What happens to columns no step claims
    #[serde(default)]
    pub remainder: Remainder,
}

/// A named step applied to a subset of columns
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerStep {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    OneHot(OneHotEncoder),
    Passthrough,
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

/// Fitted one-hot encoder
#[derive(Debug, Clone, Deserialize)]
pub struct OneHotEncoder {
    /// Categories per input column, in fitted (sorted) order
    pub categories: Vec<Vec<Category>>,
    #[serde(default)]
    pub drop: DropPolicy,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

/// A fitted category: numeric columns (such as the gender flag) are fitted
/// on numbers, text columns on labels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Number(f64),
    Label(String),
}

impl Category {
    fn is_number(&self) -> bool {
        matches!(self, Category::Number(_))
    }

    fn matches(&self, cell: &Cell) -> bool {
        match (self, cell) {
            (Category::Number(c), Cell::Number(v)) => c == v,
            (Category::Label(c), Cell::Category(v)) => c == v,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    #[default]
    None,
    First,
    IfBinary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

impl OneHotEncoder {
    /// Whether the first category of a column is dropped from the output.
    fn drops_first(&self, categories: &[Category]) -> bool {
        match self.drop {
            DropPolicy::None => false,
            DropPolicy::First => true,
            DropPolicy::IfBinary => categories.len() == 2,
        }
    }

    fn output_width(&self) -> usize {
        self.categories
            .iter()
            .map(|cats| cats.len() - usize::from(self.drops_first(cats)))
            .sum()
    }

    fn encode(&self, columns: &[String], cells: &[&Cell], out: &mut Vec<f64>) -> PipelineResult<()> {
        for (column_index, (cell, categories)) in cells.iter().zip(&self.categories).enumerate() {
            // validate() guarantees a single kind per column
            let numeric_column = categories.first().is_some_and(Category::is_number);
            match cell {
                Cell::Number(_) if !numeric_column => {
                    return Err(ScoreError::NotCategorical(columns[column_index].clone()))
                }
                Cell::Category(_) if numeric_column => {
                    return Err(ScoreError::NotNumeric(columns[column_index].clone()))
                }
                _ => {}
            }

            let position = categories.iter().position(|c| c.matches(cell));
            if position.is_none() && self.handle_unknown == HandleUnknown::Error {
                return Err(ScoreError::UnknownCategory {
                    value: cell.to_string(),
                    column_index,
                });
            }

            let skip = usize::from(self.drops_first(categories));
            for idx in skip..categories.len() {
                out.push(if position == Some(idx) { 1.0 } else { 0.0 });
            }
        }
        Ok(())
    }
}

impl ColumnTransformer {
    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<()> {
        let mut claimed = HashSet::new();
        for step in &self.transformers {
            for column in &step.columns {
                if !claimed.insert(column.as_str()) {
                    bail!("column '{}' is claimed by more than one step", column);
                }
                if let Some(names) = &self.feature_names_in {
                    if !names.contains(column) {
                        bail!("step '{}' uses unknown column '{}'", step.name, column);
                    }
                }
            }

            if let StepKind::OneHot(encoder) = &step.kind {
                if encoder.categories.len() != step.columns.len() {
                    bail!(
                        "step '{}' has {} category lists for {} columns",
                        step.name,
                        encoder.categories.len(),
                        step.columns.len()
                    );
                }
                if encoder.categories.iter().any(|cats| cats.is_empty()) {
                    bail!("step '{}' has a column with no categories", step.name);
                }
                for (column, cats) in step.columns.iter().zip(&encoder.categories) {
                    if cats.iter().any(|c| c.is_number() != cats[0].is_number()) {
                        bail!(
                            "step '{}' mixes numeric and text categories for column '{}'",
                            step.name,
                            column
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of output columns for the given input columns.
    pub fn output_width(&self, input_columns: &[&str]) -> usize {
        let mut width = 0;
        for step in &self.transformers {
            width += match &step.kind {
                StepKind::OneHot(encoder) => encoder.output_width(),
                StepKind::Passthrough => step.columns.len(),
                StepKind::Drop => 0,
            };
        }
        if self.remainder == Remainder::Passthrough {
            width += self.remainder_columns(input_columns).count();
        }
        width
    }

    fn remainder_columns<'a>(&'a self, input_columns: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
        input_columns.iter().copied().filter(move |column| {
            !self
                .transformers
                .iter()
                .any(|step| step.columns.iter().any(|c| c == column))
        })
    }

    /// Transform a single row into a numeric feature vector.
    pub fn transform(&self, row: &FeatureRow) -> PipelineResult<Vec<f64>> {
        if let Some(names) = &self.feature_names_in {
            if names.len() != row.len() {
                return Err(ScoreError::ShapeMismatch {
                    stage: "ColumnTransformer",
                    expected: names.len(),
                    actual: row.len(),
                });
            }
        }

        let mut out = Vec::with_capacity(self.output_width(row.columns));

        for step in &self.transformers {
            let cells = step
                .columns
                .iter()
                .map(|c| row.get(c).ok_or_else(|| ScoreError::MissingColumn(c.clone())))
                .collect::<PipelineResult<Vec<_>>>()?;

            match &step.kind {
                StepKind::OneHot(encoder) => encoder.encode(&step.columns, &cells, &mut out)?,
                StepKind::Passthrough => {
                    for (column, cell) in step.columns.iter().zip(cells) {
                        out.push(numeric(column, cell)?);
                    }
                }
                StepKind::Drop => {}
            }
        }

        if self.remainder == Remainder::Passthrough {
            for column in self.remainder_columns(row.columns) {
                let cell = row
                    .get(column)
                    .ok_or_else(|| ScoreError::MissingColumn(column.to_string()))?;
                out.push(numeric(column, cell)?);
            }
        }

        Ok(out)
    }
}

fn numeric(column: &str, cell: &Cell) -> PipelineResult<f64> {
    match cell {
        Cell::Number(v) => Ok(*v),
        Cell::Category(_) => Err(ScoreError::NotNumeric(column.to_string())),
    }
}
