//! Feature extraction for churn model inference.
//!
//! Builds the single-row table handed to the fitted column transformer.
//! Columns are emitted in the exact order the transformer was fit on,
//! including the trailing target column the training frame still carried.

use crate::types::customer::CustomerRecord;
use std::fmt;

/// Transformer input columns, in training order.
///
/// The last entry is the target column. It is present only because the
/// transformer was fit on a frame that still contained it.
pub const TRANSFORMER_COLUMNS: [&str; 11] = [
    "CreditScore",
    "Geography",
    "Gender",
    "Age",
    "Tenure",
    "Balance",
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "Exited",
];

/// Name of the trailing target column.
pub const TARGET_COLUMN: &str = "Exited";

/// Value written into the target column. Only its position matters.
pub const PLACEHOLDER_TARGET: f64 = 0.0;

/// One cell of the transformer input row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Category(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Category(s) => write!(f, "{s}"),
        }
    }
}

/// A single named row, cells aligned with `columns`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub columns: &'static [&'static str],
    pub cells: Vec<Cell>,
}

impl FeatureRow {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| self.cells.get(idx))
    }
}

/// Turns customer records into transformer input rows.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the transformer input row for a customer.
    ///
    /// Gender is replaced by its 0/1 flag and the placeholder target is
    /// appended last.
    pub fn extract(&self, customer: &CustomerRecord) -> FeatureRow {
        let mut cells = Vec::with_capacity(TRANSFORMER_COLUMNS.len());

        cells.push(Cell::Number(customer.credit_score as f64));
        cells.push(Cell::Category(customer.geography.clone()));
        cells.push(Cell::Number(customer.gender_flag().as_f64()));
        cells.push(Cell::Number(customer.age as f64));
        cells.push(Cell::Number(customer.tenure as f64));
        cells.push(Cell::Number(customer.balance));
        cells.push(Cell::Number(customer.num_of_products as f64));
        cells.push(Cell::Number(customer.has_cr_card as f64));
        cells.push(Cell::Number(customer.is_active_member as f64));
        cells.push(Cell::Number(customer.estimated_salary));

        cells.push(Cell::Number(PLACEHOLDER_TARGET));

        FeatureRow {
            columns: &TRANSFORMER_COLUMNS,
            cells,
        }
    }

    pub fn feature_count(&self) -> usize {
        TRANSFORMER_COLUMNS.len()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &TRANSFORMER_COLUMNS
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
