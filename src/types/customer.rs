//! Customer record submitted for churn scoring

use serde::{Deserialize, Serialize};

/// Customer attributes scored by the churn model.
///
/// Field names match the training dataset columns, which are also the JSON
/// keys accepted by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Country of residence (France, Germany, Spain in the training data)
    #[serde(rename = "Geography")]
    pub geography: String,

    /// Credit score
    #[serde(rename = "CreditScore")]
    pub credit_score: i64,

    /// Gender as free text; only "male" (any case) is treated as male
    #[serde(rename = "Gender")]
    pub gender: String,

    /// Age in years
    #[serde(rename = "Age")]
    pub age: i64,

    /// Years as a customer
    #[serde(rename = "Tenure")]
    pub tenure: i64,

    /// Account balance
    #[serde(rename = "Balance")]
    pub balance: f64,

    /// Number of bank products held
    #[serde(rename = "NumOfProducts")]
    pub num_of_products: i64,

    /// Has a credit card (0/1)
    #[serde(rename = "HasCrCard")]
    pub has_cr_card: i64,

    /// Is an active member (0/1)
    #[serde(rename = "IsActiveMember")]
    pub is_active_member: i64,

    /// Estimated yearly salary
    #[serde(rename = "EstimatedSalary")]
    pub estimated_salary: f64,
}

impl CustomerRecord {
    /// Gender encoded the way the training data was encoded.
    pub fn gender_flag(&self) -> GenderFlag {
        GenderFlag::from_label(&self.gender)
    }

    /// Sample customer used by the demo tooling and tests.
    pub fn sample() -> Self {
        Self {
            geography: "France".to_string(),
            credit_score: 650,
            gender: "Female".to_string(),
            age: 40,
            tenure: 3,
            balance: 0.0,
            num_of_products: 2,
            has_cr_card: 1,
            is_active_member: 1,
            estimated_salary: 50000.0,
        }
    }
}

/// Binary gender encoding (1 = male, 0 = anything else)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderFlag {
    Other = 0,
    Male = 1,
}

impl GenderFlag {
    /// Case-insensitive match on "male"; every other label maps to `Other`.
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase() == "male" {
            GenderFlag::Male
        } else {
            GenderFlag::Other
        }
    }

    pub fn as_f64(self) -> f64 {
        self as i64 as f64
    }
}
