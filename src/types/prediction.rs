//! Prediction data structures

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Structured classification of a single scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Top class label
    pub prediction: String,

    /// Score of the top class (0.0 - 1.0)
    pub confidence: f64,

    /// Reported model accuracy in percent, informational only
    pub model_accuracy: f64,

    /// Human readable diagnosis line
    pub diagnosis: String,

    /// Display tumor type, "N/A" without a tumor
    pub tumor_type: String,

    /// Short description of the predicted class
    pub tumor_info: String,

    /// Score per class label, in class index order
    pub class_probabilities: IndexMap<String, f64>,
}

impl PredictionResult {
    /// Whether the top class is a tumor class
    pub fn has_tumor(&self) -> bool {
        crate::models::classes::is_tumor_label(&self.prediction)
    }
}

/// Prediction as kept by the persistence layer. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    /// Generated identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Uploaded file name
    pub image_name: String,

    /// Insertion timestamp
    pub prediction_date: DateTime<Utc>,

    /// Full classification
    #[serde(flatten)]
    pub result: PredictionResult,
}

impl StoredPrediction {
    /// Create a new stored prediction with a fresh id and timestamp
    pub fn new(image_name: impl Into<String>, result: PredictionResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image_name: image_name.into(),
            prediction_date: Utc::now(),
            result,
        }
    }

    /// Override the timestamp
    pub fn with_date(mut self, prediction_date: DateTime<Utc>) -> Self {
        self.prediction_date = prediction_date;
        self
    }

    /// Predicted label
    pub fn label(&self) -> &str {
        &self.result.prediction
    }
}
