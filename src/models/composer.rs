//! Turns raw model scores into a structured prediction

use crate::error::{PipelineError, PipelineResult};
use crate::models::classes::{is_tumor_label, ClassMap};
use crate::types::prediction::PredictionResult;
use indexmap::IndexMap;
use tracing::debug;

/// Reported accuracy of the shipped classifier, in percent
pub const DEFAULT_MODEL_ACCURACY: f64 = 98.0;

const UNKNOWN_TUMOR_INFO: &str = "Unknown tumor type.";

/// Short description for a class label
pub fn tumor_info(label: &str) -> &'static str {
    match label {
        "glioma" => "A tumor that originates from glial cells in the brain or spine.",
        "meningioma" => "A tumor that forms on membranes covering the brain and spinal cord.",
        "notumor" => "No evidence of tumor detected in the brain scan.",
        "pituitary" => "A growth in the pituitary gland, which may affect hormone levels.",
        _ => UNKNOWN_TUMOR_INFO,
    }
}

/// Upper-case the first character and lower-case the rest
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Index of the highest score; the first one wins on ties and NaN never wins
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some((index, score)),
            Some((_, top)) if top.is_nan() && !score.is_nan() => best = Some((index, score)),
            Some((_, top)) if score > top => best = Some((index, score)),
            _ => {}
        }
    }
    best.map(|(index, _)| index)
}

/// Builds [`PredictionResult`]s from score vectors.
pub struct ResultComposer {
    model_accuracy: f64,
}

impl ResultComposer {
    pub fn new(model_accuracy: f64) -> Self {
        Self { model_accuracy }
    }

    /// Compose the full result for one score vector.
    ///
    /// Labels come from `classes` and keep class index order. If two indices
    /// resolve to the same label the later index's score is kept.
    pub fn compose(&self, scores: &[f32], classes: &ClassMap) -> PipelineResult<PredictionResult> {
        let top_index = argmax(scores).ok_or(PipelineError::EmptyScores)?;
        let prediction = classes.resolve(top_index);
        let confidence = scores[top_index] as f64;

        let mut class_probabilities = IndexMap::with_capacity(scores.len());
        for (index, &score) in scores.iter().enumerate() {
            class_probabilities.insert(classes.resolve(index), score as f64);
        }

        let has_tumor = is_tumor_label(&prediction);
        let diagnosis = if has_tumor {
            "Brain tumor detected."
        } else {
            "No tumor detected."
        };
        let tumor_type = if has_tumor {
            format!("{} Tumor", capitalize(&prediction))
        } else {
            "N/A".to_string()
        };

        debug!(
            class_index = top_index,
            prediction = %prediction,
            confidence = confidence,
            "Composed prediction"
        );

        Ok(PredictionResult {
            tumor_info: tumor_info(&prediction).to_string(),
            prediction,
            confidence,
            model_accuracy: self.model_accuracy,
            diagnosis: diagnosis.to_string(),
            tumor_type,
            class_probabilities,
        })
    }
}

impl Default for ResultComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ACCURACY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tumor_prediction() {
        let result = ResultComposer::default()
            .compose(&[0.05, 0.10, 0.80, 0.05], &ClassMap::Absent)
            .unwrap();

        assert_eq!(result.prediction, "notumor");
        assert!((result.confidence - 0.80).abs() < 1e-6);
        assert_eq!(result.diagnosis, "No tumor detected.");
        assert_eq!(result.tumor_type, "N/A");
        assert_eq!(result.tumor_info, "No evidence of tumor detected in the brain scan.");
        assert_eq!(result.model_accuracy, 98.0);
        assert!(!result.has_tumor());
    }

    #[test]
    fn test_glioma_prediction() {
        let result = ResultComposer::default()
            .compose(&[0.70, 0.10, 0.10, 0.10], &ClassMap::Absent)
            .unwrap();

        assert_eq!(result.prediction, "glioma");
        assert_eq!(result.tumor_type, "Glioma Tumor");
        assert_eq!(result.diagnosis, "Brain tumor detected.");
        assert!(result.has_tumor());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let result = ResultComposer::default()
            .compose(&[0.25, 0.15, 0.35, 0.25], &ClassMap::Absent)
            .unwrap();

        assert_eq!(result.class_probabilities.len(), 4);
        let total: f64 = result.class_probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!((result.class_probabilities["meningioma"] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_tie_picks_first_index() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.7]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_empty_scores_rejected() {
        let result = ResultComposer::default().compose(&[], &ClassMap::Absent);
        assert!(matches!(result, Err(PipelineError::EmptyScores)));
    }

    #[test]
    fn test_custom_labels_and_unknown_class() {
        let classes = ClassMap::Sequence(vec!["Astrocytoma".to_string()]);
        let result = ResultComposer::new(91.5)
            .compose(&[0.9, 0.05, 0.01, 0.01, 0.03], &classes)
            .unwrap();

        assert_eq!(result.prediction, "Astrocytoma");
        assert_eq!(result.tumor_type, "Astrocytoma Tumor");
        assert_eq!(result.tumor_info, "Unknown tumor type.");
        assert_eq!(result.model_accuracy, 91.5);
        assert!(result.class_probabilities.contains_key("unknown_class_4"));
        assert!(result.class_probabilities.contains_key("meningioma"));
    }

    #[test]
    fn test_duplicate_labels_keep_later_index() {
        let classes = ClassMap::Sequence(vec![
            "glioma".to_string(),
            "glioma".to_string(),
            "notumor".to_string(),
        ]);
        let result = ResultComposer::default()
            .compose(&[0.2, 0.3, 0.5], &classes)
            .unwrap();

        assert_eq!(result.class_probabilities.len(), 2);
        assert!((result.class_probabilities["glioma"] - 0.3).abs() < 1e-6);
        let labels: Vec<_> = result.class_probabilities.keys().collect();
        assert_eq!(labels, vec!["glioma", "notumor"]);
    }

    #[test]
    fn test_probabilities_keep_class_index_order() {
        let classes = ClassMap::Sequence(vec![
            "pituitary".to_string(),
            "meningioma".to_string(),
            "glioma".to_string(),
        ]);
        let result = ResultComposer::default()
            .compose(&[0.5, 0.3, 0.2], &classes)
            .unwrap();

        let labels: Vec<_> = result.class_probabilities.keys().collect();
        assert_eq!(labels, vec!["pituitary", "meningioma", "glioma"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("pituitary"), "Pituitary");
        assert_eq!(capitalize("MENINGIOMA"), "Meningioma");
        assert_eq!(capitalize(""), "");
    }
}
