//! Plain-text prediction report

use crate::types::prediction::PredictionResult;
use std::fmt::Write;

/// Render a prediction as the fixed-layout text report
pub fn render_report(result: &PredictionResult) -> String {
    let mut report = String::from("===== Tumor Detection Report =====\n");

    // Writing to a String cannot fail
    let _ = writeln!(report, "Prediction: {}", result.prediction);
    let _ = writeln!(report, "Confidence: {:.2}", result.confidence);
    let _ = writeln!(
        report,
        "Model Accuracy (Approx.): {:.2}%",
        result.model_accuracy
    );
    let _ = writeln!(report, "Diagnosis: {}", result.diagnosis);

    if result.has_tumor() {
        let _ = writeln!(report, "Tumor Type: {}", result.tumor_type);
        let _ = writeln!(report, "Tumor Info: {}", result.tumor_info);
    }

    report.push_str("--- Class Probabilities ---\n");
    for (label, probability) in &result.class_probabilities {
        let _ = writeln!(report, "{}: {:.2}", label, probability);
    }

    report
}
