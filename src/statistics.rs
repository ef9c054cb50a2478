//! Aggregate statistics over stored predictions

use crate::models::classes::{is_tumor_label, NO_TUMOR_LABEL};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Count and share of one predicted label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub label: String,
    pub count: u64,
    /// Share of all predictions in percent, rounded to 2 decimals
    pub percentage: f64,
}

/// Summary of the prediction history
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsSummary {
    pub total_count: u64,
    /// Ordered by descending count; ties keep first-seen order
    pub per_class: Vec<ClassStatistics>,
    pub has_tumor_count: u64,
    pub no_tumor_count: u64,
}

impl StatisticsSummary {
    /// Statistics for a label, if it was ever predicted
    pub fn class(&self, label: &str) -> Option<&ClassStatistics> {
        self.per_class.iter().find(|stats| stats.label == label)
    }

    /// Serializable view keyed by label, in descending count order
    pub fn to_response(&self) -> StatisticsResponse {
        StatisticsResponse {
            total_predictions: self.total_count,
            tumor_types: self
                .per_class
                .iter()
                .map(|stats| {
                    (
                        stats.label.clone(),
                        LabelShare {
                            count: stats.count,
                            percentage: stats.percentage,
                        },
                    )
                })
                .collect(),
            has_tumor: self.has_tumor_count,
            no_tumor: self.no_tumor_count,
        }
    }
}

/// Count and percentage without the label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShare {
    pub count: u64,
    pub percentage: f64,
}

/// Wire form of [`StatisticsSummary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub total_predictions: u64,
    /// Descending count order
    pub tumor_types: IndexMap<String, LabelShare>,
    pub has_tumor: u64,
    pub no_tumor: u64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summarize predicted labels into per-class counts and percentages.
///
/// Pure over its input: reordering the labels changes at most the order of
/// classes with equal counts.
pub fn summarize<I, S>(labels: I) -> StatisticsSummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for label in labels {
        let label = label.as_ref();
        match counts.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                counts.insert(label.to_string(), 1);
                order.push(label.to_string());
            }
        }
    }

    let total_count: u64 = counts.values().sum();

    let mut per_class: Vec<ClassStatistics> = order
        .into_iter()
        .map(|label| {
            let count = counts[&label];
            let percentage = if total_count > 0 {
                round2(count as f64 / total_count as f64 * 100.0)
            } else {
                0.0
            };
            ClassStatistics {
                label,
                count,
                percentage,
            }
        })
        .collect();
    // Stable, so ties keep first-seen order
    per_class.sort_by(|a, b| b.count.cmp(&a.count));

    let has_tumor_count = per_class
        .iter()
        .filter(|stats| is_tumor_label(&stats.label))
        .map(|stats| stats.count)
        .sum();
    let no_tumor_count = counts.get(NO_TUMOR_LABEL).copied().unwrap_or(0);

    StatisticsSummary {
        total_count,
        per_class,
        has_tumor_count,
        no_tumor_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let summary = summarize(Vec::<String>::new());
        assert_eq!(summary.total_count, 0);
        assert!(summary.per_class.is_empty());
        assert_eq!(summary.has_tumor_count, 0);
        assert_eq!(summary.no_tumor_count, 0);
        assert!(summary.to_response().tumor_types.is_empty());
    }

    #[test]
    fn test_mixed_history() {
        let summary = summarize(["glioma", "notumor", "notumor", "pituitary"]);

        assert_eq!(summary.total_count, 4);
        let notumor = summary.class("notumor").unwrap();
        assert_eq!(notumor.count, 2);
        assert_eq!(notumor.percentage, 50.0);
        assert_eq!(summary.class("glioma").unwrap().percentage, 25.0);
        assert_eq!(summary.has_tumor_count, 2);
        assert_eq!(summary.no_tumor_count, 2);
        assert_eq!(summary.per_class[0].label, "notumor");
    }

    #[test]
    fn test_counts_add_up() {
        let labels = ["glioma", "meningioma", "glioma", "pituitary", "glioma", "x"];
        let summary = summarize(labels);

        let counted: u64 = summary.per_class.iter().map(|s| s.count).sum();
        assert_eq!(counted, summary.total_count);
        let percent: f64 = summary.per_class.iter().map(|s| s.percentage).sum();
        assert!((percent - 100.0).abs() < 0.05);
        assert_eq!(summary.no_tumor_count, 0);
        assert_eq!(summary.has_tumor_count, 6);
    }

    #[test]
    fn test_percentages_rounded() {
        let summary = summarize(["glioma", "notumor", "notumor"]);
        assert_eq!(summary.class("glioma").unwrap().percentage, 33.33);
        assert_eq!(summary.class("notumor").unwrap().percentage, 66.67);
    }

    #[test]
    fn test_order_invariant() {
        let forward = summarize(["glioma", "notumor", "glioma", "meningioma", "notumor"]);
        let reverse = summarize(["notumor", "meningioma", "glioma", "notumor", "glioma"]);

        assert_eq!(forward.total_count, reverse.total_count);
        assert_eq!(forward.has_tumor_count, reverse.has_tumor_count);
        assert_eq!(forward.no_tumor_count, reverse.no_tumor_count);
        for stats in &forward.per_class {
            assert_eq!(reverse.class(&stats.label), Some(stats));
        }
    }

    #[test]
    fn test_response_shape() {
        let response = summarize(["pituitary", "notumor"]).to_response();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["total_predictions"], 2);
        assert_eq!(json["tumor_types"]["pituitary"]["count"], 1);
        assert_eq!(json["tumor_types"]["pituitary"]["percentage"], 50.0);
        assert_eq!(json["has_tumor"], 1);
        assert_eq!(json["no_tumor"], 1);
    }

    #[test]
    fn test_response_keys_follow_count_order() {
        let summary = summarize(["notumor", "pituitary", "pituitary", "pituitary"]);
        let text = serde_json::to_string(&summary.to_response()).unwrap();

        let pituitary = text.find("\"pituitary\"").unwrap();
        let notumor = text.find("\"notumor\"").unwrap();
        assert!(pituitary < notumor);
        let labels: Vec<_> = summary.to_response().tumor_types.into_keys().collect();
        assert_eq!(labels, vec!["pituitary", "notumor"]);
    }
}
