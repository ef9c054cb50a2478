//! Class index to label resolution

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, warn};

/// Label the model uses for scans without a tumor
pub const NO_TUMOR_LABEL: &str = "notumor";

/// Built-in 4-class mapping used when no class map is loaded or the index is missing
pub const DEFAULT_CLASSES: [&str; 4] = ["glioma", "meningioma", NO_TUMOR_LABEL, "pituitary"];

/// Class map artifact, resolved into its shape once at load time
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ClassMap {
    /// `{"0": "glioma", ...}`; gaps allowed
    Map(BTreeMap<usize, String>),
    /// `["glioma", ...]`
    Sequence(Vec<String>),
    /// Nothing usable was loaded
    #[default]
    Absent,
}

impl ClassMap {
    /// Load a class map from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class map {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Parse a class map from JSON text (object or array form)
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("Class map is not valid JSON")?;

        match value {
            Value::Object(entries) if !entries.is_empty() => {
                let mut classes = BTreeMap::new();
                for (key, label) in entries {
                    let index: usize = key
                        .trim()
                        .parse()
                        .with_context(|| format!("Class map key {:?} is not an index", key))?;
                    let label = label
                        .as_str()
                        .with_context(|| format!("Class map label for {} is not a string", index))?;
                    classes.insert(index, label.to_string());
                }
                Ok(ClassMap::Map(classes))
            }
            Value::Array(labels) if !labels.is_empty() => labels
                .into_iter()
                .enumerate()
                .map(|(index, label)| match label {
                    Value::String(s) => Ok(s),
                    _ => anyhow::bail!("Class map label for {} is not a string", index),
                })
                .collect::<Result<Vec<_>>>()
                .map(ClassMap::Sequence),
            _ => anyhow::bail!("Class map must be a non-empty object or array"),
        }
    }

    /// Label stored in this map for `index`, without any fallback
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            ClassMap::Map(classes) => classes.get(&index).map(String::as_str),
            ClassMap::Sequence(labels) => labels.get(index).map(String::as_str),
            ClassMap::Absent => None,
        }
    }

    /// Number of entries in the loaded map
    pub fn len(&self) -> usize {
        match self {
            ClassMap::Map(classes) => classes.len(),
            ClassMap::Sequence(labels) => labels.len(),
            ClassMap::Absent => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a model output index to a label.
    ///
    /// Falls back to [`DEFAULT_CLASSES`] and finally to `unknown_class_<index>`.
    /// Never fails.
    pub fn resolve(&self, index: usize) -> String {
        if let Some(label) = self.get(index) {
            return label.to_string();
        }

        if let Some(label) = DEFAULT_CLASSES.get(index) {
            warn!(index = index, label = %label, "Using default class name for index");
            return label.to_string();
        }

        error!(index = index, "Unknown class index");
        format!("unknown_class_{}", index)
    }
}

/// Whether a label means a tumor was found
pub fn is_tumor_label(label: &str) -> bool {
    label != NO_TUMOR_LABEL
}
