//! Append-only prediction storage

use crate::types::prediction::StoredPrediction;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Persistence for classified scans
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Append a prediction and return its id
    async fn insert(&self, prediction: StoredPrediction) -> Result<String>;

    /// Most recent predictions, newest first
    async fn query_recent(&self, limit: usize) -> Result<Vec<StoredPrediction>>;

    /// Labels of every stored prediction
    async fn query_all_labels(&self) -> Result<Vec<String>>;

    /// Number of stored predictions
    async fn count(&self) -> Result<usize>;
}

/// In-memory store; contents are lost on restart
#[derive(Default)]
pub struct MemoryPredictionStore {
    predictions: RwLock<Vec<StoredPrediction>>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_predictions(predictions: Vec<StoredPrediction>) -> Self {
        Self {
            predictions: RwLock::new(predictions),
        }
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn insert(&self, prediction: StoredPrediction) -> Result<String> {
        let id = prediction.id.clone();
        self.predictions.write().await.push(prediction);
        Ok(id)
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<StoredPrediction>> {
        let predictions = self.predictions.read().await;
        let mut recent: Vec<StoredPrediction> = predictions.clone();
        // Stable sort on insertion order, so equal timestamps keep newest-first
        recent.reverse();
        recent.sort_by(|a, b| b.prediction_date.cmp(&a.prediction_date));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn query_all_labels(&self) -> Result<Vec<String>> {
        let predictions = self.predictions.read().await;
        Ok(predictions.iter().map(|p| p.label().to_string()).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.predictions.read().await.len())
    }
}

/// Store backed by an append-only JSON-lines file
pub struct JsonlPredictionStore {
    path: PathBuf,
    memory: MemoryPredictionStore,
    writer: Mutex<()>,
}

impl JsonlPredictionStore {
    /// Open a store, loading any predictions already in the file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut predictions = Vec::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                for (line_no, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StoredPrediction>(line) {
                        Ok(prediction) => predictions.push(prediction),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping malformed prediction record"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        }

        info!(
            path = %path.display(),
            count = predictions.len(),
            "Prediction store opened"
        );

        Ok(Self {
            path,
            memory: MemoryPredictionStore::with_predictions(predictions),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PredictionStore for JsonlPredictionStore {
    async fn insert(&self, prediction: StoredPrediction) -> Result<String> {
        let mut line = serde_json::to_vec(&prediction)?;
        line.push(b'\n');

        {
            let _guard = self.writer.lock().await;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .with_context(|| format!("Failed to open {}", self.path.display()))?;
            file.write_all(&line).await?;
            file.flush().await?;
        }

        debug!(id = %prediction.id, path = %self.path.display(), "Prediction persisted");
        self.memory.insert(prediction).await
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<StoredPrediction>> {
        self.memory.query_recent(limit).await
    }

    async fn query_all_labels(&self) -> Result<Vec<String>> {
        self.memory.query_all_labels().await
    }

    async fn count(&self) -> Result<usize> {
        self.memory.count().await
    }
}
