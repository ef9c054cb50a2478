//! Classification service: preprocessing, inference, composition and history

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::PipelineMetrics;
use crate::models::{ArtifactLoader, InferenceEngine, LoadPhase, OnnxArtifactLoader, ResultComposer};
use crate::preprocess::ImagePreprocessor;
use crate::producer::PredictionPublisher;
use crate::report::render_report;
use crate::statistics::{summarize, StatisticsSummary};
use crate::store::{JsonlPredictionStore, MemoryPredictionStore, PredictionStore};
use crate::types::prediction::{PredictionResult, StoredPrediction};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Errors from a classify-and-store request
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("Classification task failed: {0}")]
    Task(String),
}

/// The synchronous pipeline shared by every request
struct Pipeline {
    preprocessor: ImagePreprocessor,
    engine: InferenceEngine,
    composer: ResultComposer,
}

impl Pipeline {
    fn classify(&self, bytes: &[u8]) -> PipelineResult<PredictionResult> {
        let tensor = self.preprocessor.preprocess(bytes)?;
        let artifacts = self.engine.ensure_loaded()?;
        let scores = InferenceEngine::run_model(&artifacts, &tensor)?;
        self.composer.compose(&scores, &artifacts.classes)
    }
}

/// Entry point for classifying scans and reading the prediction history
pub struct ClassificationService {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn PredictionStore>,
    metrics: Arc<PipelineMetrics>,
    publisher: Option<PredictionPublisher>,
    permits: Arc<Semaphore>,
}

impl ClassificationService {
    /// Build a service around an artifact loader and store
    pub fn new(
        loader: Box<dyn ArtifactLoader>,
        store: Arc<dyn PredictionStore>,
        model_accuracy: f64,
        workers: usize,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                preprocessor: ImagePreprocessor::new(),
                engine: InferenceEngine::new(loader),
                composer: ResultComposer::new(model_accuracy),
            }),
            store,
            metrics: Arc::new(PipelineMetrics::new()),
            publisher: None,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Build the production service from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let loader = OnnxArtifactLoader::new(&config.models.model_path, &config.models.classes_path)
            .with_threads(config.models.onnx_threads);

        let store: Arc<dyn PredictionStore> = match &config.storage.path {
            Some(path) => Arc::new(JsonlPredictionStore::open(path).await?),
            None => {
                info!("No storage path configured, keeping predictions in memory");
                Arc::new(MemoryPredictionStore::new())
            }
        };

        let mut service = Self::new(
            Box::new(loader),
            store,
            config.models.model_accuracy,
            config.pipeline.workers,
        );

        if let Some(url) = &config.events.nats_url {
            match PredictionPublisher::connect(url, &config.events.subject).await {
                Ok(publisher) => service = service.with_publisher(publisher),
                Err(e) => warn!(error = %format!("{:#}", e), "Prediction events disabled"),
            }
        }

        Ok(service)
    }

    /// Publish stored predictions to NATS
    pub fn with_publisher(mut self, publisher: PredictionPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    /// Model load phase
    pub fn model_phase(&self) -> LoadPhase {
        self.pipeline.engine.phase()
    }

    /// Load the model ahead of the first request
    pub async fn warm_up(&self) -> PipelineResult<()> {
        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || pipeline.engine.ensure_loaded().map(|_| ()))
            .await
            .map_err(|e| PipelineError::Inference(e.to_string()))?
    }

    /// Classify image bytes without storing the result
    pub async fn classify(&self, bytes: Vec<u8>) -> Result<PredictionResult, ServiceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?;

        let started = Instant::now();
        let pipeline = self.pipeline.clone();
        let outcome = tokio::task::spawn_blocking(move || pipeline.classify(&bytes))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?;

        match outcome {
            Ok(result) => {
                let elapsed = started.elapsed();
                self.metrics.record_classification(elapsed, &result.prediction);
                debug!(
                    prediction = %result.prediction,
                    confidence = result.confidence,
                    processing_time_us = elapsed.as_micros(),
                    "Scan classified"
                );
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_failure(e.stage());
                if e.is_client_error() {
                    warn!(stage = %e.stage(), error = %e, "Classification rejected");
                } else {
                    error!(stage = %e.stage(), error = %e, "Classification failed");
                }
                Err(e.into())
            }
        }
    }

    /// Classify, store and publish a scan
    pub async fn classify_and_store(
        &self,
        image_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredPrediction, ServiceError> {
        let result = self.classify(bytes).await?;
        let stored = StoredPrediction::new(image_name, result);

        self.store
            .insert(stored.clone())
            .await
            .map_err(ServiceError::Storage)?;

        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(&stored).await {
                error!(id = %stored.id, error = %e, "Failed to publish prediction event");
            }
        }

        info!(
            id = %stored.id,
            image = %stored.image_name,
            prediction = %stored.result.prediction,
            confidence = stored.result.confidence,
            "Prediction stored"
        );

        Ok(stored)
    }

    /// Most recent stored predictions
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredPrediction>> {
        self.store.query_recent(limit).await
    }

    /// Number of stored predictions
    pub async fn stored_count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Statistics over the full prediction history
    pub async fn statistics(&self) -> Result<StatisticsSummary> {
        let labels = self.store.query_all_labels().await?;
        Ok(summarize_history(&labels))
    }

    /// Plain-text report for a result
    pub fn report(&self, result: &PredictionResult) -> String {
        render_report(result)
    }
}

/// Summarize stored prediction labels
pub fn summarize_history<S: AsRef<str>>(labels: &[S]) -> StatisticsSummary {
    summarize(labels.iter().map(|label| label.as_ref()))
}
