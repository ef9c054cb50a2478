//! Lazily loaded inference engine for brain scan classification

use crate::error::{PipelineError, PipelineResult};
use crate::models::classes::ClassMap;
use crate::models::loader::{ArtifactLoader, ScoreModel};
use crate::preprocess::ImageTensor;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::{debug, error, info, warn};

/// Load state of the model artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
    /// Last load attempt failed; the next request tries again
    Failed(String),
}

impl LoadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPhase::Unloaded => "unloaded",
            LoadPhase::Loading => "loading",
            LoadPhase::Ready => "ready",
            LoadPhase::Failed(_) => "failed",
        }
    }
}

/// Model and class map, immutable once loaded
pub struct LoadedArtifacts {
    pub model: Box<dyn ScoreModel>,
    pub classes: ClassMap,
}

/// Inference engine that loads its artifacts on first use.
///
/// Loading happens at most once per process under concurrent first use;
/// a failed load is not cached.
pub struct InferenceEngine {
    loader: Box<dyn ArtifactLoader>,
    /// Set exactly once, after a successful load
    artifacts: OnceLock<Arc<LoadedArtifacts>>,
    /// Serializes load attempts
    load_guard: Mutex<()>,
    phase: RwLock<LoadPhase>,
}

impl InferenceEngine {
    /// Create an engine; nothing is loaded until [`ensure_loaded`](Self::ensure_loaded)
    pub fn new(loader: Box<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            artifacts: OnceLock::new(),
            load_guard: Mutex::new(()),
            phase: RwLock::new(LoadPhase::Unloaded),
        }
    }

    /// Current load phase
    pub fn phase(&self) -> LoadPhase {
        self.phase
            .read()
            .map(|phase| phase.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn set_phase(&self, phase: LoadPhase) {
        match self.phase.write() {
            Ok(mut current) => *current = phase,
            Err(e) => *e.into_inner() = phase,
        }
    }

    /// Load the model and class map if that has not happened yet.
    ///
    /// A class map problem is logged and replaced by the built-in default
    /// classes; only a model failure is returned.
    pub fn ensure_loaded(&self) -> PipelineResult<Arc<LoadedArtifacts>> {
        if let Some(artifacts) = self.artifacts.get() {
            return Ok(artifacts.clone());
        }

        let _guard = self
            .load_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have finished loading while we waited
        if let Some(artifacts) = self.artifacts.get() {
            return Ok(artifacts.clone());
        }

        self.set_phase(LoadPhase::Loading);
        let location = self.loader.model_location();
        info!(model = %location, "Loading model artifacts");

        let model = match self.loader.load_model() {
            Ok(model) => model,
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(model = %location, error = %reason, "Error loading model");
                self.set_phase(LoadPhase::Failed(reason.clone()));
                return Err(PipelineError::ModelLoad {
                    path: location,
                    reason,
                });
            }
        };

        let classes = match self.loader.load_class_map() {
            Ok(classes) => classes,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Error loading class map, using default classes");
                ClassMap::Absent
            }
        };

        let artifacts = Arc::new(LoadedArtifacts { model, classes });
        let artifacts = self.artifacts.get_or_init(|| artifacts).clone();
        self.set_phase(LoadPhase::Ready);
        info!(model = %location, "Model artifacts ready");

        Ok(artifacts)
    }

    /// Run the model on a preprocessed image and return its raw scores
    pub fn infer(&self, tensor: &ImageTensor) -> PipelineResult<Vec<f32>> {
        let artifacts = self.ensure_loaded()?;
        Self::run_model(&artifacts, tensor)
    }

    /// Run an already loaded model
    pub fn run_model(artifacts: &LoadedArtifacts, tensor: &ImageTensor) -> PipelineResult<Vec<f32>> {
        let scores = artifacts
            .model
            .run(tensor)
            .map_err(|e| PipelineError::Inference(format!("{:#}", e)))?;

        debug!(scores = ?scores, "Raw prediction");

        if scores.is_empty() {
            return Err(PipelineError::EmptyScores);
        }

        Ok(scores)
    }

    /// Class map in use, once loaded
    pub fn classes(&self) -> Option<&ClassMap> {
        self.artifacts.get().map(|artifacts| &artifacts.classes)
    }
}
