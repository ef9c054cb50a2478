//! ONNX model and class map loading

use crate::models::classes::ClassMap;
use crate::preprocess::ImageTensor;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Anything that turns a preprocessed image into raw class scores
pub trait ScoreModel: Send + Sync {
    /// Run the model on a single-image batch and return its score vector
    fn run(&self, tensor: &ImageTensor) -> Result<Vec<f32>>;
}

/// Source of the model and class map artifacts
pub trait ArtifactLoader: Send + Sync {
    /// Where the model artifact lives, for error reporting
    fn model_location(&self) -> String;

    /// Load the classifier
    fn load_model(&self) -> Result<Box<dyn ScoreModel>>;

    /// Load the class map
    fn load_class_map(&self) -> Result<ClassMap>;
}

/// Loaded ONNX classifier with metadata
pub struct OnnxModel {
    /// ONNX Runtime session; a run needs exclusive access
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for class scores
    output_name: String,
}

impl OnnxModel {
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl ScoreModel for OnnxModel {
    fn run(&self, tensor: &ImageTensor) -> Result<Vec<f32>> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let input_tensor = Tensor::from_array((shape, tensor.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let output = match outputs.get(self.output_name.as_str()) {
            Some(output) => output,
            None => anyhow::bail!("Model produced no output named {}", self.output_name),
        };

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .context("Model output is not a float tensor")?;
        debug!(shape = ?shape, "Raw model output");

        // [batch, classes] or [classes]; keep the first batch element
        let dims: Vec<i64> = shape.iter().copied().collect();
        let classes = match dims.as_slice() {
            [_, classes] => *classes as usize,
            [classes] => *classes as usize,
            _ => anyhow::bail!("Unexpected output shape {:?}", dims),
        };

        Ok(data.iter().take(classes).copied().collect())
    }
}

/// Loader for the ONNX classifier and its JSON class map
pub struct OnnxArtifactLoader {
    model_path: PathBuf,
    classes_path: PathBuf,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl OnnxArtifactLoader {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, classes_path: Q) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            classes_path: classes_path.as_ref().to_path_buf(),
            onnx_threads: 1,
        }
    }

    pub fn with_threads(mut self, onnx_threads: usize) -> Self {
        self.onnx_threads = onnx_threads.max(1);
        self
    }

    /// Load a single ONNX model from file
    pub fn load_onnx(&self) -> Result<OnnxModel> {
        let path = &self.model_path;
        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        ort::init().commit()?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "output".to_string())
            });

        info!(
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(OnnxModel {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl ArtifactLoader for OnnxArtifactLoader {
    fn model_location(&self) -> String {
        self.model_path.display().to_string()
    }

    fn load_model(&self) -> Result<Box<dyn ScoreModel>> {
        Ok(Box::new(self.load_onnx()?))
    }

    fn load_class_map(&self) -> Result<ClassMap> {
        let classes = ClassMap::load(&self.classes_path)?;
        info!(
            path = %self.classes_path.display(),
            classes = classes.len(),
            "Class map loaded"
        );
        Ok(classes)
    }
}
