//! Brain Tumor Detection Library
//!
//! Classifies MRI brain scans (glioma, meningioma, pituitary tumor, no tumor)
//! with an ONNX image classifier, stores each prediction and reports
//! aggregate statistics over the prediction history.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod producer;
pub mod report;
pub mod service;
pub mod statistics;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, PipelineStage};
pub use models::{ClassMap, InferenceEngine, ResultComposer};
pub use preprocess::{ImagePreprocessor, ImageTensor};
pub use producer::PredictionPublisher;
pub use report::render_report;
pub use service::{summarize_history, ClassificationService};
pub use statistics::{summarize, StatisticsSummary};
pub use types::{PredictionResult, StoredPrediction};
