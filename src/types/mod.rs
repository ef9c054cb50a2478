//! Type definitions for the brain tumor detection service

pub mod prediction;

pub use prediction::{PredictionResult, StoredPrediction};
