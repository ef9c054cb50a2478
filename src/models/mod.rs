//! ML model inference components

pub mod classes;
pub mod composer;
pub mod inference;
pub mod loader;

pub use classes::ClassMap;
pub use composer::ResultComposer;
pub use inference::{InferenceEngine, LoadPhase};
pub use loader::{ArtifactLoader, OnnxArtifactLoader, ScoreModel};
