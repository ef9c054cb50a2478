//! Offline classifier
//!
//! Classifies a single scan from disk and prints the text report.

use brain_tumor_detection::{
    models::OnnxArtifactLoader, render_report, ImagePreprocessor, InferenceEngine,
    ResultComposer,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("classify_image=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let image_path = match args.get(1) {
        Some(path) => path,
        None => anyhow::bail!("usage: classify-image <image> [model_path] [classes_path]"),
    };
    let model_path = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("models/brain_tumor_model.onnx");
    let classes_path = args
        .get(3)
        .map(|s| s.as_str())
        .unwrap_or("models/class_dict.json");

    info!(
        image = %image_path,
        model = %model_path,
        classes = %classes_path,
        "Classifying scan"
    );

    let bytes = std::fs::read(image_path)?;
    let tensor = ImagePreprocessor::new().preprocess(&bytes)?;

    let engine = InferenceEngine::new(Box::new(OnnxArtifactLoader::new(model_path, classes_path)));
    let artifacts = engine.ensure_loaded()?;
    let scores = InferenceEngine::run_model(&artifacts, &tensor)?;
    let result = ResultComposer::default().compose(&scores, &artifacts.classes)?;

    print!("{}", render_report(&result));

    Ok(())
}
