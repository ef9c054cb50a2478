//! Shared fixtures for integration tests

#![allow(dead_code)]

use brain_tumor_detection::models::{ArtifactLoader, ClassMap, ScoreModel};
use brain_tumor_detection::ImageTensor;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Model returning a fixed score vector and counting its runs
pub struct FixedModel {
    pub scores: Vec<f32>,
    pub runs: Arc<AtomicUsize>,
}

impl ScoreModel for FixedModel {
    fn run(&self, tensor: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

/// Loader handing out [`FixedModel`]s
pub struct FixedLoader {
    pub scores: Vec<f32>,
    pub classes: Option<ClassMap>,
    pub fail: bool,
    pub loads: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
}

impl FixedLoader {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            classes: None,
            fail: false,
            loads: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

impl ArtifactLoader for FixedLoader {
    fn model_location(&self) -> String {
        "fixture.onnx".to_string()
    }

    fn load_model(&self) -> anyhow::Result<Box<dyn ScoreModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("model file is corrupt");
        }
        Ok(Box::new(FixedModel {
            scores: self.scores.clone(),
            runs: self.runs.clone(),
        }))
    }

    fn load_class_map(&self) -> anyhow::Result<ClassMap> {
        self.classes
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no class map"))
    }
}

/// Small PNG scan
pub fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
