//! Image preprocessing for brain scan model inference.
//!
//! Turns uploaded image bytes into the fixed NHWC float tensor the
//! classifier was trained on: RGB, 224x224, values scaled to [0, 1].

use crate::error::{PipelineError, PipelineResult};
use image::imageops::{self, FilterType};
use ndarray::Array4;
use tracing::debug;

/// Side length of the square model input
pub const INPUT_SIZE: u32 = 224;

/// Color channels expected by the model
pub const CHANNELS: usize = 3;

/// Preprocessed model input of shape `(1, height, width, 3)`
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    /// Wrap an existing NHWC array
    pub fn from_array(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// Tensor shape as `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        let dims = self.data.dim();
        [dims.0, dims.1, dims.2, dims.3]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    /// Flatten into a row-major vector, the layout ONNX Runtime expects
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// Decodes and normalizes images into model input tensors.
pub struct ImagePreprocessor {
    size: u32,
    filter: FilterType,
}

impl ImagePreprocessor {
    /// Create a preprocessor for the 224x224 classifier input.
    pub fn new() -> Self {
        Self {
            size: INPUT_SIZE,
            filter: FilterType::CatmullRom,
        }
    }

    /// Decode raw bytes and produce the model input tensor.
    ///
    /// Alpha is dropped and grayscale expanded to three channels. The image
    /// is stretched to the square input without keeping its aspect ratio.
    pub fn preprocess(&self, bytes: &[u8]) -> PipelineResult<ImageTensor> {
        let image =
            image::load_from_memory(bytes).map_err(|e| PipelineError::Decode(e.to_string()))?;
        debug!(
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            "Decoded image"
        );

        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.size, self.size, self.filter);

        let side = self.size as usize;
        let data = Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });

        debug!(shape = ?data.dim(), "Image preprocessed");
        Ok(ImageTensor { data })
    }

    /// Get the input side length.
    pub fn input_size(&self) -> u32 {
        self.size
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
