//! Image decoding and tensor preparation.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::{LeafmendError, Result};

/// Default square input edge, in pixels.
pub const DEFAULT_INPUT_SIZE: u32 = 128;

/// Number of colour channels fed to the model (RGB).
pub const CHANNELS: usize = 3;

/// Normalized `[1, height, width, 3]` input for the classifier, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelTensor {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl PixelTensor {
    /// Wrap raw NHWC data. `data.len()` must equal `height * width * 3`.
    pub fn new(data: Vec<f32>, height: usize, width: usize) -> Result<Self> {
        if data.len() != height * width * CHANNELS {
            return Err(LeafmendError::InvalidImage(format!(
                "expected {} values for {height}x{width}x{CHANNELS}, got {}",
                height * width * CHANNELS,
                data.len()
            )));
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// Batch-of-one NHWC shape.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Decodes uploads and turns them into model input.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    input_size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size: input_size.max(1),
        }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Decode an encoded image (PNG, JPEG, ...), sniffing the format from its bytes.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| LeafmendError::InvalidImage(e.to_string()))
    }

    /// Resize to the model's input edge and scale to `[0, 1]`.
    ///
    /// Aspect ratio is not preserved, matching how the model was trained.
    pub fn tensor(&self, image: &DynamicImage) -> PixelTensor {
        let size = self.input_size;
        let resized = image
            .resize_exact(size, size, FilterType::CatmullRom)
            .to_rgb8();
        let data: Vec<f32> = resized
            .as_raw()
            .iter()
            .map(|&v| f32::from(v) / 255.0)
            .collect();

        PixelTensor {
            data,
            height: size as usize,
            width: size as usize,
        }
    }
}
