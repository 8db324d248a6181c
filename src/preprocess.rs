use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView};
use ndarray::{Array, ArrayD};
use tracing::debug;

use crate::error::{ClassifyError, Result};
use crate::profile::{InputSpec, ModelProfile, Normalization, ResizeFilter, TensorLayout};

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub input: InputSpec,
    pub normalization: Normalization,
}

impl PreprocessConfig {
    pub fn from_profile(profile: &ModelProfile) -> Self {
        Self {
            input: profile.input.clone(),
            normalization: profile.normalization,
        }
    }
}

fn resize_alg(filter: ResizeFilter) -> ResizeAlg {
    match filter {
        ResizeFilter::Nearest => ResizeAlg::Nearest,
        ResizeFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        ResizeFilter::Bicubic => ResizeAlg::Convolution(FilterType::CatmullRom),
        ResizeFilter::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    }
}

#[derive(Debug)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    /// Create a new instance of the Processor struct
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Scales the image uniformly until it covers the target size, then crops
    /// the centre. The result has the configured channel count.
    pub fn fit_and_crop(&self, x: &DynamicImage) -> Result<DynamicImage> {
        let (orig_width, orig_height) = x.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(ClassifyError::invalid_input(format!(
                "image has no pixels ({orig_width}x{orig_height})"
            )));
        }

        let input = &self.config.input;
        let (src, pixel_type) = match input.channels {
            1 => (DynamicImage::ImageLuma8(x.to_luma8()), PixelType::U8),
            3 => (DynamicImage::ImageRgb8(x.to_rgb8()), PixelType::U8x3),
            n => {
                return Err(ClassifyError::config(format!(
                    "unsupported channel count {n}"
                )));
            }
        };

        let mut dst_image = Image::new(input.width, input.height, pixel_type);
        let resize_options = ResizeOptions::new()
            .resize_alg(resize_alg(input.resize))
            .fit_into_destination(Some((0.5, 0.5)));
        let mut resizer = Resizer::new();
        resizer.resize(&src, &mut dst_image, Some(&resize_options))?;

        let (width, height) = (dst_image.width(), dst_image.height());
        let buffer = dst_image.buffer().to_vec();
        let fitted = match input.channels {
            1 => image::GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8),
            _ => image::RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
        };
        fitted.ok_or_else(|| ClassifyError::Shape {
            expected: format!("{width}x{height}x{}", input.channels),
            actual: "short resize buffer".to_string(),
        })
    }

    /// Builds the normalized batch-of-one tensor from an image that is
    /// already at the target size and channel count.
    pub fn to_tensor(&self, fitted: &DynamicImage) -> Result<ArrayD<f32>> {
        let input = &self.config.input;
        let (h, w, c) = (input.height as usize, input.width as usize, input.channels);
        let norm = self.config.normalization;
        let samples: Vec<f32> = fitted.as_bytes().iter().map(|&s| norm.apply(s)).collect();

        // Pixel buffers are interleaved, so they are already HWC.
        let nhwc = Array::from_shape_vec((1, h, w, c), samples)?;
        let tensor = match input.layout {
            TensorLayout::Nhwc => nhwc,
            TensorLayout::Nchw => nhwc.permuted_axes([0, 3, 1, 2]).as_standard_layout().to_owned(),
        };
        Ok(tensor.into_dyn())
    }

    /// Fit-and-crop, normalize and batch a single image.
    pub fn preprocess(&self, x: &DynamicImage) -> Result<ArrayD<f32>> {
        let t = std::time::Instant::now();
        let fitted = self.fit_and_crop(x)?;
        let tensor = self.to_tensor(&fitted)?;
        debug!(
            source = ?x.dimensions(),
            shape = ?tensor.shape(),
            elapsed = ?t.elapsed(),
            "preprocessed image"
        );
        let expected = self.config.input.shape();
        if tensor.shape() != expected {
            return Err(ClassifyError::Shape {
                expected: format!("{expected:?}"),
                actual: format!("{:?}", tensor.shape()),
            });
        }
        Ok(tensor)
    }
}
