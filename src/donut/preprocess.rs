//! Image preprocessing for the Donut encoder
//!
//! Mirrors the model's image processor: RGB conversion, optional long-axis
//! alignment, resize to fit the canvas, centred black padding, rescale and
//! per-channel normalisation, laid out as a `[1, 3, H, W]` tensor.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;
use serde::Deserialize;

use super::error::DonutError;

/// Target canvas in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCanvasSize")]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Processor configs use either `{"height", "width"}` or a `[width, height]` pair
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCanvasSize {
    Named { height: u32, width: u32 },
    Pair([u32; 2]),
}

impl From<RawCanvasSize> for CanvasSize {
    fn from(raw: RawCanvasSize) -> Self {
        match raw {
            RawCanvasSize::Named { height, width } => CanvasSize { width, height },
            RawCanvasSize::Pair([width, height]) => CanvasSize { width, height },
        }
    }
}

/// Subset of `preprocessor_config.json` the pipeline honours
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default = "default_size")]
    pub size: CanvasSize,
    #[serde(default)]
    pub do_align_long_axis: bool,
    #[serde(default = "default_true")]
    pub do_thumbnail: bool,
    #[serde(default = "default_true")]
    pub do_pad: bool,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_half")]
    pub image_mean: [f32; 3],
    #[serde(default = "default_half")]
    pub image_std: [f32; 3],
}

fn default_size() -> CanvasSize {
    CanvasSize {
        width: 1920,
        height: 2560,
    }
}

fn default_true() -> bool {
    true
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_half() -> [f32; 3] {
    [0.5, 0.5, 0.5]
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            do_align_long_axis: false,
            do_thumbnail: true,
            do_pad: true,
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: default_half(),
            image_std: default_half(),
        }
    }
}

impl PreprocessorConfig {
    pub fn from_json(raw: &str) -> Result<Self, DonutError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Decode an uploaded image and turn it into encoder input
pub fn preprocess(image_bytes: &[u8], config: &PreprocessorConfig) -> Result<Array4<f32>, DonutError> {
    let decoded = image::load_from_memory(image_bytes)?;
    let canvas = fit_to_canvas(decoded, config);
    Ok(to_tensor(&canvas, config))
}

/// Apply alignment, resize, thumbnail and padding; the result is exactly the
/// canvas size when padding is enabled.
pub fn fit_to_canvas(image: DynamicImage, config: &PreprocessorConfig) -> RgbImage {
    let target = config.size;
    let mut rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    if config.do_align_long_axis {
        let (w, h) = rgb.dimensions();
        let canvas_landscape = target.width > target.height;
        let image_landscape = w > h;
        if canvas_landscape != image_landscape {
            rgb = rgb.rotate90();
        }
    }

    // Shortest edge to the canvas's shortest edge
    let (w, h) = rgb.dimensions();
    let shortest = target.width.min(target.height) as f64;
    let scale = shortest / w.min(h) as f64;
    let (mut w, mut h) = scaled(w, h, scale);

    if config.do_thumbnail {
        let shrink = (target.width as f64 / w as f64)
            .min(target.height as f64 / h as f64)
            .min(1.0);
        (w, h) = scaled(w, h, shrink);
    }

    let resized = imageops::resize(&rgb.to_rgb8(), w, h, FilterType::Triangle);

    if !config.do_pad {
        return resized;
    }

    let mut padded = RgbImage::new(target.width, target.height);
    let left = target.width.saturating_sub(w) / 2;
    let top = target.height.saturating_sub(h) / 2;
    imageops::overlay(&mut padded, &resized, left as i64, top as i64);
    padded
}

fn scaled(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Channel-first float tensor with rescale and normalisation applied
pub fn to_tensor(image: &RgbImage, config: &PreprocessorConfig) -> Array4<f32> {
    let (width, height) = image.dimensions();

    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, channel, y, x)| {
            let mut value = image.get_pixel(x as u32, y as u32)[channel] as f32;
            if config.do_rescale {
                value *= config.rescale_factor;
            }
            if config.do_normalize {
                value = (value - config.image_mean[channel]) / config.image_std[channel];
            }
            value
        },
    )
}
