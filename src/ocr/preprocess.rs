//! Region cropping and the preprocessors applied before extraction.

use anyhow::{bail, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;

use crate::config::ValidatorConfig;
use crate::model::Coordinate;

/// Copies the region described by `coordinate` out of `img`.
///
/// Fails when the region is not fully inside the image.
pub fn crop_region(img: &RgbaImage, coordinate: &Coordinate) -> Result<RgbaImage> {
    let (w, h) = img.dimensions();
    if !coordinate.fits_within(w, h) {
        bail!("region {} outside image bounds {}x{}", coordinate, w, h);
    }

    Ok(imageops::crop_imm(
        img,
        coordinate.left(),
        coordinate.top(),
        coordinate.width(),
        coordinate.height(),
    )
    .to_image())
}

/// Transforms a cropped region into the grayscale image handed to the extractor.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, region: &RgbaImage) -> Result<GrayImage>;
}

type Constructor = fn(&ValidatorConfig) -> Box<dyn Preprocessor>;

pub const PREPROCESSORS: &[(&str, Constructor)] = &[
    ("none", build_grayscale),
    ("grayscale", build_grayscale),
    ("threshold", build_threshold),
    ("basic", build_basic),
    ("adaptive", build_adaptive),
];

fn build_grayscale(_: &ValidatorConfig) -> Box<dyn Preprocessor> {
    Box::new(Grayscale)
}

fn build_threshold(config: &ValidatorConfig) -> Box<dyn Preprocessor> {
    Box::new(BrightThreshold {
        threshold: config.threshold,
    })
}

fn build_basic(config: &ValidatorConfig) -> Box<dyn Preprocessor> {
    Box::new(Basic {
        min_width: config.upscale_min_width,
        min_height: config.upscale_min_height,
    })
}

fn build_adaptive(_: &ValidatorConfig) -> Box<dyn Preprocessor> {
    Box::new(Adaptive { block_radius: 7 })
}

pub fn create(name: &str, config: &ValidatorConfig) -> Result<Box<dyn Preprocessor>> {
    let key = name.trim().to_ascii_lowercase();
    match PREPROCESSORS.iter().find(|(n, _)| *n == key) {
        Some((_, constructor)) => Ok(constructor(config)),
        None => bail!(
            "Unknown preprocessor {:?} (available: {})",
            name,
            PREPROCESSORS
                .iter()
                .map(|(n, _)| *n)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Luma conversion only.
pub struct Grayscale;

impl Preprocessor for Grayscale {
    fn name(&self) -> &str {
        "grayscale"
    }

    fn apply(&self, region: &RgbaImage) -> Result<GrayImage> {
        Ok(imageops::grayscale(region))
    }
}

/// Bright-text binarisation for light text on dark UI backgrounds.
pub struct BrightThreshold {
    pub threshold: u8,
}

impl Preprocessor for BrightThreshold {
    fn name(&self) -> &str {
        "threshold"
    }

    fn apply(&self, region: &RgbaImage) -> Result<GrayImage> {
        Ok(threshold_bright_pixels(region, self.threshold))
    }
}

/// Pixels where R, G and B all exceed `threshold` become black (text),
/// everything else white.
pub fn threshold_bright_pixels(img: &RgbaImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        if p[0] > threshold && p[1] > threshold && p[2] > threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Grayscale, +50% contrast, 3x3 median, then Lanczos upscaling of small regions.
pub struct Basic {
    pub min_width: u32,
    pub min_height: u32,
}

impl Basic {
    fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 || (width >= self.min_width && height >= self.min_height) {
            return (width, height);
        }
        let scale = (self.min_width as f64 / width as f64)
            .max(self.min_height as f64 / height as f64)
            .max(1.0);
        (
            (width as f64 * scale).ceil() as u32,
            (height as f64 * scale).ceil() as u32,
        )
    }
}

impl Preprocessor for Basic {
    fn name(&self) -> &str {
        "basic"
    }

    fn apply(&self, region: &RgbaImage) -> Result<GrayImage> {
        let gray = imageops::grayscale(region);
        let contrasted = imageops::contrast(&gray, 50.0);
        let denoised = imageproc::filter::median_filter(&contrasted, 1, 1);

        let (w, h) = denoised.dimensions();
        let (tw, th) = self.target_size(w, h);
        if (tw, th) == (w, h) {
            return Ok(denoised);
        }
        Ok(imageops::resize(&denoised, tw, th, FilterType::Lanczos3))
    }
}

/// Gaussian blur, local-mean threshold and a morphological close.
pub struct Adaptive {
    pub block_radius: u32,
}

impl Preprocessor for Adaptive {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn apply(&self, region: &RgbaImage) -> Result<GrayImage> {
        let gray = imageops::grayscale(region);
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, 1.0);
        let binary = local_mean_threshold(&blurred, self.block_radius);
        Ok(imageproc::morphology::close(&binary, Norm::LInf, 1))
    }
}

/// Pixels brighter than the mean of their surrounding block become white,
/// the rest black.
fn local_mean_threshold(img: &GrayImage, block_radius: u32) -> GrayImage {
    let means = imageproc::filter::box_filter(img, block_radius, block_radius);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > means.get_pixel(x, y)[0] {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
